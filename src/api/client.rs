//! REST client for the agent backend

use super::crypto::encrypt_credentials;
use super::{AgentAction, AgentBackend, AgentRef, DeployResponse};
use crate::signals::TradingSignal;
use crate::trade::{Exchange, ExchangeCredentials, TradeRequest};
use crate::wizard::DeployAgentRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid api url {}: {}", base_url, e)))?;
        // origin + path only, as the backend url may carry a query string
        let mut cleaned = parsed;
        cleaned.set_query(None);
        cleaned.set_fragment(None);

        Ok(Self {
            client: Client::new(),
            base_url: cleaned.as_str().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Attach the bearer token issued at login
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.endpoint(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Request to {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(path, status = status.as_u16(), "Backend returned error status");
            return Err(Error::Backend(format!("{} returned {}: {}", path, status, body)));
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self
            .send(self.request(Method::GET, path).query(query), path)
            .await?;
        response
            .json()
            .await
            .map_err(|e| Error::MalformedData(format!("Failed to parse {} response: {}", path, e)))
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let response = self
            .send(self.request(Method::POST, path).json(body), path)
            .await?;
        let text = response
            .text()
            .await
            .map_err(|e| Error::Backend(format!("Failed to read {} response: {}", path, e)))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::MalformedData(format!("Failed to parse {} response: {}", path, e)))
    }

    /// Agents promoted on the landing page
    pub async fn featured_agents(&self) -> Result<Vec<Value>> {
        let body = self.get_json("/agents/featured", &[]).await?;
        agent_list(body, "/agents/featured")
    }

    /// Signals sharing an indicator with `signal`
    pub async fn related_signals(&self, signal: &TradingSignal) -> Result<Value> {
        let path = format!("/trading_signal/{}", signal.id);
        let query = signal
            .indicator
            .as_ref()
            .map(|indicator| vec![("indicator", indicator.clone())])
            .unwrap_or_default();
        self.get_json(&path, &query).await
    }

    pub async fn backtest_results(&self, signal_id: &str) -> Result<Value> {
        self.get_json(&format!("/signals/result/{}", signal_id), &[])
            .await
    }

    /// Open positions on an exchange account
    pub async fn open_trades(
        &self,
        wallet: &str,
        exchange: Exchange,
        credentials: &ExchangeCredentials,
    ) -> Result<Value> {
        let pem = self.encryption_key().await?;
        let encrypted = encrypt_credentials(&pem, credentials)?;
        self.post_json(
            "/test/trades/open",
            &json!({
                "walletAddress": wallet,
                "exchange": exchange.wire_name(),
                "credentials": encrypted,
            }),
        )
        .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Agent lists arrive either bare or wrapped in `{agents: [...]}`
fn agent_list(body: Value, path: &str) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("agents") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(Error::MalformedData(format!(
                "{}: agents is not a list: {}",
                path, other
            ))),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(Error::MalformedData(format!(
            "{}: unexpected body {}",
            path, other
        ))),
    }
}

/// Decode signals one by one so a bad record only drops itself
fn signal_list(body: Value) -> Vec<TradingSignal> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("signals") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<TradingSignal>(item) {
            Ok(signal) => Some(signal),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed trading signal");
                None
            }
        })
        .collect()
}

/// The key endpoint serves bare PEM, but some deployments JSON-encode it
fn pem_from_body(body: &str) -> Result<String> {
    let trimmed = body.trim();
    if trimmed.starts_with('"') {
        return serde_json::from_str::<String>(trimmed)
            .map_err(|e| Error::MalformedData(format!("Encryption key: {}", e)));
    }
    if trimmed.is_empty() {
        return Err(Error::MalformedData("Encryption key is empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl AgentBackend for ApiClient {
    async fn issue_token(&self, address: &str) -> Result<SecretString> {
        let body = self
            .post_json("/auth/web3-token", &json!({ "wallet_address": address }))
            .await?;
        let token = body
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MalformedData("Token response has no token".to_string()))?;
        Ok(SecretString::from(token.to_string()))
    }

    async fn deploy_agent(&self, request: &DeployAgentRequest) -> Result<DeployResponse> {
        tracing::info!(creator = %request.creator, provider = %request.provider, "Deploying agent");
        match self.post_json("/agent", request).await {
            Ok(body) => serde_json::from_value(body).map_err(|e| {
                Error::MalformedData(format!("Failed to parse deploy response: {}", e))
            }),
            Err(e) => {
                tracing::error!(error = %e, "Agent deployment request failed");
                Ok(DeployResponse::failure(e.to_string()))
            }
        }
    }

    async fn list_agents(&self, creator: &str) -> Result<Vec<Value>> {
        let body = self
            .get_json("/agents", &[("creator", creator.to_string())])
            .await?;
        agent_list(body, "/agents")
    }

    async fn get_agent(&self, agent: &AgentRef) -> Result<Option<Value>> {
        let query = [
            ("appId", agent.app_id.clone()),
            ("agentId", agent.agent_id.clone()),
        ];
        match self.get_json("/agent", &query).await {
            Ok(mut body) => Ok(body
                .get_mut("agent")
                .map(Value::take)
                .filter(|a| !a.is_null())),
            Err(e) => {
                tracing::warn!(%agent, error = %e, "Failed to fetch agent");
                Ok(None)
            }
        }
    }

    async fn set_agent_state(
        &self,
        agent: &AgentRef,
        action: AgentAction,
        name: &str,
    ) -> Result<Value> {
        let path = format!("/agents/{}/reset", agent.agent_id);
        let body = json!({
            "type": agent.app_id,
            "action": action.as_str(),
            "character": { "name": name },
        });
        match self.post_json(&path, &body).await {
            Ok(ack) => Ok(ack),
            Err(e) => {
                tracing::warn!(%agent, action = action.as_str(), error = %e, "Agent state change failed");
                Ok(Value::Null)
            }
        }
    }

    async fn trade_signals(
        &self,
        agent: &AgentRef,
        page: u32,
        limit: u32,
    ) -> Result<Vec<TradingSignal>> {
        let query = [
            ("agentId", agent.agent_id.clone()),
            ("appId", agent.app_id.clone()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.get_json("/trading_signals", &query).await?;
        let signals = signal_list(body);
        tracing::debug!(%agent, count = signals.len(), "Fetched trading signals");
        Ok(signals)
    }

    async fn encryption_key(&self) -> Result<String> {
        let response = self
            .send(self.request(Method::GET, "/test/key"), "/test/key")
            .await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::Backend(format!("Failed to read encryption key: {}", e)))?;
        pem_from_body(&body)
    }

    async fn submit_trade(&self, request: &TradeRequest) -> Result<Value> {
        tracing::info!(
            exchange = %request.exchange,
            signal_id = %request.trade_signal.id,
            "Submitting trade"
        );
        self.post_json("/test/trade", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_query_and_trailing_slash() {
        let client = ApiClient::new("https://api.example.com/api/v1/?apikey=x").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/api/v1");
        assert_eq!(
            client.endpoint("/agents"),
            "https://api.example.com/api/v1/agents"
        );
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn debug_hides_token() {
        let client = ApiClient::new("http://localhost:5500/api/v1")
            .unwrap()
            .with_token(SecretString::from("secret-jwt".to_string()));
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret-jwt"));
    }

    #[test]
    fn agent_list_accepts_both_shapes() {
        let wrapped = json!({"agents": [{"agentid": "a"}]});
        assert_eq!(agent_list(wrapped, "/agents").unwrap().len(), 1);
        let bare = json!([{"agentid": "a"}, {"agentid": "b"}]);
        assert_eq!(agent_list(bare, "/agents").unwrap().len(), 2);
        assert!(agent_list(json!({}), "/agents").unwrap().is_empty());
        assert!(agent_list(json!({"agents": "nope"}), "/agents").is_err());
    }

    #[test]
    fn signal_list_skips_bad_records() {
        let body = json!({
            "signals": [
                {
                    "id": "s1",
                    "ticker": "BTC/USDT",
                    "entry": 100.0,
                    "stop": 95.0,
                    "data": {"direction": "Long", "t1": 110.0},
                    "timestamp": "2024-05-01T10:00:00Z"
                },
                {"ticker": "no id"},
            ]
        });
        let signals = signal_list(body);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].id, "s1");
    }

    #[test]
    fn pem_body_may_be_json_string() {
        let pem = "-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----";
        let quoted = serde_json::to_string(pem).unwrap();
        assert_eq!(pem_from_body(&quoted).unwrap(), pem);
        assert_eq!(pem_from_body(&format!("{}\n", pem)).unwrap(), pem);
        assert!(pem_from_body("  ").is_err());
    }
}
