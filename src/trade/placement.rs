//! Submitting a promoted signal as a trade

use super::credentials::ExchangeCredentials;
use super::form::{TradeForm, ValidatedOrder};
use crate::api::crypto::encrypt_credentials;
use crate::api::{is_truthy, AgentBackend};
use crate::notify::{Notice, Notifier};
use crate::signals::{Promotion, ReviewSnapshot, TradingSignal};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Body of `POST /test/trade`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub exchange: String,
    pub trade_signal: OrderSignal,
    /// Base64 RSA-OAEP ciphertext of the exchange credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSignal {
    pub id: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub amount: f64,
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub leverage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_type: Option<String>,
    pub slippage: f64,
    pub reduce_only: bool,
    pub post_only: bool,
}

/// Exchange symbol for a display pair, `BTC/USDT` -> `BTCUSDT`
pub fn exchange_symbol(pair: &str) -> String {
    pair.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

impl TradeRequest {
    pub fn new(signal: &TradingSignal, order: &ValidatedOrder, credentials: Option<String>) -> Self {
        Self {
            exchange: order.exchange.wire_name().to_string(),
            trade_signal: OrderSignal {
                id: signal.id.clone(),
                symbol: exchange_symbol(&order.pair),
                side: order.side.as_str().to_string(),
                order_type: order.order_type.label().to_string(),
                amount: order.amount,
                entry: order.limit_price,
                stop_loss: order.stop_loss,
                take_profit: order.take_profit,
                leverage: order.leverage,
                margin_type: order.margin_type.map(|m| format!("{:?}", m)),
                slippage: order.slippage.percent(),
                reduce_only: order.reduce_only,
                post_only: order.post_only,
            },
            credentials,
        }
    }
}

/// Accepted trade plus where to resume reviewing
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub ack: Value,
    pub resume: ReviewSnapshot,
}

/// Trade form opened from the review queue
#[derive(Debug, Clone)]
pub struct TradePlacement {
    promotion: Promotion,
    form: TradeForm,
}

impl TradePlacement {
    pub fn new(promotion: Promotion) -> Self {
        let form = TradeForm::from_signal(&promotion.signal);
        Self { promotion, form }
    }

    pub fn signal(&self) -> &TradingSignal {
        &self.promotion.signal
    }

    pub fn form(&self) -> &TradeForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut TradeForm {
        &mut self.form
    }

    /// Back to the review queue exactly as it was
    pub fn cancel(self) -> ReviewSnapshot {
        self.promotion.snapshot
    }

    pub async fn submit(
        &self,
        backend: &dyn AgentBackend,
        credentials: Option<&ExchangeCredentials>,
        notifier: &dyn Notifier,
    ) -> Result<TradeOutcome> {
        match self.try_submit(backend, credentials).await {
            Ok(ack) => {
                notifier.notify(Notice::success(
                    "Trade Submitted",
                    format!("{} order sent to {}", self.form.pair, self.form.exchange),
                ));
                Ok(TradeOutcome {
                    ack,
                    resume: self.promotion.snapshot.clone(),
                })
            }
            Err(e) => {
                tracing::error!(signal_id = %self.promotion.signal.id, error = %e, "Trade submission failed");
                notifier.notify(Notice::error("Trade Failed", e.to_string()));
                Err(e)
            }
        }
    }

    async fn try_submit(
        &self,
        backend: &dyn AgentBackend,
        credentials: Option<&ExchangeCredentials>,
    ) -> Result<Value> {
        let order = self.form.validate().map_err(Error::Validation)?;

        let sealed = if order.exchange.requires_credentials() {
            let credentials = credentials.ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "No API credentials stored for {}",
                    order.exchange
                ))
            })?;
            let pem = backend.encryption_key().await?;
            Some(encrypt_credentials(&pem, credentials)?)
        } else {
            None
        };

        let request = TradeRequest::new(&self.promotion.signal, &order, sealed);
        let ack = backend.submit_trade(&request).await?;
        if !is_truthy(&ack) {
            return Err(Error::Backend("Trade was not accepted".to_string()));
        }
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::recording::RecordingNotifier;
    use crate::signals::fixtures::signal;
    use crate::signals::SignalReview;
    use crate::testing::FakeBackend;
    use crate::trade::Exchange;
    use serde_json::json;

    fn placement() -> TradePlacement {
        let mut review = SignalReview::new();
        review.load(vec![signal("a", 1), signal("b", 2)]);
        review.dismiss();
        TradePlacement::new(review.promote().unwrap())
    }

    #[test]
    fn symbol_strips_separators() {
        assert_eq!(exchange_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(exchange_symbol("eth-usdc"), "ETHUSDC");
    }

    #[test]
    fn cancel_returns_snapshot_untouched() {
        let mut placement = placement();
        placement.form_mut().amount = "999".to_string();
        let snapshot = placement.cancel();
        assert_eq!(snapshot.cursor, 1);
        assert_eq!(snapshot.signals.len(), 2);
    }

    #[tokio::test]
    async fn binance_trade_sends_encrypted_credentials() {
        let backend = FakeBackend::default().with_rsa_key();
        let notifier = RecordingNotifier::default();
        let credentials = ExchangeCredentials::new("api-key", "api-secret", None);

        let outcome = placement()
            .submit(&backend, Some(&credentials), &notifier)
            .await
            .unwrap();
        assert_eq!(outcome.resume.cursor, 1);

        let sent = backend.trades().pop().unwrap();
        assert_eq!(sent.exchange, "binance");
        assert_eq!(sent.trade_signal.id, "b");
        assert_eq!(sent.trade_signal.symbol, "BTCUSDT");
        assert_eq!(sent.trade_signal.side, "buy");
        assert_eq!(sent.trade_signal.amount, 10.0);
        assert_eq!(sent.trade_signal.entry, Some(100.0));
        let sealed = sent.credentials.unwrap();
        assert!(!sealed.contains("api-key"));
        let plain = backend.decrypt(&sealed);
        assert_eq!(plain["apiKey"], "api-key");
        assert_eq!(notifier.titles(), vec!["Trade Submitted"]);
    }

    #[tokio::test]
    async fn missing_credentials_blocks_cex_trade() {
        let backend = FakeBackend::default().with_rsa_key();
        let notifier = RecordingNotifier::default();

        let err = placement().submit(&backend, None, &notifier).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(backend.trades().is_empty());
    }

    #[tokio::test]
    async fn dex_trade_sends_no_credentials() {
        let backend = FakeBackend::default();
        let notifier = RecordingNotifier::default();
        let mut placement = placement();
        placement.form_mut().exchange = Exchange::Dex;

        placement.submit(&backend, None, &notifier).await.unwrap();
        let sent = backend.trades().pop().unwrap();
        assert_eq!(sent.exchange, "dex");
        assert!(sent.credentials.is_none());
        let body = serde_json::to_value(&sent).unwrap();
        assert!(body.get("credentials").is_none());
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_backend() {
        let backend = FakeBackend::default();
        let notifier = RecordingNotifier::default();
        let mut placement = placement();
        placement.form_mut().exchange = Exchange::Dex;
        placement.form_mut().amount = "abc".to_string();

        let err = placement.submit(&backend, None, &notifier).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(backend.trades().is_empty());
        assert_eq!(notifier.titles(), vec!["Trade Failed"]);
    }

    #[tokio::test]
    async fn falsy_ack_is_backend_error() {
        let backend = FakeBackend::default().with_trade_ack(json!(null));
        let notifier = RecordingNotifier::default();
        let mut placement = placement();
        placement.form_mut().exchange = Exchange::Dex;

        let err = placement.submit(&backend, None, &notifier).await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
    }
}
