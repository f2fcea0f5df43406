//! Agent Launch CLI
//!
//! Headless front end driving the same state machines a browser UI would.

use agent_launch::api::AgentRef;
use agent_launch::notify::{Notifier, TracingNotifier};
use agent_launch::roster::AgentRoster;
use agent_launch::signals::{RealtimeFeed, ReviewSession, ReviewStart, TradingSignal};
use agent_launch::storage::{JsonFileRepository, Repository};
use agent_launch::trade::{
    CredentialMap, Exchange, ExchangeCredentialStore, ExchangeCredentials, TradePlacement,
};
use agent_launch::wallet::{
    LocalWalletProvider, SessionManager, StoredSession, WalletProvider, PRIVATE_KEY_ENV,
};
use agent_launch::wizard::{Advance, AgentArchetype, DeployOutcome, Deployer, WizardEngine, WizardForm};
use agent_launch::{AgentBackend, ApiClient, Config, Error, Result};
use clap::{Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "agent-launch")]
#[command(about = "Deploy and supervise AI trading agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with the wallet in PRIVATE_KEY
    Login,

    /// Forget the stored session
    Logout,

    /// Show the restored session, if any
    Whoami,

    /// List your deployed agents
    Agents,

    /// Start a stopped agent or stop a running one
    Toggle {
        /// Agent id as shown by `agents`
        agent: String,
    },

    /// List featured agents
    Featured,

    /// Review an agent's trading signals
    Signals {
        /// Agent route in the form <appId>-<agentId>
        agent: String,

        /// Keep listening for realtime signals
        #[arg(short, long)]
        follow: bool,
    },

    /// Place a trade from one of an agent's signals
    Trade {
        /// Agent route in the form <appId>-<agentId>
        agent: String,

        /// Signal id to trade
        #[arg(long)]
        signal: String,

        /// Exchange (binance, kucoin, dex)
        #[arg(short, long, default_value = "binance")]
        exchange: String,

        /// Order amount, overriding the pre-filled value
        #[arg(long)]
        amount: Option<String>,
    },

    /// Store API credentials for an exchange
    Credentials {
        /// Exchange (binance, kucoin)
        #[arg(short, long)]
        exchange: String,

        #[arg(long)]
        api_key: String,

        #[arg(long)]
        secret: String,

        /// Passphrase, required by some exchanges
        #[arg(long)]
        password: Option<String>,
    },

    /// Run the deployment wizard over a form file
    Deploy {
        /// Wizard form as JSON
        #[arg(short, long)]
        form: PathBuf,

        /// Agent archetype (social, onchain)
        #[arg(short, long, default_value = "social")]
        archetype: String,

        /// Hosting provider code from the catalog
        #[arg(short, long)]
        provider: Option<String>,

        /// Use the free trial instead of paying
        #[arg(long)]
        free_trial: bool,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env(),
    };
    config.validate()?;

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    match cli.command {
        Commands::Login => run_login(&config, notifier).await?,
        Commands::Logout => {
            let mut manager = session_manager(&config, local_provider(), notifier)?;
            manager.disconnect()?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let mut manager = session_manager(&config, local_provider(), notifier)?;
            match manager.restore().await? {
                Some(session) => println!(
                    "{} (since {})",
                    session.address(),
                    session.connected_at().to_rfc3339()
                ),
                None => println!("Not logged in"),
            }
        }
        Commands::Agents => run_agents(&config, notifier).await?,
        Commands::Toggle { agent } => run_toggle(&config, notifier, &agent).await?,
        Commands::Featured => {
            let client = ApiClient::new(&config.api_url)?;
            let agents = client.featured_agents().await?;
            println!("{}", serde_json::to_string_pretty(&agents)?);
        }
        Commands::Signals { agent, follow } => run_signals(&config, notifier, &agent, follow).await?,
        Commands::Trade {
            agent,
            signal,
            exchange,
            amount,
        } => run_trade(&config, notifier, &agent, &signal, &exchange, amount).await?,
        Commands::Credentials {
            exchange,
            api_key,
            secret,
            password,
        } => {
            let exchange = parse_exchange(&exchange)?;
            let store = credential_store(&config);
            store.set(exchange, &ExchangeCredentials::new(api_key, secret, password))?;
            println!("Stored credentials for {}", exchange);
        }
        Commands::Deploy {
            form,
            archetype,
            provider,
            free_trial,
        } => run_deploy(&config, notifier, &form, &archetype, provider, free_trial).await?,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Headless wallet from PRIVATE_KEY, if set
fn local_provider() -> Option<Arc<dyn WalletProvider>> {
    match LocalWalletProvider::from_env(PRIVATE_KEY_ENV) {
        Ok(wallet) => {
            tracing::debug!(address = %wallet.address(), "Loaded wallet from PRIVATE_KEY");
            Some(Arc::new(wallet))
        }
        Err(e) => {
            tracing::debug!(error = %e, "No local wallet available");
            None
        }
    }
}

fn session_manager(
    config: &Config,
    provider: Option<Arc<dyn WalletProvider>>,
    notifier: Arc<dyn Notifier>,
) -> Result<SessionManager> {
    let backend: Arc<dyn AgentBackend> = Arc::new(ApiClient::new(&config.api_url)?);
    let store: Arc<dyn Repository<StoredSession>> =
        Arc::new(JsonFileRepository::new(config.session_path()));
    Ok(SessionManager::new(provider, backend, store, notifier))
}

fn credential_store(config: &Config) -> ExchangeCredentialStore {
    let repo: Arc<dyn Repository<CredentialMap>> =
        Arc::new(JsonFileRepository::new(config.exchange_credentials_path()));
    ExchangeCredentialStore::new(repo)
}

fn parse_exchange(name: &str) -> Result<Exchange> {
    name.parse::<Exchange>().map_err(Error::InvalidArgument)
}

/// Restore the stored session and return its wallet with an authorized client
async fn authenticated(config: &Config, notifier: Arc<dyn Notifier>) -> Result<(String, ApiClient)> {
    let mut manager = session_manager(config, local_provider(), notifier)?;
    let session = manager.restore().await?.ok_or(Error::NoSession)?;
    let token = SecretString::from(session.token().expose_secret().to_string());
    let client = ApiClient::new(&config.api_url)?.with_token(token);
    Ok((session.address().to_string(), client))
}

async fn run_login(config: &Config, notifier: Arc<dyn Notifier>) -> Result<()> {
    let provider: Arc<dyn WalletProvider> = Arc::new(LocalWalletProvider::from_env(PRIVATE_KEY_ENV)?);
    let mut manager = session_manager(config, Some(provider), notifier)?;
    let session = manager.connect().await?;
    println!("Logged in as {}", session.address());
    Ok(())
}

async fn run_agents(config: &Config, notifier: Arc<dyn Notifier>) -> Result<()> {
    let (wallet, client) = authenticated(config, notifier.clone()).await?;
    let roster = AgentRoster::load(&client, &wallet, notifier).await?;

    for agent in roster.agents() {
        println!(
            "{:<38} {:<6} {:<9} {}",
            agent.id, agent.app_id, agent.status, agent.name
        );
    }
    let stats = roster.stats();
    println!(
        "{} agents ({} active, {} inactive)",
        stats.total, stats.active, stats.inactive
    );
    Ok(())
}

async fn run_toggle(config: &Config, notifier: Arc<dyn Notifier>, agent_id: &str) -> Result<()> {
    let (wallet, client) = authenticated(config, notifier.clone()).await?;
    let mut roster = AgentRoster::load(&client, &wallet, notifier).await?;
    let status = roster.toggle(&client, agent_id).await?;
    println!("{} is now {}", agent_id, status);
    Ok(())
}

fn print_signal(signal: &TradingSignal) {
    println!(
        "{} {} {:?} entry={} stop={} targets={:?} at {}",
        signal.id,
        signal.ticker,
        signal.direction,
        signal
            .entry_price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        signal
            .stop_price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        signal.targets,
        signal.timestamp.to_rfc3339()
    );
}

async fn run_signals(
    config: &Config,
    notifier: Arc<dyn Notifier>,
    route: &str,
    follow: bool,
) -> Result<()> {
    let agent = AgentRef::parse(route)?;
    let (_, client) = authenticated(config, notifier.clone()).await?;
    let mut session = ReviewSession::open(
        &client,
        agent.clone(),
        ReviewStart::Fresh,
        config.signals_page_size,
        notifier,
    )
    .await;

    for signal in session.review().signals() {
        print_signal(signal);
    }
    if !follow {
        return Ok(());
    }

    let mut feed = RealtimeFeed::connect(&config.socket_url, &agent.agent_id).await?;
    tracing::info!(%agent, "Listening for realtime signals (ctrl-c to stop)");
    loop {
        tokio::select! {
            signal = feed.next() => match signal {
                Some(signal) => {
                    print_signal(&signal);
                    session.apply(signal);
                }
                None => {
                    tracing::warn!(%agent, "Realtime feed closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn run_trade(
    config: &Config,
    notifier: Arc<dyn Notifier>,
    route: &str,
    signal_id: &str,
    exchange: &str,
    amount: Option<String>,
) -> Result<()> {
    let agent = AgentRef::parse(route)?;
    let exchange = parse_exchange(exchange)?;
    let (_, client) = authenticated(config, notifier.clone()).await?;

    let session = ReviewSession::open(
        &client,
        agent,
        ReviewStart::Focus(signal_id.to_string()),
        config.signals_page_size,
        notifier.clone(),
    )
    .await;
    if session.current().map(|s| s.id.as_str()) != Some(signal_id) {
        return Err(Error::InvalidArgument(format!("Signal {} not found", signal_id)));
    }
    let promotion = session
        .promote()
        .ok_or_else(|| Error::InvalidArgument(format!("Signal {} not found", signal_id)))?;

    let mut placement = TradePlacement::new(promotion);
    placement.form_mut().exchange = exchange;
    if let Some(amount) = amount {
        placement.form_mut().amount = amount;
    }

    let credentials = if exchange.requires_credentials() {
        credential_store(config).get(exchange)?
    } else {
        None
    };
    let outcome = placement
        .submit(&client, credentials.as_ref(), notifier.as_ref())
        .await?;
    println!("{}", serde_json::to_string_pretty(&outcome.ack)?);
    Ok(())
}

async fn run_deploy(
    config: &Config,
    notifier: Arc<dyn Notifier>,
    form_path: &Path,
    archetype: &str,
    provider: Option<String>,
    free_trial: bool,
) -> Result<()> {
    let archetype: AgentArchetype = archetype.parse()?;
    let content = std::fs::read_to_string(form_path)
        .map_err(|e| Error::Config(format!("{}: {}", form_path.display(), e)))?;
    let form: WizardForm = serde_json::from_str(&content)?;

    let (wallet, client) = authenticated(config, notifier.clone()).await?;
    let mut engine = WizardEngine::mount(&client, &wallet, archetype, config, notifier.clone())
        .await
        .with_form(form);
    if let Some(code) = provider {
        engine.select_provider(&code)?;
    }

    loop {
        if engine.is_final_step() && !engine.provider().is_paid() {
            if free_trial {
                engine.apply_free_trial();
            } else {
                engine.pay();
            }
        }
        let step = engine.current_step();
        match engine.next()? {
            Advance::Moved(position) => {
                tracing::info!(?step, position, total = engine.total_steps(), "Step complete");
            }
            Advance::ReadyToDeploy => break,
        }
    }

    let deployer = Deployer::new(notifier);
    match deployer.submit(&client, &engine, Some(&wallet)).await? {
        DeployOutcome::Deployed(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        DeployOutcome::AlreadyInFlight => println!("A deployment is already in progress"),
    }
    Ok(())
}
