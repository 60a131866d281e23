//! Demo server: a health check and a small account API on top of kfcore.
//!
//! ```text
//! GET  /health            public   → "ok"
//! POST /accounts/register public   {email, name}
//! POST /accounts/login    public   {email} → {token}
//! GET  /accounts/me       token    → claims
//! POST /accounts/logout   token    → 204
//! ```

use clap::Parser;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

use kfcore::config::loader::{default_config, load_config};
use kfcore::lifecycle::{wait_for_signal, Shutdown};
use kfcore::observability::{logging, metrics};
use kfcore::{
    ActionSpec, Args, Controller, CoreError, CoreResult, HttpServer, ParamKind, Provider,
    Registry, TokenService,
};

#[derive(Parser)]
#[command(name = "kfcore")]
#[command(about = "kfcore demo server", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct Account {
    email: String,
    name: String,
}

/// Registered accounts, shared through the provider.
#[derive(Debug, Default)]
struct Directory {
    accounts: DashMap<String, Account>,
}

struct HealthController;

impl Controller for HealthController {
    fn create(_provider: &Provider) -> CoreResult<Self> {
        Ok(HealthController)
    }
}

struct AccountController {
    tokens: Arc<TokenService>,
    directory: Arc<Directory>,
}

impl Controller for AccountController {
    fn create(provider: &Provider) -> CoreResult<Self> {
        Ok(AccountController {
            tokens: provider.require::<TokenService>()?,
            directory: provider.resolve::<Directory>(),
        })
    }
}

impl AccountController {
    fn register(&self, args: Args) -> CoreResult<Account> {
        let email = args.str(0)?.trim().to_lowercase();
        let name = args.str(1)?.trim().to_string();
        if !email.contains('@') {
            return Err(CoreError::FieldIncorrect("email".into()));
        }

        match self.directory.accounts.entry(email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(CoreError::FieldUsed(email)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let account = Account { email, name };
                slot.insert(account.clone());
                tracing::info!(email = %account.email, "Account registered");
                Ok(account)
            }
        }
    }

    async fn login(self: Arc<Self>, args: Args) -> CoreResult<Value> {
        let email = args.str(0)?.trim().to_lowercase();
        let account = self
            .directory
            .accounts
            .get(&email)
            .map(|a| a.clone())
            .ok_or(CoreError::UserNotExist)?;

        let token = self.tokens.sign(&json!({
            "sub": account.email,
            "name": account.name,
            "jti": Uuid::new_v4(),
        }))?;
        self.tokens.add_session(&token).await?;
        Ok(json!({ "token": token }))
    }

    async fn logout(self: Arc<Self>, args: Args) -> CoreResult<Value> {
        self.tokens.remove_session(args.context(0)?).await?;
        Ok(Value::Null)
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();

    registry
        .controller::<HealthController>("/health")
        .action(ActionSpec::get("check", "").public(), |_: &HealthController, _| Ok("ok"));

    registry
        .controller::<AccountController>("/accounts")
        .action(
            ActionSpec::post("register", "/register")
                .public()
                .param(ParamKind::body_field("email"))
                .param(ParamKind::body_field("name")),
            AccountController::register,
        )
        .action_async(
            ActionSpec::post("login", "/login")
                .public()
                .param(ParamKind::body_field("email")),
            AccountController::login,
        )
        .action(
            ActionSpec::get("me", "/me").param(ParamKind::CurrentUser),
            |_: &AccountController, args| args.value(0).cloned(),
        )
        .action_async(
            ActionSpec::post("logout", "/logout").param(ParamKind::Context),
            AccountController::logout,
        );

    registry
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init(&config.observability);
    tracing::info!("kfcore v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        session_ttl_secs = config.session.ttl_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let provider = Provider::new().with_singleton(Directory::default());
    let server = HttpServer::with_memory_store(config.clone(), registry(), provider)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
