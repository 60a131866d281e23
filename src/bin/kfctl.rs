use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "kfctl")]
#[command(about = "Management CLI for a running kfcore server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token for protected commands.
    #[arg(short, long, env = "KFCORE_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,
    /// Register an account
    Register { email: String, name: String },
    /// Log in and print a token
    Login { email: String },
    /// Show the claims of the current token
    Whoami,
    /// End the session of the current token
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Register { email, name } => {
            client
                .post(format!("{}/accounts/register", cli.url))
                .json(&json!({ "email": email, "name": name }))
                .send()
                .await?
        }
        Commands::Login { email } => {
            client
                .post(format!("{}/accounts/login", cli.url))
                .json(&json!({ "email": email }))
                .send()
                .await?
        }
        Commands::Whoami => {
            client
                .get(format!("{}/accounts/me", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Logout => {
            client
                .post(format!("{}/accounts/logout", cli.url))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(envelope)) => eprintln!(
                "{}: {}",
                envelope.get("name").and_then(Value::as_str).unwrap_or("Error"),
                envelope.get("message").and_then(Value::as_str).unwrap_or_default()
            ),
            _ => eprintln!("Response: {}", text),
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
