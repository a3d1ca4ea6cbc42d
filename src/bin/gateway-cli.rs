use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use admission_gateway::admission::signer::{sign, signed_headers};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Client tool for the signed-request admission gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the signature of a body
    Sign {
        #[arg(short, long)]
        body: String,
        #[arg(short, long)]
        secret: String,
    },
    /// Send a signed GET request through the gateway
    Call {
        #[arg(short, long, default_value = "http://localhost:8090/")]
        url: String,
        #[arg(short, long)]
        access_key: String,
        #[arg(short, long)]
        secret: String,
        #[arg(short, long, default_value = "")]
        body: String,
        /// Nonce to send; random in 0..=10000 when omitted
        #[arg(short, long)]
        nonce: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign { body, secret } => {
            println!("{}", sign(&body, &secret));
        }
        Commands::Call {
            url,
            access_key,
            secret,
            body,
            nonce,
        } => {
            let nonce = nonce.unwrap_or_else(|| rand::thread_rng().gen_range(0..=10_000));
            let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

            let mut headers = HeaderMap::new();
            for (name, value) in signed_headers(&access_key, &secret, &body, nonce, timestamp) {
                headers.insert(HeaderName::from_static(name), HeaderValue::from_str(&value)?);
            }

            let res = reqwest::Client::new().get(&url).headers(headers).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            if !text.is_empty() {
                eprintln!("Response: {}", text);
            }
        }
        return Ok(());
    }

    let text = res.text().await?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
