use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "hash-cli")]
#[command(about = "Client for the deferred password hashing service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a password for hashing
    Submit { password: String },
    /// Fetch the digest for an identifier
    Get { id: i64 },
    /// Show per-endpoint call counts and average latency
    Stats,
    /// Ask the server to shut down gracefully
    Shutdown,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Submit { password } => {
            client
                .post(format!("{}/hash", cli.url))
                .form(&[("password", password)])
                .send()
                .await?
        }
        Commands::Get { id } => client.get(format!("{}/hash/{}", cli.url, id)).send().await?,
        Commands::Stats => client.get(format!("{}/stats", cli.url)).send().await?,
        Commands::Shutdown => client.get(format!("{}/shutdown", cli.url)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
