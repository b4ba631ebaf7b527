use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use url::Url;

#[derive(Parser)]
#[command(name = "titan-cli")]
#[command(about = "Management CLI for the Titan API server", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://127.0.0.1:8081", env = "TITAN_ADMIN_URL")]
    url: String,

    /// Admin API key
    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION", env = "TITAN_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server status and uptime
    Status,
    /// Show request, block and session counters
    Analytics,
    /// List blocked IP addresses
    Blocked,
    /// Block an IP address
    Block {
        ip: String,
        #[arg(short, long)]
        reason: Option<String>,
        /// Block length in seconds; permanent when omitted
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Lift a runtime block
    Unblock { ip: String },
    /// List live sessions
    Sessions,
    /// Revoke every session of a user
    Revoke { email: String },
    /// Print the SHA-256 hash to put in `auth.users`
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (method, segments, body): (Method, Vec<String>, Option<Value>) = match cli.command {
        Commands::HashPassword { password } => {
            println!("{}", titan::auth::hash_password(&password));
            return Ok(());
        }
        Commands::Status => (Method::GET, vec!["status".into()], None),
        Commands::Analytics => (Method::GET, vec!["analytics".into()], None),
        Commands::Blocked => (Method::GET, vec!["blocked".into()], None),
        Commands::Block { ip, reason, duration } => (
            Method::POST,
            vec!["blocked".into()],
            Some(serde_json::json!({
                "ip": ip,
                "reason": reason,
                "duration_secs": duration,
            })),
        ),
        Commands::Unblock { ip } => (Method::DELETE, vec!["blocked".into(), ip], None),
        Commands::Sessions => (Method::GET, vec!["sessions".into()], None),
        Commands::Revoke { email } => (Method::DELETE, vec!["sessions".into(), email], None),
    };

    let url = endpoint(&Url::parse(&cli.url)?, &segments)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let mut request = reqwest::Client::new().request(method, url).headers(headers);
    if let Some(body) = body {
        request = request.json(&body);
    }
    print_response(request.send().await?).await
}

/// `<base>/admin/<segments...>` with each segment percent-encoded.
fn endpoint(base: &Url, segments: &[String]) -> Result<Url, Box<dyn std::error::Error>> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| format!("{} cannot be a base URL", base))?
        .pop_if_empty()
        .push("admin")
        .extend(segments);
    Ok(url)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
