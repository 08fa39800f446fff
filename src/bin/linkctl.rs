use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "linkctl")]
#[command(about = "Management CLI for the link resilience controller", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "LINKCTL_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show controller status
    Status,
    /// Show the full metrics snapshot
    Metrics,
    /// Validate KPIs against configured thresholds
    Kpis,
    /// Trigger a failover (reselect, or switch to a named link)
    Failover {
        #[arg(short, long)]
        target: Option<String>,
    },
    /// Force a link's probe outcome
    Force {
        link: String,
        #[arg(value_enum)]
        status: ForcedStatus,
    },
    /// Clear a forced probe outcome
    Clear { link: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum ForcedStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ForcedStatus {
    fn as_str(self) -> &'static str {
        match self {
            ForcedStatus::Healthy => "healthy",
            ForcedStatus::Degraded => "degraded",
            ForcedStatus::Unhealthy => "unhealthy",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Metrics => client.get(format!("{}/admin/metrics", cli.url)),
        Commands::Kpis => client.get(format!("{}/admin/kpis", cli.url)),
        Commands::Failover { target } => client
            .post(format!("{}/admin/failover", cli.url))
            .json(&json!({ "target": target })),
        Commands::Force { link, status } => client
            .put(format!("{}/admin/links/{}/override", cli.url, link))
            .json(&json!({ "status": status.as_str() })),
        Commands::Clear { link } => client
            .put(format!("{}/admin/links/{}/override", cli.url, link))
            .json(&json!({ "status": null })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
