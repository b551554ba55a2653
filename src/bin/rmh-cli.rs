use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rmh-cli")]
#[command(about = "Query a running rmh-proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness check
    Ping,
    /// Show which credentials and fallback policy the proxy runs with
    Diag,
    /// Fetch dataset rows through /cms-proxy
    Query {
        #[arg(short, long)]
        dataset: String,
        #[arg(short, long)]
        q: Option<String>,
        #[arg(short, long)]
        state: Option<String>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        offset: Option<u64>,
        #[arg(long)]
        provider_id: Option<String>,
        /// Only try the Socrata upstream
        #[arg(long)]
        socrata: bool,
    },
    /// Show a few HCAHPS rows straight from the CSV download
    HcahpsSample,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.base.trim_end_matches('/');

    let request = match cli.command {
        Commands::Ping => client.get(format!("{}/ping", base)),
        Commands::Diag => client.get(format!("{}/diag", base)),
        Commands::HcahpsSample => client.get(format!("{}/hcahps-sample", base)),
        Commands::Query {
            dataset,
            q,
            state,
            size,
            offset,
            provider_id,
            socrata,
        } => {
            let mut params = vec![("dataset", dataset)];
            params.extend(q.map(|v| ("q", v)));
            params.extend(state.map(|v| ("state", v)));
            params.extend(size.map(|v| ("size", v.to_string())));
            params.extend(offset.map(|v| ("offset", v.to_string())));
            params.extend(provider_id.map(|v| ("provider_id", v)));
            if socrata {
                params.push(("mode", "socrata".to_string()));
            }
            client.get(format!("{}/cms-proxy", base)).query(&params)
        }
    };

    let res = request.send().await?;
    if let Some(source) = res.headers().get("x-upstream-source") {
        eprintln!("source: {}", source.to_str().unwrap_or("?"));
    }
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
