use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use rhq_metrics_client::{logging, ClientConfig, DataPoint, MetricsClient, QueryOptions};

#[derive(Parser)]
#[command(name = "rhq-metrics")]
#[command(about = "Read and write RHQ Metrics time series", long_about = None)]
struct Cli {
    /// Metrics server host (defaults to RHQ_METRICS_HOST or localhost)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Metrics server port (defaults to RHQ_METRICS_PORT or 8080)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Base path of the metrics resource
    #[arg(long, global = true)]
    path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a series, by default over the last 8 hours
    Get {
        /// Metric id (e.g., "cpu1")
        id: String,

        /// Window start in epoch milliseconds
        #[arg(long)]
        start: Option<i64>,

        /// Window end in epoch milliseconds
        #[arg(long)]
        end: Option<i64>,

        /// Number of aggregation buckets
        #[arg(short, long)]
        buckets: Option<u32>,
    },

    /// Append one data point
    Post {
        /// Metric id
        id: String,

        /// Measured value
        value: f64,

        /// Timestamp in epoch milliseconds (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger("rhq_metrics_client").context("failed to initialize logging")?;

    let mut config = ClientConfig::from_env()?;
    if let Some(host) = cli.host {
        config = config.with_host(host);
    }
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    if let Some(path) = cli.path {
        config = config.with_base_path(path);
    }
    let client = MetricsClient::new(config);

    match cli.command {
        Commands::Get {
            id,
            start,
            end,
            buckets,
        } => {
            let options = QueryOptions {
                start,
                end,
                buckets,
            };
            let points = client.get(&id, options)?.await?;
            info!("Fetched {} points for {}", points.len(), id);
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        Commands::Post {
            id,
            value,
            timestamp,
        } => {
            let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());
            client.post(DataPoint::new(id.clone(), value, timestamp))?.await?;
            info!("Stored {} = {} at {}", id, value, timestamp);
        }
    }

    Ok(())
}
