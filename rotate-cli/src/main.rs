use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_sesv2::Client as SesClient;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use church_shared::rotation::{run_rotation, RotationParams};

#[derive(Parser, Debug)]
#[command(name = "rotate-cli")]
#[command(version)]
#[command(about = "Assign volunteers to unfilled ministry shifts")]
struct Args {
    /// Lookahead window in days, counted from today
    #[arg(long, default_value_t = 14)]
    days: i64,

    /// Compute the pass without persisting assignments or sending email
    #[arg(long)]
    dry_run: bool,

    /// Send a notification email per created assignment
    #[arg(long)]
    notify: bool,

    /// Stop assigning for a ministry once this many assignments were created
    #[arg(long)]
    limit_per_ministry: Option<u32>,

    /// Ministry id to process; repeat for several, omit for all ministries
    #[arg(long = "ministry-ids")]
    ministry_ids: Vec<String>,

    /// DynamoDB table name (defaults to the TABLE_NAME env var)
    #[arg(long)]
    table_name: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let table_name = args
        .table_name
        .or_else(|| std::env::var("TABLE_NAME").ok())
        .unwrap_or_else(|| "church-ops".to_string());

    let config = aws_config::load_from_env().await;
    let dynamo_client = DynamoClient::new(&config);
    let ses_client = SesClient::new(&config);

    let params = RotationParams {
        ministry_ids: args.ministry_ids,
        days: args.days,
        dry_run: args.dry_run,
        notify: args.notify,
        limit_per_ministry: args.limit_per_ministry,
    };

    match run_rotation(&dynamo_client, &ses_client, &table_name, &params).await {
        Ok(summary) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).unwrap_or_default()
            );
        }
        Err(e) => {
            eprintln!("rotation failed: {}", e);
            std::process::exit(1);
        }
    }
}
