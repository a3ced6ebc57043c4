use account_ledger::prelude::*;
use tokio::io::{BufWriter, Stdout};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    init_tracing();

    let input_file = match parse_args(std::env::args().collect()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    CliApp::new("account-ledger")
        .run(|stdout| run_ledger(stdout, input_file))
        .await
}

/// Logs go to stderr; stdout carries the balance snapshot
fn init_tracing() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

/// Parse and validate command-line arguments
fn parse_args(args: Vec<String>) -> Result<String, AppError> {
    if args.len() != 2 {
        return Err(AppError::InvalidArguments(
            "Usage: account-ledger <intents.csv>".to_string(),
        ));
    }
    Ok(args[1].clone())
}

/// Enqueue every intent, wait for the workers to drain, print balances
async fn run_ledger(mut stdout: BufWriter<Stdout>, input_file: String) -> Result<(), AppError> {
    let config = Config::from_env()?;
    let intents = CsvIntentStream::from_file(&input_file).await?;

    let runtime = Runtime::start(config).await?;
    runtime.ingest(intents).await?;
    runtime.await_drained().await?;

    let accounts = runtime.snapshot()?;
    runtime.shutdown().await?;

    write_snapshot(&accounts, &mut stdout).await?;
    Ok(())
}
