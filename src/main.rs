use chrono::Utc;
use reddit_client::{RedditClient, RedditOAuth2Config};
use std::process::ExitCode;
use stonks_core::{CoreError, Credentials, ErrorReporter, Settings};
use ticker_scanner::ScanContext;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "stonks_bot=info,ticker_scanner=info,reddit_client=info";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting stonks-bot");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", ErrorReporter::new().report_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), CoreError> {
    let settings = Settings::load(&Settings::default_path())?;

    // Everything local is checked before the first network call.
    let ctx = ScanContext::from_settings(settings)?;
    let creds = Credentials::resolve(&ctx.settings.credentials_path)?;

    let client = RedditClient::connect(RedditOAuth2Config::from(&creds)).await?;

    let summary = ticker_scanner::run(&ctx, &client, Utc::now()).await?;
    println!(
        "\n{} posts read, {} mentions of {} tickers, {} rows appended to {}",
        summary.posts_fetched,
        summary.mentions,
        summary.tally.len(),
        summary.rows_written,
        ctx.settings.output_path.display()
    );

    let status = client.api().rate_limiter().get_rate_limit_status().await;
    tracing::debug!("Final rate limit status: {:?}", status);
    Ok(())
}
