use reddit_client::{RedditClient, RedditOAuth2Config};
use std::path::Path;
use stonks_core::{CoreError, Credentials};

/// Lists the newest posts of one subreddit and the size of their comment trees.
///
/// Usage: cargo run -p reddit-client --example fetch_posts -- wallstreetbets 5
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let subreddit = args.next().unwrap_or_else(|| "wallstreetbets".to_string());
    let limit = args
        .next()
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(5);

    let creds = Credentials::resolve(Path::new("creds.yaml"))?;
    let client = RedditClient::connect(RedditOAuth2Config::from(&creds)).await?;
    println!("Authenticated: {}", client.is_authenticated().await);

    for post in client.fetch_new_posts(&subreddit, limit).await? {
        let comments = client.fetch_comments(&post.id).await?;
        let placeholders = comments.iter().filter(|node| node.is_expandable()).count();
        println!(
            "{} | {} | {} top-level comments ({} deferred) | seen={}",
            post.created_utc.format("%Y-%m-%d %H:%M"),
            post.title,
            comments.len() - placeholders,
            placeholders,
            post.seen
        );
    }

    let status = client.api().rate_limiter().get_rate_limit_status().await;
    println!("Rate limit: {:?}", status);
    Ok(())
}
