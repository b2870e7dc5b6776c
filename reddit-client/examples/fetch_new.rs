use reddit_client::RedditClient;
use snoofeed_core::{HarvestConfig, PostSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== Reddit /new Manual Test ===\n");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = HarvestConfig::load(&config_path)?;
    let client = RedditClient::from_config(&config)?;
    println!("Client created for user {}\n", config.reddit.username);

    let subscriptions = client.list_subscriptions(100).await?;
    println!("Subscribed to {} communities", subscriptions.len());
    for subscription in subscriptions.iter().take(10) {
        println!("  r/{} ({} subscribers)", subscription.subreddit, subscription.subscribers);
    }

    let page = client.list_new(None, 10).await?;
    println!("\nNewest {} posts (last page: {}):", page.items.len(), page.is_last);
    for item in &page.items {
        println!(
            "  {} [{}] {} ({} / {})",
            item.id, item.subreddit, item.title, item.num_comments, item.score
        );
    }

    Ok(())
}
