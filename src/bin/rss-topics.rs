//! Print the topics report of a set of feeds as JSON.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use daily_poem::config::Config;
use daily_poem::pipeline::{TopicExtractor, TopicsRequest};

/// Extract ranked, categorized topics from RSS feeds
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Feed URL to read (repeatable); defaults to the configured feeds
    #[arg(short, long = "feed")]
    feeds: Vec<String>,

    /// Maximum number of items read per feed
    #[arg(short, long)]
    max_per_feed: Option<usize>,

    /// Configuration file; defaults to `POEM_CONFIG`, then `poem.toml`
    #[arg(short, long)]
    config: Option<String>,

    /// Leave out per-feed diagnostics
    #[arg(long)]
    no_debug: bool,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pure JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daily_poem=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    let extractor = TopicExtractor::new(&config);

    let request = TopicsRequest {
        feeds: (!args.feeds.is_empty()).then(|| args.feeds.clone()),
        max_per_feed: args.max_per_feed,
    };
    let mut report = extractor.extract(&request).await;
    if args.no_debug {
        report.feed_debug.clear();
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);

    Ok(())
}
