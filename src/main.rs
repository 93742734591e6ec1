use tracing_subscriber::EnvFilter;
use tunebot::{Config, TuneBot};

#[tokio::main]
async fn main() -> tunebot::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    TuneBot::new(config)?.run().await
}
