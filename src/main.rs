//! Binary entry point that wires environment bootstrap, credential
//! loading, and the voice agent runtime.

use anyhow::Result;
use clap::Parser;

use aibot::app;
use aibot::config::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match config::load(Cli::parse()) {
        Ok(config) => config,
        Err(err) => {
            // The one fatal path: no model key means nothing to talk to.
            eprintln!("{err}");
            eprintln!("Example: aibot <model-key> [tts-key]");
            std::process::exit(1);
        }
    };

    app::run(config).await
}
