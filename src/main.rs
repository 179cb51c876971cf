use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use vocab_card_rust::{Config, Mode};

#[derive(Parser, Debug)]
#[command(
    name = "vocab-card-rust",
    version,
    about = "Render vocabulary cards, serve them over HTTP, or post them on a schedule"
)]
struct Cli {
    /// Serve cards over HTTP (GET / and /card.png)
    #[arg(long = "server", conflicts_with = "bot")]
    server: bool,

    /// Listen address for --server (default from settings [server])
    #[arg(long = "addr", requires = "server")]
    addr: Option<String>,

    /// Post a card every [bot] interval_secs
    #[arg(long = "bot")]
    bot: bool,

    /// Render a local record JSON instead of fetching a word
    #[arg(short = 'i', long = "input", conflicts_with_all = ["server", "bot"])]
    input: Option<PathBuf>,

    /// Output PNG path for one-shot renders
    #[arg(short = 'o', long = "output", default_value = "vocab_card.png")]
    output: PathBuf,

    /// Enrichment API key (overrides the environment variable named in settings)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.server || cli.bot {
        vocab_card_rust::logging::init_service(cli.verbose)?;
    } else {
        vocab_card_rust::logging::init(cli.verbose)?;
    }

    let mode = if cli.server {
        Mode::Server { addr: cli.addr }
    } else if cli.bot {
        Mode::Bot
    } else {
        Mode::Render {
            input: cli.input,
            output: cli.output,
        }
    };
    let config = Config {
        mode,
        key: cli.key,
        settings_path: cli.read_settings,
    };

    let output = vocab_card_rust::run(config).await?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
