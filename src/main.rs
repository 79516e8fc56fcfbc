mod commands;
mod logging;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use stockpile::config::Config;

#[derive(Parser, Debug)]
#[command(name = "stockpile")]
#[command(about = "Inspect and edit Handwerks portal inventory articles")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/stockpile/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API root, overrides the config file
  #[arg(long)]
  base_url: Option<String>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration; --base-url alone is enough to run
  let config = match (Config::load(args.config.as_deref()), args.base_url) {
    (Ok(mut config), Some(url)) => {
      config.remote.base_url = url;
      config
    }
    (Ok(config), None) => config,
    (Err(_), Some(url)) if args.config.is_none() => Config::with_base_url(url),
    (Err(e), _) => return Err(e),
  };

  commands::run(&config, args.command).await
}
