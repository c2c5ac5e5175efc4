pub mod commands;
pub mod dispatch;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "auto-signin")]
#[command(version, about = "Daily check-in agent driving Chrome over the DevTools Protocol")]
#[command(
    long_about = "Keeps a daily website check-in done: a background daemon decides when a check-in is due, opens the page in Chrome and clicks the check-in button"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<commands::Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Run Chrome in headless mode")]
    pub headless: Option<bool>,

    #[arg(long, global = true, help = "Chrome debugging port")]
    pub port: Option<u16>,

    #[arg(long, global = true, help = "Path to Chrome executable")]
    pub chrome_path: Option<PathBuf>,
}

pub async fn run() -> crate::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        let content = std::fs::read_to_string(config_path)?;
        toml::from_str(&content)?
    } else {
        crate::config::Config::load()?
    };

    let overrides = crate::config::ConfigOverrides {
        headless: cli.headless,
        port: cli.port,
        chrome_path: cli.chrome_path.clone(),
        socket_path: None,
    };

    let config = Arc::new(config.load_with_overrides(overrides));
    config.validate()?;

    dispatch::dispatch(cli, config).await
}
