use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Manage the coordinator daemon")]
    Daemon {
        #[command(subcommand)]
        subcommand: DaemonCommand,
    },

    #[command(about = "Show check-in state and schedule")]
    Status,

    #[command(about = "Open the check-in page if a check-in is due")]
    Check,

    #[command(about = "Forget the last check-in so the next check signs in again")]
    Reset,

    #[command(about = "Open the check-in page and run the check-in once")]
    Sign {
        #[arg(long, help = "Page to open instead of the configured sign-in URL")]
        url: Option<String>,
    },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        subcommand: ConfigCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum DaemonCommand {
    #[command(about = "Start the daemon in the foreground")]
    Start {
        #[arg(long, help = "Custom socket path")]
        socket: Option<std::path::PathBuf>,
    },

    #[command(about = "Stop a running daemon")]
    Stop,

    #[command(about = "Show daemon status")]
    Status,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    #[command(about = "Initialize config file with defaults")]
    Init,

    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Show config file path")]
    Path,
}
