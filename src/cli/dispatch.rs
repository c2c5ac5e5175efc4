use super::{
    Cli,
    commands::{Command, ConfigCommand, DaemonCommand},
};
use crate::{
    Result, SignInError,
    client::{CoordinatorClient, is_daemon_running},
    config::Config,
    handlers::{config_handler, sign, status},
    output,
    schedule::{Clock, SystemClock},
    server::{Daemon, DaemonConfig, default_socket_path},
    timeouts::secs,
};
use std::path::PathBuf;
use std::process::{Command as ProcessCommand, Stdio};
use std::sync::Arc;
use std::time::Duration;

fn get_socket_path(config: &Config) -> PathBuf {
    config
        .server
        .socket_path
        .clone()
        .unwrap_or_else(default_socket_path)
}

fn start_daemon_background() -> Result<()> {
    let exe = std::env::current_exe()
        .map_err(|e| SignInError::General(format!("Failed to get executable path: {}", e)))?;

    ProcessCommand::new(exe)
        .args(["daemon", "start"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| SignInError::General(format!("Failed to spawn daemon: {}", e)))?;

    Ok(())
}

/// Connects to the daemon, starting it in the background first if needed.
async fn connect_daemon(config: &Config) -> Result<CoordinatorClient> {
    let socket_path = get_socket_path(config);

    if !is_daemon_running(&socket_path) {
        eprintln!("Starting daemon...");
        start_daemon_background()?;
        tokio::time::sleep(Duration::from_secs(secs::DAEMON_STARTUP)).await;

        if !is_daemon_running(&socket_path) {
            return Err(SignInError::DaemonNotRunning);
        }
    }

    CoordinatorClient::connect(&socket_path).await
}

pub async fn dispatch(mut cli: Cli, config: Arc<Config>) -> Result<()> {
    let command = match cli.command.take() {
        Some(cmd) => cmd,
        None => {
            eprintln!("No command provided. Use --help for usage.");
            std::process::exit(1);
        }
    };

    match command {
        Command::Daemon { subcommand } => handle_daemon_command(subcommand, &cli, &config).await,
        Command::Config { subcommand } => handle_config_command(subcommand, &cli, &config),
        Command::Status => {
            let mut client = connect_daemon(&config).await?;
            let report = status::handle_status(&mut client, SystemClock.now_ms()).await?;
            output::print_output(&report, cli.json)
        }
        Command::Check => {
            let mut client = connect_daemon(&config).await?;
            let report = status::handle_check(&mut client).await?;
            output::print_output(&report, cli.json)
        }
        Command::Reset => {
            let mut client = connect_daemon(&config).await?;
            let report = status::handle_reset(&mut client).await?;
            output::print_output(&report, cli.json)
        }
        Command::Sign { url } => {
            let socket_path = get_socket_path(&config);
            let report = sign::handle_sign(Arc::clone(&config), url, &socket_path).await?;
            output::print_output(&report, cli.json)
        }
    }
}

async fn handle_daemon_command(
    subcommand: DaemonCommand,
    cli: &Cli,
    config: &Arc<Config>,
) -> Result<()> {
    match subcommand {
        DaemonCommand::Start { socket } => {
            let mut daemon_config = DaemonConfig::resolve(config)?;
            if let Some(socket) = socket {
                daemon_config.socket_path = socket;
            }

            if is_daemon_running(&daemon_config.socket_path) {
                println!(
                    "{}",
                    output::text::info(&format!(
                        "Daemon already running at {}",
                        daemon_config.socket_path.display()
                    ))
                );
                return Ok(());
            }

            let daemon = Daemon::new(Arc::clone(config), daemon_config);
            eprintln!("Starting daemon...");
            daemon.run().await
        }

        DaemonCommand::Stop => {
            let socket_path = get_socket_path(config);

            let Some(pid) = Daemon::read_pid(&socket_path).filter(|_| Daemon::is_running(&socket_path))
            else {
                println!("{}", output::text::warning("Daemon not running"));
                return Ok(());
            };

            if !crate::utils::terminate_process(pid) {
                return Err(SignInError::General(format!(
                    "Failed to signal daemon process {}",
                    pid
                )));
            }
            println!("{}", output::text::success("Daemon stopped"));
            Ok(())
        }

        DaemonCommand::Status => {
            let socket_path = get_socket_path(config);
            let report = status::DaemonStatus {
                running: is_daemon_running(&socket_path),
                pid: Daemon::read_pid(&socket_path),
                socket_path,
            };
            output::print_output(&report, cli.json)
        }
    }
}

fn handle_config_command(subcommand: ConfigCommand, cli: &Cli, config: &Config) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => crate::config::default_config_path()?,
    };

    match subcommand {
        ConfigCommand::Init => {
            let result = config_handler::handle_config_init(&path)?;
            output::print_output(&result, cli.json)
        }
        ConfigCommand::Show => {
            let result = config_handler::handle_config_show(config);
            output::print_output(&result, cli.json)
        }
        ConfigCommand::Path => {
            let result = config_handler::handle_config_path(&path);
            output::print_output(&result, cli.json)
        }
    }
}
