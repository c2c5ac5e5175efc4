use colored::Colorize;
use std::process;

#[tokio::main]
async fn main() {
    let verbose = std::env::args().any(|arg| arg == "--verbose" || arg == "-v");
    init_logging(verbose);

    if let Err(e) = auto_signin::cli::run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        for suggestion in e.suggestions() {
            eprintln!("  {} {}", "→".dimmed(), suggestion);
        }
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("debug")
            .add_directive("chromiumoxide=info".parse().expect("valid directive"))
            .add_directive("hyper=info".parse().expect("valid directive"))
            .add_directive("reqwest=info".parse().expect("valid directive"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info").add_directive("chromiumoxide=off".parse().expect("valid directive"))
        })
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
