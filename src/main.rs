use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hello_observability::config;
use hello_observability::lifecycle::{self, signals, Shutdown};

#[derive(Parser)]
#[command(name = "hello-observability")]
#[command(about = "HTTP service instrumented with metrics, traces and logs", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // No subscriber exists yet, so configuration errors go to stderr.
    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("hello-observability: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.check_config {
        println!("configuration ok");
        return ExitCode::SUCCESS;
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match lifecycle::run(config, &shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Logged errors were already emitted before telemetry shut down.
            if !e.is_logged() {
                eprintln!("hello-observability: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}
