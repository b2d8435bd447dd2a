use clap::Parser;
use pocket_prompt::api::LibraryService;
use pocket_prompt::cli::Cli;
use pocket_prompt::{commands, server};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("POCKET_PROMPT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("• {}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let svc = Arc::new(LibraryService::new().map_err(|e| e.to_string())?);

    if cli.init {
        svc.init_library().map_err(|e| e.to_string())?;
        println!("Initialized Pocket Prompt library at {}", svc.root().display());
        return Ok(());
    }

    svc.initialize_sync().await;
    if cli.no_git_sync || cli.sync_interval == Some(0) {
        svc.disable_sync();
    }
    let sync_interval = cli
        .sync_interval
        .map(|minutes| Duration::from_secs(minutes * 60));

    if cli.serve {
        let port = cli.port.unwrap_or(svc.config().server.port);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let background = svc.start_background_sync(sync_interval, shutdown_rx);

        let result = server::serve(Arc::clone(&svc), port)
            .await
            .map_err(|e| e.to_string());

        let _ = shutdown_tx.send(true);
        background.abort();
        return result;
    }

    match cli.command {
        Some(command) => commands::dispatch(command, &svc).await,
        None => {
            let (_shutdown_tx, shutdown_rx) = watch::channel(false);
            let _background = svc.start_background_sync(sync_interval, shutdown_rx);
            commands::interactive::run(&svc).await
        }
    }
}
