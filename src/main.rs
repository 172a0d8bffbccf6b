// src/main.rs

use jobloop::engine::StopHandle;
use jobloop::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("jobloop error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    // Ctrl-C → leave the run loop between steps; `run` then checkpoints.
    let stop = StopHandle::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            stop.raise();
        });
    }

    // The scheduler loop is synchronous; keep it off the async workers.
    tokio::task::spawn_blocking(move || run(args, stop)).await??;
    Ok(())
}
