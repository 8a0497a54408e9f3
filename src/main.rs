// src/main.rs

use relaybot::{cli, logging, run};

#[tokio::main]
async fn main() {
    let code = match run_main().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("relaybot error: {err:?}");
            1
        }
    };
    // Stdin is read on a blocking thread; exit instead of waiting for it
    // during runtime shutdown.
    std::process::exit(code);
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
