// src/main.rs

use relaybot::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("relaybot error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    // A missing .env file is fine; the token may come from the real environment.
    dotenvy::dotenv().ok();
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
