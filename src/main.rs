// src/main.rs

use restic_runner::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(0) => {}
        Ok(errors) => {
            eprintln!(
                "restic-runner finished with {errors} error(s); rerun with `--log-level debug` for details"
            );
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("restic-runner error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<u32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
