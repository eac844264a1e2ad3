use anyhow::Result;
use clap::Parser;
use narrate_common::observability::{LogConfig, init_logging};
use std::time::Duration;

mod cli;
mod launch;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = cli.load_config()?;

    let log_path = init_logging(LogConfig {
        app_name: "narrate",
        log_dir: config.logging.dir.clone(),
        emit_stderr: config.logging.emit_stderr,
        format: config.logging.format,
        default_filter: "info",
    })?;
    tracing::info!(
        target: "nav.loop",
        log = %log_path.display(),
        start_url = %config.start_url,
        "narrate.starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(launch::run(&config));
    // A pending stdin read would otherwise hold shutdown open.
    runtime.shutdown_timeout(Duration::from_millis(250));
    outcome
}
