#![allow(missing_docs)]

use std::process::ExitCode;

use catalog_warmer_lib::application::ServiceContext;
use catalog_warmer_lib::infrastructure::{AppConfig, init_logging_with_config, logging::log_system_info};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging_with_config(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::from(2);
    }
    log_system_info();

    let context = match ServiceContext::from_config(&config) {
        Ok(context) => context,
        Err(e) => {
            error!("❌ Failed to start: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let (report, verification) = context.warm_and_verify().await;
    if !verification.is_clean() {
        error!(
            "❌ Run {} finished with {} unverified records",
            report.run_id,
            verification.errors()
        );
        return ExitCode::from(1);
    }

    info!(
        "✅ Run {} complete: {} warmed, {} failed, discovery {}",
        report.run_id,
        report.warmed,
        report.failed.len(),
        if report.discovery_completed { "complete" } else { "partial" }
    );
    ExitCode::SUCCESS
}
