//! L4S IDS entrypoint. The role (collector or detector) comes from the
//! config file or `L4S_IDS_MODE`; Ctrl+C drains the open window and stops.
//! The runtime is torn down within the shutdown grace period.

use l4s_ids::{
    collectors::CaptureSource,
    config::{CaptureSourceKind, IdsConfig},
    logging::StructuredLogger,
    pipeline::Pipeline,
};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("L4S_IDS_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let mut config = IdsConfig::load(&config_path)?;
    if let Ok(mode) = std::env::var("L4S_IDS_MODE") {
        config.mode = mode.parse()?;
    }

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(mode = ?config.mode, config = %config_path.display(), "L4S IDS starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let pipeline = match Pipeline::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e.into());
        }
    };

    let (stop_tx, stop_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    })?;

    let capture = config.capture.clone();
    let layout = config.capture_layout();
    let open_source = move || match capture.source {
        CaptureSourceKind::Tshark => CaptureSource::tshark(&capture.tshark_path, &capture.interface, layout),
        CaptureSourceKind::Stdin => Ok(CaptureSource::stdin()),
    };

    let summary = pipeline.run_blocking(open_source, stop_rx)?.into_result(config.mode)?;
    info!(windows = summary.windows_closed, "L4S IDS stopped");
    Ok(())
}
