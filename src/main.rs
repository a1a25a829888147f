//! gaze-shim monitor - runs the eye gaze shim without a host runtime
//!
//! Wraps a mock tracked device, activates it against an in-process host and
//! logs the published gaze direction until Ctrl-C. Useful for checking that
//! an eye tracker feeder reaches the shim and produces sane vectors.
//!
//! Usage:
//! - `gaze-shim` (built-in defaults, UDP 0.0.0.0:9020)
//! - `gaze-shim <path>` or `gaze-shim --config <path>` (TOML config)

use crossbeam_channel::{RecvTimeoutError, bounded};
use gaze_shim::core::types::DeviceIndex;
use gaze_shim::mock::{MockDevice, RecordingHost};
use gaze_shim::{Error, Result, ShimConfig, ShimOutcome, TrackedDevice, create_shim};
use std::env;
use std::sync::Arc;
use std::time::Duration;

/// How often the latest gaze sample is logged
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Parse config path from command line arguments.
///
/// Supports `gaze-shim <path>`, `gaze-shim --config <path>` and
/// `gaze-shim -c <path>`. Returns `None` when no path is given.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn main() -> Result<()> {
    let config = match parse_config_path() {
        Some(path) => ShimConfig::from_file(&path)?,
        None => ShimConfig::default(),
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("gaze-shim v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!(
        "Listening for {} on {}",
        config.listener.gaze_address,
        config.listener.bind_address
    );

    let host = RecordingHost::new();
    let ShimOutcome::Shimmed(mut shim) = create_shim(MockDevice::new(), Arc::new(host.clone()), config)
    else {
        return Err(Error::Other("Host does not support eye gaze".to_string()));
    };

    let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        let _ = shutdown_tx.try_send(());
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    shim.activate(DeviceIndex(0))?;

    let mut last_count = 0;
    loop {
        match shutdown_rx.recv_timeout(REPORT_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let count = host.update_count();
        if count == last_count {
            log::debug!("No gaze samples in the last {:?}", REPORT_INTERVAL);
            continue;
        }

        let gaze = shim.latest_gaze();
        let [x, y, z] = gaze.gaze_target;
        log::info!(
            "gaze ({:+.3}, {:+.3}, {:+.3}) valid={} [{} samples/s]",
            x,
            y,
            z,
            gaze.valid,
            count - last_count
        );
        last_count = count;
    }

    shim.deactivate();
    log::info!("gaze-shim stopped");
    Ok(())
}
