use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

/// Environment variable holding `tracing` filter directives, e.g.
/// `pargamd=debug,tower_http=warn`.
pub const LOG_ENV: &str = "PARGAMD_LOG";

pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Directives from `PARGAMD_LOG` refine the level chosen on the command line.
pub fn build_filter(default: LevelFilter, directives: Option<&str>) -> Result<EnvFilter> {
    let builder = EnvFilter::builder().with_default_directive(default.into());
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => builder.parse(d).map_err(|e| {
            CliError::Argument(format!("Invalid {} value '{}': {}", LOG_ENV, d, e))
        }),
        None => Ok(builder.parse_lossy("")),
    }
}

/// Installs the global subscriber: compact stderr output plus an optional
/// plain-text file. `--quiet` ignores `PARGAMD_LOG`.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let directives = if quiet {
        None
    } else {
        std::env::var(LOG_ENV).ok()
    };
    let filter = build_filter(level_for(verbosity, quiet), directives.as_deref())?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(&path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::{debug, info, trace};

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(7, false), LevelFilter::TRACE);
        assert_eq!(level_for(3, true), LevelFilter::ERROR);
    }

    #[test]
    fn blank_directives_fall_back_to_the_cli_level() {
        let filter = build_filter(LevelFilter::INFO, Some("   ")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn malformed_directives_are_rejected() {
        let err = build_filter(LevelFilter::WARN, Some("pargamd=loud")).unwrap_err();
        assert!(matches!(err, CliError::Argument(msg) if msg.contains(LOG_ENV)));
    }

    #[test]
    #[serial]
    fn directives_select_what_reaches_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("generate.log");
        let filter = build_filter(LevelFilter::WARN, Some("debug")).unwrap();
        let layer = fmt::layer()
            .with_writer(Mutex::new(File::create(&log_path).unwrap()))
            .with_ansi(false);
        let subscriber = tracing_subscriber::registry().with(filter).with(layer);

        tracing::subscriber::with_default(subscriber, || {
            info!("Rendered west.cfg");
            debug!("Rendered runseg.sh");
            trace!("not recorded");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Rendered west.cfg"));
        assert!(content.contains("DEBUG"));
        assert!(!content.contains("not recorded"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_an_io_error() {
        if cfg!(unix) {
            let result = setup_logging(0, true, Some(PathBuf::from("/")));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
