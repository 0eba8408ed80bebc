use crate::common::Result;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;

/// Installs the global fmt subscriber. Development mode logs at debug level
/// with source locations; `file` appends plain-text output there instead of stderr.
pub fn setup_logging(dev_mode: bool, file: Option<&Path>) -> Result<()> {
    let level = if dev_mode { Level::DEBUG } else { Level::INFO };

    match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let log_file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_file(dev_mode)
                .with_line_number(dev_mode)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_file(dev_mode)
                .with_line_number(dev_mode)
                .with_thread_ids(dev_mode)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
