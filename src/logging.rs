//! Run-log setup.
//!
//! Levels: `--debug` selects DEBUG, an enabled logger INFO, otherwise only
//! warnings and errors reach stderr. With a log-file path the output goes
//! to the file without ANSI colors.

use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Install the global subscriber for this run.
///
/// `log_file`: `None` disables the run log (warnings still go to stderr),
/// `Some("")` logs to stderr, `Some(path)` logs to the file at `path`.
pub fn init(debug: bool, log_file: Option<&str>) {
    let level = if debug {
        Level::DEBUG
    } else if log_file.is_some() {
        Level::INFO
    } else {
        Level::WARN
    };

    let file = log_file
        .filter(|path| !path.is_empty())
        .and_then(|path| match std::fs::File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: failed to open log file {path}: {e}");
                None
            }
        });

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);
    let result = match file {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(BoxMakeWriter::new(file))
            .try_init(),
        None => builder.with_writer(BoxMakeWriter::new(std::io::stderr)).try_init(),
    };
    if result.is_err() {
        eprintln!("Warning: log subscriber already installed");
    }
}
