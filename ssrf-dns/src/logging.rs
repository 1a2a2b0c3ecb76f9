use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Opens `path` for appending, creating it when missing.
fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

/// Install the global collector, configured based on RUST_LOG env var.
///
/// With `log_file` everything goes to that file (appended), otherwise stdout.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = open_log(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(env_filter()).init();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_open_log_unwritable_path() {
        let err = open_log(Path::new("/nonexistent/dir/x.log")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dir/x.log"));
    }

    #[test]
    fn test_open_log_appends() {
        let mut tmp_file = NamedTempFile::new().expect("Failed to create tempfile");
        tmp_file.write_all(b"first\n").unwrap();

        let mut file = open_log(tmp_file.path()).unwrap();
        file.write_all(b"second\n").unwrap();
        drop(file);

        assert_eq!(
            fs::read_to_string(tmp_file.path()).unwrap(),
            "first\nsecond\n"
        );
    }

    #[test]
    fn test_open_log_creates_missing_file() {
        let dir = tempfile::tempdir().expect("Failed to create tempdir");
        let path = dir.path().join("ssrf-dns.log");

        open_log(&path).unwrap();
        assert!(path.exists());
    }
}
