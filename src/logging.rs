use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

const LOG_SUBPATH: &str = ".local/k4a/debug.log";

/// Owns the debug log sink for the lifetime of the process.
pub struct LogSession {
    file: Option<SessionWriter>,
    path: Option<PathBuf>,
}

impl LogSession {
    /// Without `debug` events are filtered but written nowhere.
    pub fn init(debug: bool, level_filter: &str) -> Result<Self> {
        let filter = EnvFilter::try_new(level_filter)
            .or_else(|_| EnvFilter::try_new("info"))
            .context("failed to initialize tracing filter")?;

        if !debug {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .compact()
                .with_writer(io::sink)
                .try_init();
            return Ok(Self {
                file: None,
                path: None,
            });
        }

        let path = default_log_path().context("HOME is not set, cannot place debug log")?;
        let writer = SessionWriter::open(&path)?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .compact()
            .with_writer(writer.clone())
            .try_init();

        info!("debug session started, pid {}", std::process::id());
        Ok(Self {
            file: Some(writer),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn shutdown(self) -> Result<()> {
        let Some(writer) = self.file else {
            return Ok(());
        };
        info!("debug session ended");
        writer.sync().context("failed to flush debug log")
    }
}

fn default_log_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(LOG_SUBPATH))
}

#[derive(Clone)]
struct SessionWriter {
    file: Arc<Mutex<File>>,
}

impl SessionWriter {
    fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open debug log {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    fn sync(&self) -> io::Result<()> {
        let mut file = self.lock()?;
        file.flush()?;
        file.sync_all()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("debug log lock poisoned"))
    }
}

impl Write for SessionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl<'a> MakeWriter<'a> for SessionWriter {
    type Writer = SessionWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::SessionWriter;
    use std::io::Write;

    #[test]
    fn writer_appends_across_clones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("debug.log");
        let mut first = SessionWriter::open(&path).unwrap();
        let mut second = first.clone();

        first.write_all(b"one\n").unwrap();
        second.write_all(b"two\n").unwrap();
        first.sync().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn reopening_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        SessionWriter::open(&path).unwrap().write_all(b"first\n").unwrap();
        SessionWriter::open(&path).unwrap().write_all(b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
