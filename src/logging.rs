//! Console and size-rotated file logging.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Level for this crate when `RUST_LOG` is not set.
    pub level: String,
    /// Also log to stderr (interactive runs).
    pub console: bool,
    pub file: PathBuf,
    pub max_bytes: u64,
    pub backups: usize,
}

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("cloudsync.log")
}

/// Install the global subscriber. When the log file cannot be opened the
/// console layer is still installed and the failure is returned so the
/// caller can report it.
pub fn init(settings: &LogSettings) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cloudsync={}", settings.level)));

    let console = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
            .with_target(false)
            .compact()
    });

    let writer = SizeRotatingWriter::open(&settings.file, settings.max_bytes, settings.backups);
    let (file_layer, open_error) = match writer {
        Ok(writer) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string())),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    match open_error {
        Some(e) => Err(io::Error::new(
            e.kind(),
            format!("cannot open log file {}: {e}", settings.file.display()),
        )),
        None => Ok(()),
    }
}

struct WriterState {
    file: Option<File>,
    written: u64,
}

/// Appends to a log file and rotates it once it would grow beyond
/// `max_bytes`: `name` → `name.1` → `name.2` … up to `backups`, the oldest
/// backup is dropped.
#[derive(Clone)]
pub struct SizeRotatingWriter {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    state: Arc<Mutex<WriterState>>,
}

impl SizeRotatingWriter {
    pub fn open(path: &Path, max_bytes: u64, backups: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = open_append(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            max_bytes,
            backups,
            state: Arc::new(Mutex::new(WriterState {
                file: Some(file),
                written,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&self, state: &mut WriterState) -> io::Result<()> {
        state.file = None;

        let oldest = self.backup_path(self.backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        if self.backups > 0 {
            fs::rename(&self.path, self.backup_path(1))?;
        } else {
            fs::remove_file(&self.path)?;
        }

        state.file = Some(open_append(&self.path)?);
        state.written = 0;
        Ok(())
    }

    fn write_record(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.written > 0 && state.written + buf.len() as u64 > self.max_bytes {
            self.rotate(&mut state)?;
        }
        if state.file.is_none() {
            state.file = Some(open_append(&self.path)?);
            state.written = 0;
        }
        if let Some(file) = state.file.as_mut() {
            file.write_all(buf)?;
        }
        state.written += buf.len() as u64;
        Ok(buf.len())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Handle handed to the fmt layer for one event.
pub struct LogWriter {
    inner: SizeRotatingWriter,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_record(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.lock().file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SizeRotatingWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: self.clone(),
        }
    }
}
