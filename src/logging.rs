use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

use crate::platform::{NativePlatform, Platform};

/// Diagnostic log sink: appends to the log file and, when verbose, mirrors to stderr.
/// Operator-facing output never goes through here.
#[derive(Clone)]
pub(crate) struct DiagnosticMakeWriter {
    pub file: Option<Arc<Mutex<File>>>,
    pub mirror_stderr: bool,
}

impl<'a> MakeWriter<'a> for DiagnosticMakeWriter {
    type Writer = DiagnosticWriter;

    fn make_writer(&'a self) -> Self::Writer {
        DiagnosticWriter {
            file: self.file.clone(),
            mirror_stderr: self.mirror_stderr,
        }
    }
}

pub(crate) struct DiagnosticWriter {
    file: Option<Arc<Mutex<File>>>,
    mirror_stderr: bool,
}

impl std::io::Write for DiagnosticWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            file.write_all(buf)?;
        }
        if self.mirror_stderr {
            std::io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file {
            file.lock().unwrap_or_else(|e| e.into_inner()).flush()?;
        }
        if self.mirror_stderr {
            std::io::stderr().flush()?;
        }
        Ok(())
    }
}

fn open_log_file(data_dir: &Path) -> Result<File> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;
    NativePlatform::restrict_dir_permissions(&log_dir);
    let path = log_dir.join("blogpanel.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    NativePlatform::restrict_file_permissions(&path);
    Ok(file)
}

/// Install the global subscriber. Without a writable log file, diagnostics
/// fall back to stderr.
pub(crate) fn init(data_dir: &Path, verbose: bool) {
    let file = match open_log_file(data_dir) {
        Ok(file) => Some(Arc::new(Mutex::new(file))),
        Err(e) => {
            eprintln!("blogpanel: diagnostics go to stderr ({:#})", e);
            None
        }
    };
    let make_writer = DiagnosticMakeWriter {
        mirror_stderr: verbose || file.is_none(),
        file,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_ansi(false)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}
