//! Log output setup
//!
//! The logger is built from [`LoggingConfig`] and handed back to the caller;
//! [`init`] installs it as the `log` backend. `RUST_LOG` still overrides the
//! configured level.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use env_logger::{Builder, Env, Logger, Target, WriteStyle};
use log::LevelFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{AgentError, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Build a logger for `config`. `verbose` forces trace level.
pub fn build_logger(config: &LoggingConfig, verbose: bool) -> Result<Logger> {
    let level = if verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::from_str(config.level.trim())
            .map_err(|_| AgentError::Logging(format!("unknown log level {:?}", config.level)))?
    };

    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.parse_env(Env::new().filter("RUST_LOG"));

    match config.format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                let line = serde_json::json!({
                    "time": chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
                    "level": record.level().to_string(),
                    "message": record.args().to_string(),
                    "target": record.target(),
                    "file": record.file(),
                    "line": record.line(),
                });
                writeln!(buf, "{}", line)
            });
        }
        LogFormat::Pretty => {
            builder.format(|buf, record| {
                let style = buf.default_level_style(record.level());
                writeln!(
                    buf,
                    "{} | {style}{:<5}{style:#} | {} - {}",
                    chrono::Local::now().format(TIMESTAMP_FORMAT),
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }
    }

    match config.file_path() {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = RotatingFile::open(path, config.max_file_bytes, config.max_files)?;
            builder.target(Target::Pipe(Box::new(file)));
            builder.write_style(WriteStyle::Never);
        }
        None => {
            builder.target(Target::Stdout);
            if config.format == LogFormat::Json {
                builder.write_style(WriteStyle::Never);
            }
        }
    }

    Ok(builder.build())
}

/// Append-only log file that rolls over to `<file>.1` .. `<file>.N` once it
/// would grow past `max_bytes`. Rolling only happens between writes.
struct RotatingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    max_files: usize,
}

impl RotatingFile {
    fn open(path: PathBuf, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        let file = Self::append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            written,
            max_bytes,
            max_files,
        })
    }

    fn append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn rolled(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.max_files == 0 {
            self.file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        } else {
            let oldest = self.rolled(self.max_files);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..self.max_files).rev() {
                let from = self.rolled(n);
                if from.exists() {
                    fs::rename(&from, self.rolled(n + 1))?;
                }
            }
            fs::rename(&self.path, self.rolled(1))?;
            self.file = Self::append(&self.path)?;
        }

        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.max_bytes > 0 && self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Install the logger for the whole process
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let logger = build_logger(config, verbose)?;
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger)).map_err(|e| AgentError::Logging(e.to_string()))?;
    log::set_max_level(max_level);
    Ok(())
}
