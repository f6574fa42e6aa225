use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

const DEFAULT_LOG_FILTER: &str = "warn,gordon=info";
const DEFAULT_LOG_FILE_PATH: &str = "logs/gordon.log";
const DEFAULT_LOG_FILE_NAME: &str = "gordon.log";

type InitResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Keeps the file writer alive. Buffered lines are flushed when this is dropped.
#[must_use]
pub struct LogGuard {
    _file_writer: Option<WorkerGuard>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogOutput {
    Stderr,
    File,
    Both,
}

impl LogOutput {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Stderr => "stderr",
            Self::File => "file",
            Self::Both => "both",
        }
    }
}

/// Where and how log lines go, read from `LOG_FORMAT`, `LOG_OUTPUT` and `LOG_FILE_PATH`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LogSettings {
    format: LogFormat,
    output: LogOutput,
    file_path: PathBuf,
}

impl LogSettings {
    fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Self {
        Self {
            format: parse_log_format(get_var("LOG_FORMAT").as_deref()),
            output: parse_log_output(get_var("LOG_OUTPUT").as_deref()),
            file_path: parse_log_file_path(get_var("LOG_FILE_PATH").as_deref()),
        }
    }
}

fn parse_log_format(raw: Option<&str>) -> LogFormat {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

fn parse_log_output(raw: Option<&str>) -> LogOutput {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("file") => LogOutput::File,
        Some("both") => LogOutput::Both,
        _ => LogOutput::Stderr,
    }
}

fn parse_log_file_path(raw: Option<&str>) -> PathBuf {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE_PATH))
}

fn build_file_writer(path: &Path) -> std::io::Result<(non_blocking::NonBlocking, WorkerGuard)> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| std::ffi::OsStr::new(DEFAULT_LOG_FILE_NAME));

    fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

fn env_filter_from_env() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_with_writer(format: LogFormat, writer: BoxMakeWriter) -> InitResult {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(env_filter_from_env())
            .with_writer(writer)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter_from_env())
            .with_writer(writer)
            .try_init(),
    }
}

fn init_file_output(settings: &LogSettings) -> (InitResult, Option<WorkerGuard>) {
    let include_stderr = settings.output == LogOutput::Both;

    match build_file_writer(&settings.file_path) {
        Ok((file_writer, guard)) => {
            let writer = if include_stderr {
                BoxMakeWriter::new(std::io::stderr.and(file_writer))
            } else {
                BoxMakeWriter::new(file_writer)
            };

            (init_with_writer(settings.format, writer), Some(guard))
        }
        Err(err) => {
            let fallback = if include_stderr {
                "using stderr only"
            } else {
                "using stderr instead"
            };
            eprintln!(
                "gordon: failed to initialize LOG_OUTPUT={} at '{}': {}; {}",
                settings.output.as_str(),
                settings.file_path.display(),
                err,
                fallback
            );
            (
                init_with_writer(settings.format, BoxMakeWriter::new(std::io::stderr)),
                None,
            )
        }
    }
}

/// Installs the global subscriber. Logs never go to stdout, which belongs to the chat.
pub fn init() -> LogGuard {
    let settings = LogSettings::from_env_with(|key| env::var(key).ok());

    let (init_result, guard) = match settings.output {
        LogOutput::Stderr => (
            init_with_writer(settings.format, BoxMakeWriter::new(std::io::stderr)),
            None,
        ),
        LogOutput::File | LogOutput::Both => init_file_output(&settings),
    };

    if let Err(err) = init_result {
        eprintln!("gordon: logging already initialized: {err}");
    }
    LogGuard {
        _file_writer: guard,
    }
}
