use std::process::ExitStatus;
use thiserror::Error;

/// Failures talking to the release host.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The self-reported version banner did not have the expected shape.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("no version, runtime and date found in {0:?}")]
    NoMatch(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("corrupt zip archive: {0}")]
    CorruptZip(#[from] zip::result::ZipError),

    #[error("corrupt tar.gz archive: {0}")]
    CorruptTarGz(#[source] std::io::Error),

    #[error("no {0} binary found in archive")]
    NotFound(String),
}

impl ExtractError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExtractError::NotFound(_))
    }
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to materialize executable: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    ExitStatus { command: String, status: ExitStatus },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no runtime version in build info output")]
    NoBuildInfo,

    #[error("all probe strategies failed: {}", describe_failures(.0))]
    Exhausted(Vec<(&'static str, ProbeError)>),
}

fn describe_failures(failures: &[(&'static str, ProbeError)]) -> String {
    failures
        .iter()
        .map(|(strategy, err)| format!("{}: {}", strategy, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-release failure. Never fatal for a synchronization run.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no asset found matching {0}")]
    NoAsset(String),

    #[error("download failed: {0}")]
    Download(#[from] Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected 3 fields, found {fields}")]
    FieldCount { line: u64, fields: usize },
}
