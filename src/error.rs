use thiserror::Error;
use std::path::PathBuf;

/// Error type for all possible failures in the library.
#[derive(Error, Debug)]
pub enum WebDriverError {
    #[error("Invalid value '{value}' for configuration key '{key}': {reason}")]
    Config {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Could not load configuration: {0}")]
    ConfigSource(#[from] figment::Error),

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to execute command '{command}': {source}")]
    CommandExecutionError {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' output could not be parsed: {source}")]
    CommandOutputParsingError {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Browser not found. Please specify the path manually or ensure it's in a standard location.")]
    BrowserNotFound,

    #[error("Failed to parse browser version from output: '{output}'")]
    BrowserVersionParsingError {
        output: String,
    },

    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Failed to parse JSON response from '{url}': {source}")]
    JsonParseError {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{driver} {version} for {os}{arch} not found in {url}")]
    DriverNotFound {
        driver: String,
        version: String,
        os: String,
        arch: String,
        url: String,
    },

    #[error("MicrosoftWebDriver.exe should be pre-installed at '{path}' (run in an elevated prompt: dism /Online /Add-Capability /CapabilityName:Microsoft.WebDriver~~~~0.0.1.0)")]
    PreinstalledDriverMissing {
        path: PathBuf,
    },

    #[error("There was an error managing {driver} {version} for {os}{arch} (consulting {url}): {source}")]
    Resolution {
        driver: String,
        version: String,
        os: String,
        arch: String,
        url: String,
        #[source]
        source: Box<WebDriverError>,
    },

    #[error("I/O error accessing path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decompress zip file to '{path}': {source}")]
    ZipError {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to extract {archive_type} archive '{path}': {source}")]
    ArchiveError {
        archive_type: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Driver executable '{name}' not found in the downloaded archive at '{path}'")]
    DriverExecutableNotFound {
        name: String,
        path: PathBuf,
    },

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Unsupported browser: {0}")]
    UnsupportedBrowser(String),
}

impl WebDriverError {
    /// Whether the resolver may retry the whole pass with forced cache and mirror.
    ///
    /// Configuration problems and a missing pre-installed driver need the user to fix the
    /// environment, so another attempt cannot succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            WebDriverError::Config { .. }
                | WebDriverError::ConfigSource(_)
                | WebDriverError::InvalidUrl { .. }
                | WebDriverError::PreinstalledDriverMissing { .. }
                | WebDriverError::UnsupportedBrowser(_)
                | WebDriverError::Resolution { .. }
        )
    }

    pub(crate) fn config(key: &str, value: &str, reason: impl Into<String>) -> Self {
        WebDriverError::Config {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WebDriverError::IoError {
            path: path.into(),
            source,
        }
    }
}
