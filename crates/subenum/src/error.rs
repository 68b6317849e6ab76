use derive_more::From;
use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    // -- Sources
    SourceUnavailable { module: String, reason: String },
    SourceTimeout(String),
    SourceParseError { module: String, reason: String },
    SourcePanicked(String),

    // -- Registry
    RegistryLoad(String),
    NoEnginesSelected,
    NoUsableSources,

    // -- Probing
    ResolutionFailure { host: String, reason: String },
    PortProbeFailure { host: String, port: u16 },

    // -- Config
    ConfigMissing(PathBuf),
    ConfigLoad { path: PathBuf, reason: String },
    InvalidPort(String),
    InvalidDomain(String),
    CliUsage(String),
    Logging(String),

    // -- Output
    OutputWrite { path: PathBuf, reason: String },

    #[from]
    SystemTime(std::time::SystemTimeError),

    #[from]
    File(std::io::Error),

    #[from]
    Reqwest(reqwest::Error),

    #[from]
    Json(serde_json::Error),

    #[from]
    TimeFormat(time::error::Format),

    #[from]
    Fmt(std::fmt::Error),
}

impl Error {
    /// Maps a transport error raised while talking to a source into the
    /// source taxonomy, so raw `reqwest` errors never leave a module.
    pub fn from_source(module: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::SourceTimeout(module.to_string())
        } else if err.is_decode() {
            Error::SourceParseError {
                module: module.to_string(),
                reason: err.to_string(),
            }
        } else {
            Error::SourceUnavailable {
                module: module.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
