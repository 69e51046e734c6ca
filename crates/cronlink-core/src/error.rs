use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectorError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            ConnectorError::Config(_) => "CONFIG_ERROR",
            ConnectorError::Registry(_) => "REGISTRY_ERROR",
            ConnectorError::Timeout { .. } => "TIMEOUT",
            ConnectorError::Schedule(_) => "SCHEDULE_ERROR",
            ConnectorError::Io(_) => "IO_ERROR",
        }
    }
}

/// Failure while listing namespaces or functions from the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("registry returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode registry response: {0}")]
    Decode(String),
}

/// A cron expression the scheduler cannot run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("empty schedule")]
    Empty,

    #[error("expected 5 fields, found {found}")]
    FieldCount { found: usize },

    #[error("unsupported descriptor {0}")]
    Descriptor(String),

    #[error("{expression}: {reason}")]
    Parse { expression: String, reason: String },
}

/// Why a registry descriptor was not turned into a schedule candidate.
///
/// These are expected and frequent; callers log and move on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Ineligible {
    #[error("{name} has no annotations")]
    NoAnnotations { name: String },

    #[error("{name} has wrong topic: {topic:?}")]
    WrongTopic { name: String, topic: Option<String> },

    #[error("{name} has wrong cron schedule {schedule:?}: {source}")]
    InvalidSchedule {
        name: String,
        schedule: String,
        #[source]
        source: ScheduleError,
    },

    #[error("{name} has invalid async value: {value}")]
    InvalidAsync { name: String, value: String },
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
