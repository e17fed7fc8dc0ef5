use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The manager queue needs one slot reserved for worker feedback plus one for intake.
    #[error("`queue_capacity` must be at least 2, got {0}")]
    QueueCapacityTooSmall(usize),
    /// A pipeline without managers cannot hand items to workers.
    #[error("`managers` cannot be zero")]
    ManagersZero,
    /// A pipeline without workers never advances items.
    #[error("`workers` cannot be zero")]
    WorkersZero,
    /// Producers pick rows in `[0, size)`, which is empty when the size is zero.
    #[error("`source.size` cannot be zero")]
    SourceSizeZero,
    /// The source path is empty.
    #[error("`source.path` cannot be empty")]
    SourcePathEmpty,
    /// Remote producers are configured but no remote service is.
    #[error("`remote` must be set when `remote_producers` is greater than zero")]
    MissingRemoteConfig,
    /// The remote host is empty.
    #[error("`remote.host` cannot be empty")]
    RemoteHostEmpty,
    /// Generic invalid field value.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}
