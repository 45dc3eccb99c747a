/// Failure of the network collaborator. Always fatal to the loop.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network layer disconnected")]
    Disconnected,
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("network error: {0}")]
    Other(String),
}

/// Errors surfaced by the tick scheduler to the process lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("network poll failed at tick {tick}: {source}")]
    Network {
        tick: u64,
        #[source]
        source: NetworkError,
    },
    #[error("scheduler is stopped")]
    Stopped,
}

/// Errors loading or validating a server config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
