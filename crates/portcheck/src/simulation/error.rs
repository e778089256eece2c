use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestbenchError {
    #[error(transparent)]
    Coverage(#[from] crate::CoverageError),
    #[error(transparent)]
    Verdict(#[from] crate::VerdictError),
    #[error("write to '{signal}' inside the read-only region at t={time}")]
    ReadOnlyWrite { signal: String, time: u64 },
    #[error("simulation passed the time limit of {limit} (t={time})")]
    Timeout { limit: u64, time: u64 },
    #[error("no scheduled events left at t={0}; is the clock running?")]
    Stalled(u64),
    #[error("failed to spawn task: {0}")]
    Spawn(String),
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
