use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaflowError {
    #[error("processor not found: {0}")]
    ProcessorNotFound(String),

    #[error("duplicate processor: {0}")]
    DuplicateProcessor(String),

    #[error("missing processors: {0:?}. These processors were expected but not registered.")]
    MissingProcessors(Vec<String>),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to load config")]
    ConfigLoad(#[source] Box<figment::Error>),

    #[error("scheduler is already running")]
    AlreadyStarted,

    #[error("dispatch receiver was lost; the worker pool cannot be restarted")]
    PoolLost,
}

impl From<figment::Error> for MediaflowError {
    fn from(err: figment::Error) -> Self {
        MediaflowError::ConfigLoad(Box::new(err))
    }
}
