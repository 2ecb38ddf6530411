use thiserror::Error;

/// Ошибка выполнения отдельной задачи, доставляется через `JoinHandle`
#[derive(Error, Debug, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub enum SpawnError {
    #[error("task panicked: {0}")]
    Panic(String),
    #[error("task was dropped before it produced a result")]
    ChannelClosed,
    #[error("timed out waiting for task result")]
    Timeout,
    #[error("task observed pool abort")]
    Cancelled,
    #[error("failed to build timer runtime: {0}")]
    Runtime(String),
}

/// Ошибки жизненного цикла пула
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("thread pool is already initialized")]
    AlreadyInitialized,
    #[error("thread pool has been shut down")]
    Terminated,
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
