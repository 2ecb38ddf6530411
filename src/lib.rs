//! Пул потоков фиксированного размера с общей FIFO очередью задач
//!
//! # Features
//! - Двухфазный запуск: `new` -> `init`, задачи копятся в очереди до старта
//! - Типизированные handles с блокирующим `get`, `get_timeout` и `.await`
//! - Паника в задаче не убивает воркер и доставляется в handle
//! - `abort` прерывает задачи, ожидающие через `TaskContext`
//! - Счётчики утилизации и мониторинг
//! - Опциональная привязка воркеров к ядрам

pub mod affinity;
pub mod context;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;
pub mod queue;
pub mod result;

pub use context::TaskContext;
pub use errors::{PoolError, SpawnError};
pub use handle::JoinHandle;
pub use model::{PoolMetrics, PoolState};
pub use pool::{Config, ThreadPool};
pub use queue::JobQueue;
pub use result::SpawnResult;
