use super::{
    affinity,
    context::TaskContext,
    errors::{PoolError, SpawnError},
    handle::{
        block_on_timed,
        panic_message,
        JoinHandle,
        Task,
    },
    model::{
        PoolMetrics,
        PoolState,
    },
    queue::JobQueue,
    result::SpawnResult,
};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    thread,
};
use crossbeam::utils::CachePadded;
use log::{debug, error, info, warn};
use tokio::{
    sync::oneshot,
    time::Duration,
};
use tokio_util::sync::CancellationToken;


/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    /// 0 означает "по числу ядер"
    pub num_threads: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            thread_name_prefix: "pool-worker".to_string(),
            stack_size: None,
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        Self::default()
    }

    pub fn io_bound() -> Self {
        Self {
            num_threads: num_cpus::get() * 2, // потоки часто спят в syscall
            ..Default::default()
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }
}


/// Состояние, разделяемое пулом, воркерами и монитором
struct Shared {
    // мьютекс очереди одновременно охраняет условие ожидания `signal`
    queue: JobQueue<Task>,
    signal: Condvar,
    shutdown: AtomicBool,
    abort_token: CancellationToken,
    size: usize,
    idle_workers: CachePadded<AtomicUsize>,
    active_tasks: CachePadded<AtomicUsize>,
    total_submitted: AtomicUsize,
    completed_tasks: Arc<AtomicUsize>,
    failed_tasks: Arc<AtomicUsize>,
}

impl Shared {
    #[inline(always)]
    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn push_task(&self, task: Task) {
        self.total_submitted.fetch_add(1, Ordering::Relaxed);
        self.queue.push(task);
        self.signal.notify_one();
    }

    fn set_shutdown(&self, value: bool) {
        // флаг меняется под тем же мьютексом, что проверяет wait_while,
        // иначе воркер может пропустить пробуждение
        let _queue = self.queue.lock();
        self.shutdown.store(value, Ordering::Release);
    }

    fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            size: self.size,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            idle_workers: self.idle_workers.load(Ordering::Relaxed),
            queued_tasks: self.queue.len(),
            total_submitted: self.total_submitted.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
        }
    }
}


struct Worker {
    id: usize,
    shared: Arc<Shared>,
    pin: bool,
}

impl Worker {
    /// Idle -> Dequeuing -> Executing -> Idle ... -> Terminated
    ///
    /// `idle_workers` считает живые потоки, не выполняющие задачу.
    fn run(self) {
        if self.pin {
            affinity::pin_current_thread(self.id);
        }

        let shared = &*self.shared;
        shared.idle_workers.fetch_add(1, Ordering::AcqRel);
        debug!("worker {} started", self.id);

        loop {
            let task = {
                let queue = shared.queue.lock();
                let mut queue = shared
                    .signal
                    .wait_while(queue, |q| q.is_empty() && !shared.is_shutdown())
                    .unwrap_or_else(PoisonError::into_inner);

                // при остановке очередь не разбирается, оставшиеся задачи брошены
                if shared.is_shutdown() {
                    break;
                }

                match queue.pop_front() {
                    Some(task) => {
                        shared.idle_workers.fetch_sub(1, Ordering::AcqRel);
                        shared.active_tasks.fetch_add(1, Ordering::AcqRel);
                        task
                    }
                    None => continue,
                }
            };

            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!("worker {}: task panicked outside of its result channel", self.id);
            }

            shared.active_tasks.fetch_sub(1, Ordering::AcqRel);
            shared.idle_workers.fetch_add(1, Ordering::AcqRel);
        }

        shared.idle_workers.fetch_sub(1, Ordering::AcqRel);
        debug!("worker {} terminated", self.id);
    }
}


struct Lifecycle {
    state: PoolState,
    workers: Vec<thread::JoinHandle<()>>,
}


/// Пул с фиксированным числом OS потоков и общей FIFO очередью.
///
/// Двухфазный запуск: конструктор только резервирует слоты, потоки
/// стартуют в `init`. Задачи, отправленные до `init`, копятся в очереди.
/// Задачи, оставшиеся в очереди на момент `shutdown`, не выполняются;
/// их handles получают `ChannelClosed` только когда пул будет уничтожен.
pub struct ThreadPool {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    config: Config,
}

impl ThreadPool {
    pub fn new(num_threads: usize) -> Self {
        let config = Config {
            num_threads,
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(mut config: Config) -> Self {
        if config.num_threads == 0 {
            config.num_threads = num_cpus::get();
        }

        let shared = Arc::new(Shared {
            queue: JobQueue::new(),
            signal: Condvar::new(),
            shutdown: AtomicBool::new(false),
            abort_token: CancellationToken::new(),
            size: config.num_threads,
            idle_workers: CachePadded::new(AtomicUsize::new(0)),
            active_tasks: CachePadded::new(AtomicUsize::new(0)),
            total_submitted: AtomicUsize::new(0),
            completed_tasks: Arc::new(AtomicUsize::new(0)),
            failed_tasks: Arc::new(AtomicUsize::new(0)),
        });

        let lifecycle = Mutex::new(Lifecycle {
            state: PoolState::Created,
            workers: Vec::with_capacity(config.num_threads),
        });

        ThreadPool {
            shared,
            lifecycle,
            config,
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Запускает `size()` воркеров.
    ///
    /// `use_affinity` распределяет воркеры по ядрам round-robin, ошибки
    /// привязки только логируются. Повторный вызов возвращает
    /// `AlreadyInitialized`, вызов после остановки `Terminated`.
    pub fn init(&self, use_affinity: bool) -> Result<(), PoolError> {
        let mut lifecycle = self.lifecycle();
        match lifecycle.state {
            PoolState::Created => {}
            PoolState::Running => {
                warn!("init called on a running thread pool, ignoring");
                return Err(PoolError::AlreadyInitialized);
            }
            PoolState::Stopped => return Err(PoolError::Terminated),
        }

        // shutdown до init только выставляет флаг, сбрасываем его
        self.shared.set_shutdown(false);

        for id in 0..self.shared.size {
            let worker = Worker {
                id,
                shared: self.shared.clone(),
                pin: use_affinity,
            };

            let mut builder = thread::Builder::new()
                .name(format!("{}-{}", self.config.thread_name_prefix, id));
            if let Some(stack_size) = self.config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            match builder.spawn(move || worker.run()) {
                Ok(handle) => lifecycle.workers.push(handle),
                Err(e) => {
                    error!("failed to spawn worker {}: {}", id, e);
                    self.shared.set_shutdown(true);
                    self.shared.signal.notify_all();
                    lifecycle.state = PoolState::Stopped;
                    let started = std::mem::take(&mut lifecycle.workers);
                    // задачи запущенных воркеров могут обращаться к пулу
                    drop(lifecycle);
                    for handle in started {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        lifecycle.state = PoolState::Running;
        info!(
            "thread pool started: {} workers, affinity: {}, {} tasks queued",
            self.shared.size,
            use_affinity,
            self.shared.queue.len(),
        );
        Ok(())
    }

    /// Останавливает воркеры после текущих задач и ждёт их завершения
    pub fn shutdown(&self) {
        self.stop(false);
    }

    /// Как `shutdown`, но дополнительно отменяет токен, переданный в
    /// `submit_cancellable` задачи, чтобы заблокированные в `TaskContext`
    /// воркеры не держали join. Обычные задачи не прерываются.
    pub fn abort(&self) {
        self.stop(true);
    }

    fn stop(&self, abort: bool) {
        let mut lifecycle = self.lifecycle();
        self.shared.set_shutdown(true);
        self.shared.signal.notify_all();

        match lifecycle.state {
            PoolState::Running => {}
            PoolState::Created => {
                debug!(
                    "shutdown before init: {} tasks stay queued",
                    self.shared.queue.len()
                );
                return;
            }
            PoolState::Stopped => return,
        }

        if abort {
            self.shared.abort_token.cancel();
        }

        lifecycle.state = PoolState::Stopped;
        let workers = std::mem::take(&mut lifecycle.workers);
        drop(lifecycle);

        let current = thread::current().id();
        for handle in workers {
            // пул уничтожается из собственной задачи: себя не ждём
            if handle.thread().id() == current {
                warn!("shutdown called from a worker thread, detaching it");
                continue;
            }
            if handle.join().is_err() {
                error!("worker thread panicked during shutdown");
            }
        }

        info!(
            "thread pool stopped (abort: {}), {} queued tasks abandoned",
            abort,
            self.shared.queue.len(),
        );
    }

    /// Ставит задачу в очередь и будит один воркер.
    ///
    /// Аргументы связываются захватом в замыкание; выходные параметры
    /// передаются через разделяемое владение (`Arc<Mutex<_>>`). Паника в
    /// задаче попадает в handle как `SpawnError::Panic`.
    pub fn submit<T, F>(&self, f: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.spawn_task(move || Ok(f()))
    }

    /// Задача получает `TaskContext`, который прерывается `abort()`
    pub fn submit_cancellable<T, F>(&self, f: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&TaskContext) -> SpawnResult<T> + Send + 'static,
    {
        let ctx = TaskContext::new(self.shared.abort_token.child_token());
        self.spawn_task(move || f(&ctx))
    }

    fn spawn_task<T, F>(&self, body: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> SpawnResult<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<SpawnResult<T>>();
        let pool_completed = self.shared.completed_tasks.clone();
        let pool_failed = self.shared.failed_tasks.clone();

        let task: Task = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(body))
                .unwrap_or_else(|payload| Err(SpawnError::Panic(panic_message(&*payload))));

            if let Err(SpawnError::Panic(msg)) = &result {
                error!("task panicked: {}", msg);
            }
            let ok = result.is_ok();

            // handle получает результат раньше, чем обновятся счётчики
            let _ = tx.send(result);

            if ok {
                pool_completed.fetch_add(1, Ordering::Relaxed);
            } else {
                pool_failed.fetch_add(1, Ordering::Relaxed);
            }
        });

        self.shared.push_task(task);

        JoinHandle::new(rx)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.shared.size
    }

    #[inline]
    pub fn queue_size(&self) -> usize {
        self.shared.queue.len()
    }

    #[inline]
    pub fn num_available(&self) -> usize {
        self.shared.idle_workers.load(Ordering::Acquire)
    }

    #[inline]
    pub fn num_running(&self) -> usize {
        self.shared.active_tasks.load(Ordering::Acquire)
    }

    pub fn state(&self) -> PoolState {
        self.lifecycle().state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.metrics()
    }

    /// Мониторинг метрик с callback в отдельном потоке.
    /// Останавливается через `stop_monitoring` или сам, когда пул уничтожен.
    pub fn start_monitoring<F>(&self, interval: Duration, callback: F) -> CancellationToken
    where
        F: Fn(PoolMetrics) + Send + 'static,
    {
        let shared = Arc::downgrade(&self.shared);
        let token = CancellationToken::new();
        let token_clone = token.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-monitor", self.config.thread_name_prefix))
            .spawn(move || {
                let monitor = async {
                    loop {
                        tokio::select! {
                            _ = tokio::time::sleep(interval) => match shared.upgrade() {
                                Some(shared) => callback(shared.metrics()),
                                None => break,
                            },
                            _ = token_clone.cancelled() => break,
                        }
                    }
                };
                if let Err(e) = block_on_timed(monitor) {
                    error!("monitor stopped: {}", e);
                }
            });

        if let Err(e) = spawned {
            error!("failed to spawn monitor thread: {}", e);
            token.cancel();
        }

        token
    }

    pub fn stop_monitoring(token: CancellationToken) {
        token.cancel();
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop(false);
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("size", &self.size())
            .field("state", &self.state())
            .field("queued_tasks", &self.queue_size())
            .field("available", &self.num_available())
            .field("running", &self.num_running())
            .finish()
    }
}
