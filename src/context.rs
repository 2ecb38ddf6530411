use super::{
    errors::SpawnError,
    handle::block_on_timed,
    result::SpawnResult,
};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;


/// Контекст прерываемой задачи.
///
/// `ThreadPool::abort` отменяет токен пула, и все блокирующие ожидания
/// через этот контекст сразу возвращаются.
#[derive(Clone)]
pub struct TaskContext {
    token: CancellationToken,
}

impl TaskContext {

    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    #[inline]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    #[inline]
    pub fn check(&self) -> SpawnResult<()> {
        if self.token.is_cancelled() {
            return Err(SpawnError::Cancelled);
        }
        Ok(())
    }

    /// Блокирует поток до `abort` пула
    pub fn wait_aborted(&self) {
        futures::executor::block_on(self.token.cancelled());
    }

    /// Прерываемый sleep: `Err(Cancelled)` если пул был прерван раньше
    pub fn sleep(&self, dur: Duration) -> SpawnResult<()> {
        self.check()?;
        let token = self.token.clone();
        block_on_timed(async move {
            tokio::select! {
                _ = token.cancelled() => Err(SpawnError::Cancelled),
                _ = tokio::time::sleep(dur) => Ok(()),
            }
        })?
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
