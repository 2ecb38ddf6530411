use super::{
    errors::SpawnError,
    result::SpawnResult,
};
use std::{
    any::Any,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::{
    runtime::Builder,
    sync::oneshot::{self, error::TryRecvError},
    time::Duration,
};


/// Стёртая по типу задача: все аргументы уже захвачены, результат уходит в канал
pub type Task = Box<dyn FnOnce() + Send + 'static>;


/// Handle на результат задачи
///
/// Блокирующие методы (`get`, `get_timeout`) предназначены для обычных потоков.
/// Внутри async контекста handle нужно `.await`-ить.
pub struct JoinHandle<T> {
    // None после того, как результат уже отдан
    receiver: Option<oneshot::Receiver<SpawnResult<T>>>,
}

impl<T> JoinHandle<T> {

    pub(crate) fn new(receiver: oneshot::Receiver<SpawnResult<T>>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Блокирует вызывающий поток до выполнения задачи.
    ///
    /// Если задача так и не будет выполнена (пул остановлен, объект пула жив),
    /// вызов не вернётся. Используйте `get_timeout` для ограниченного ожидания.
    pub fn get(self) -> SpawnResult<T> {
        match self.receiver {
            Some(receiver) => receiver
                .blocking_recv()
                .unwrap_or(Err(SpawnError::ChannelClosed)),
            None => Err(SpawnError::ChannelClosed),
        }
    }

    /// После `Timeout` можно ждать снова; после выдачи результата
    /// повторные вызовы возвращают `ChannelClosed`.
    pub fn get_timeout(&mut self, timeout: Duration) -> SpawnResult<T> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(SpawnError::ChannelClosed);
        };

        // таймер должен создаваться уже внутри runtime
        let waited = block_on_timed(async { tokio::time::timeout(timeout, receiver).await })?;
        match waited {
            Ok(res) => {
                self.receiver = None;
                res.unwrap_or(Err(SpawnError::ChannelClosed))
            }
            Err(_) => Err(SpawnError::Timeout),
        }
    }

    /// `None` пока задача ещё в очереди или выполняется
    pub fn try_get(&mut self) -> Option<SpawnResult<T>> {
        let receiver = match self.receiver.as_mut() {
            Some(receiver) => receiver,
            None => return Some(Err(SpawnError::ChannelClosed)),
        };

        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => Err(SpawnError::ChannelClosed),
        };
        self.receiver = None;
        Some(result)
    }
}

impl<T> Future for JoinHandle<T> {
    type Output = SpawnResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(Err(SpawnError::ChannelClosed));
        };
        match Pin::new(receiver).poll(cx) {
            Poll::Ready(res) => {
                this.receiver = None;
                Poll::Ready(res.unwrap_or(Err(SpawnError::ChannelClosed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}


/// Выполняет future с таймерами на отдельном current-thread runtime.
pub(crate) fn block_on_timed<F: Future>(fut: F) -> SpawnResult<F::Output> {
    let rt = Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| SpawnError::Runtime(e.to_string()))?;
    Ok(rt.block_on(fut))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
