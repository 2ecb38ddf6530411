use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};


/// Потокобезопасная FIFO очередь задач
///
/// Все операции атомарны относительно друг друга. `len` и `is_empty`
/// это снимок состояния, валидный только внутри той же критической секции,
/// поэтому пул ждёт работу через `lock` + условную переменную.
pub struct JobQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> JobQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[inline]
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Никогда не блокируется на ожидании: пустая очередь сразу даёт `None`
    #[inline]
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    // Задачи выполняются вне блокировки, так что poison безопасно игнорировать
    pub(crate) fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for JobQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
