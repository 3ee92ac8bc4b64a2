use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// TbObj lets testbench code share state (the simulation context, a recorder, a
// scoreboard) between tasks. The executor polls every task on one thread, so the
// lock is never contended; it only has to make the shared state Send + Sync.
pub struct TbObj<T>(Arc<Mutex<T>>);

impl<T> TbObj<T> {
    pub fn new(data: T) -> TbObj<T> {
        TbObj(Arc::new(Mutex::new(data)))
    }
    pub fn get(&self) -> MutexGuard<'_, T> {
        lock(&self.0)
    }
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut lock(&self.0))
    }
}

impl<T> Clone for TbObj<T> {
    fn clone(&self) -> Self {
        TbObj(self.0.clone())
    }
}

impl<T: Default> Default for TbObj<T> {
    fn default() -> Self {
        TbObj::new(T::default())
    }
}

// A panicking task poisons whatever it held; the state itself is still usable.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
