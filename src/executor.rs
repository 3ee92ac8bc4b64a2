use futures::{
    future::{BoxFuture, FutureExt},
    task::{waker_ref, ArcWake, Context, Poll},
};
use futures_channel::oneshot;
use queues::{IsQueue, Queue};
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, Weak},
};

use crate::tb_obj::lock;
use crate::{TbError, TbResult};

type ReadyQueue = Mutex<Queue<Arc<Task>>>;

/// Cooperative single-threaded executor. Every simulation owns one; tasks are
/// only polled from inside simulator callbacks via [`Executor::run_once`].
pub(crate) struct Executor {
    ready: Arc<ReadyQueue>,
}

impl Executor {
    pub(crate) fn new() -> Self {
        Self {
            ready: Arc::new(Mutex::new(Queue::new())),
        }
    }

    pub(crate) fn spawn(&self, future: impl Future<Output = TbResult> + Send + 'static) -> JoinHandle {
        let (task, join_handle) = Task::new(future.boxed(), Arc::downgrade(&self.ready));
        schedule_task(&self.ready, task);
        join_handle
    }

    #[inline]
    pub(crate) fn run_once(&self) {
        while let Some(task) = self.next_task() {
            process_task(task);
        }
    }

    pub(crate) fn clear_ready_queue(&self) {
        *lock(&self.ready) = Queue::new();
    }

    fn next_task(&self) -> Option<Arc<Task>> {
        // the guard must be gone before the task is polled
        let next = lock(&self.ready).remove().ok();
        next
    }
}

fn schedule_task(queue: &ReadyQueue, task: Arc<Task>) {
    // an unbounded queue never rejects
    let _ = lock(queue).add(task);
}

#[inline]
fn process_task(task: Arc<Task>) {
    if *lock(&task.state) == TaskState::Cancelled {
        // dropped once all references disappear
        return;
    }

    let mut fut_slot = lock(&task.future);
    // None: woken twice and already completed in between
    if let Some(mut fut) = fut_slot.take() {
        let waker = waker_ref(&task);
        let context = &mut Context::from_waker(&waker);
        match fut.as_mut().poll(context) {
            Poll::Pending => {
                *fut_slot = Some(fut);
            }
            Poll::Ready(result) => {
                drop(fut_slot);
                *lock(&task.state) = TaskState::Done;
                if let Some(tx) = lock(&task.join_tx).take() {
                    // nobody awaiting the handle is fine
                    let _ = tx.send(result);
                }
            }
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum TaskState {
    Pending,
    Done,
    Cancelled,
}

pub struct Task {
    future: Mutex<Option<BoxFuture<'static, TbResult>>>,
    state: Mutex<TaskState>,
    join_tx: Mutex<Option<oneshot::Sender<TbResult>>>,
    ready: Weak<ReadyQueue>,
}

impl Task {
    fn new(fut: BoxFuture<'static, TbResult>, ready: Weak<ReadyQueue>) -> (Arc<Self>, JoinHandle) {
        let (tx, rx) = oneshot::channel::<TbResult>();
        let task = Arc::new(Self {
            future: Mutex::new(Some(fut)),
            state: Mutex::new(TaskState::Pending),
            join_tx: Mutex::new(Some(tx)),
            ready,
        });
        let join_handle = JoinHandle {
            join_rx: rx,
            awaited_task: Some(task.clone()),
        };
        (task, join_handle)
    }

    pub fn is_done(&self) -> bool {
        *lock(&self.state) == TaskState::Done
    }

    pub fn cancel(&self) {
        // The executor drops a cancelled task without polling it again. The future
        // is locked while the task cancels itself from inside its own poll.
        {
            let mut state = lock(&self.state);
            if *state == TaskState::Done {
                return;
            }
            *state = TaskState::Cancelled;
        }
        if let Ok(mut fut) = self.future.try_lock() {
            fut.take();
        }
        lock(&self.join_tx).take();
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if let Some(queue) = arc_self.ready.upgrade() {
            schedule_task(&queue, arc_self.clone());
        }
    }
}

/// Awaits the result of a spawned or forked task.
pub struct JoinHandle {
    awaited_task: Option<Arc<Task>>,
    join_rx: oneshot::Receiver<TbResult>,
}

impl JoinHandle {
    pub(crate) fn task(&self) -> Option<Arc<Task>> {
        self.awaited_task.clone()
    }

    pub fn is_done(&self) -> bool {
        self.awaited_task.as_ref().map_or(true, |t| t.is_done())
    }

    pub fn cancel(mut self) {
        if let Some(task) = self.awaited_task.take() {
            task.cancel();
        }
    }
}

impl Future for JoinHandle {
    type Output = TbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // sender dropped without a value: the task was cancelled
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(TbError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Val;

    #[test]
    fn spawned_task_runs_and_joins() {
        let exec = Executor::new();
        let inner = exec.spawn(async { Ok(Val::Int(7)) });
        let outer = exec.spawn(async move { inner.await });
        exec.run_once();
        assert!(outer.is_done());
    }

    #[test]
    fn cancelled_task_is_never_polled() {
        let exec = Executor::new();
        let flag = Arc::new(Mutex::new(false));
        let seen = flag.clone();
        let handle = exec.spawn(async move {
            *lock(&seen) = true;
            Ok(Val::None)
        });
        handle.cancel();
        exec.run_once();
        assert!(!*lock(&flag));
    }

    #[test]
    fn join_on_cancelled_task_reports_cancellation() {
        let exec = Executor::new();
        let victim = exec.spawn(futures::future::pending::<TbResult>());
        let victim_task = victim.task();
        let waiter = exec.spawn(async move { victim.await });
        exec.run_once();
        victim_task.expect("task attached").cancel();
        exec.run_once();
        let result = futures::executor::block_on(waiter);
        assert_eq!(result, Err(TbError::Cancelled));
    }
}
