use intmap::IntMap;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use crate::signal::SimObject;
use crate::sim::Sim;
use crate::sim_if::SimCallback;
use crate::TbError;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum EdgeKind {
    Any,
    Rising,
    Falling,
}

#[derive(Default)]
struct CallbackHandles {
    handle: Option<usize>,
    callbacks: VecDeque<TrigShared>,
}

#[derive(Debug, Clone)]
struct TrigShared {
    waker: Waker,
    // If trigger is an edge, the react method needs to know if it is a rising or falling edge
    // so an existing callback does not have to be rescheduled.
    edge_kind: EdgeKind,
    fired: Arc<AtomicBool>,
}

impl TrigShared {
    fn fire(self) {
        self.fired.store(true, Ordering::Release);
        self.waker.wake();
    }
}

/// Pending triggers of one simulation, grouped by the simulator callback serving them.
pub(crate) struct TriggerTable {
    // key is signal handle as u64
    edge_map: IntMap<CallbackHandles>,
    // key is absolute callback time
    timer_map: IntMap<CallbackHandles>,
    read_only: CallbackHandles,
}

#[derive(Clone, Copy, Debug)]
enum TrigKind {
    Edge(usize, EdgeKind),
    Timer(u64),
    ReadOnly,
}

/// Future completing when the simulator reaches the awaited event.
pub struct Trigger {
    sim: Sim,
    kind: TrigKind,
    fired: Option<Arc<AtomicBool>>,
}

impl Trigger {
    pub fn timer(sim: &Sim, time: u64, unit: &str) -> Result<Self, TbError> {
        let steps = sim.sim_steps(time as f64, unit)?;
        Ok(Trigger::timer_steps(sim, steps))
    }
    pub fn timer_steps(sim: &Sim, steps: u64) -> Self {
        Trigger::new(sim, TrigKind::Timer(steps))
    }
    pub fn edge(signal: &SimObject) -> Self {
        Trigger::new(signal.sim(), TrigKind::Edge(signal.handle(), EdgeKind::Any))
    }
    pub fn rising_edge(signal: &SimObject) -> Self {
        Trigger::new(signal.sim(), TrigKind::Edge(signal.handle(), EdgeKind::Rising))
    }
    pub fn falling_edge(signal: &SimObject) -> Self {
        Trigger::new(signal.sim(), TrigKind::Edge(signal.handle(), EdgeKind::Falling))
    }
    pub fn read_only(sim: &Sim) -> Self {
        Trigger::new(sim, TrigKind::ReadOnly)
    }

    fn new(sim: &Sim, kind: TrigKind) -> Self {
        Trigger {
            sim: sim.clone(),
            kind,
            fired: None,
        }
    }
}

impl Future for Trigger {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(fired) = &self.fired {
            // a task holding several triggers is woken by any of them
            return match fired.load(Ordering::Acquire) {
                true => Poll::Ready(()),
                false => Poll::Pending,
            };
        }
        if self.sim.is_finished() {
            // the test is over, this task is never resumed
            return Poll::Pending;
        }
        let fired = Arc::new(AtomicBool::new(false));
        let shared = TrigShared {
            waker: cx.waker().clone(),
            edge_kind: EdgeKind::Any,
            fired: fired.clone(),
        };
        let kind = self.kind;
        let registered = self
            .sim
            .with_triggers(|table| table.register(&self.sim, kind, shared));
        self.fired = Some(fired);
        if let Err(err) = registered {
            self.sim.abort(err);
        }
        Poll::Pending
    }
}

impl TriggerTable {
    pub(crate) fn new() -> Self {
        Self {
            edge_map: IntMap::new(),
            timer_map: IntMap::new(),
            read_only: CallbackHandles::default(),
        }
    }

    fn register(&mut self, sim: &Sim, kind: TrigKind, mut shared: TrigShared) -> Result<(), TbError> {
        match kind {
            TrigKind::ReadOnly => {
                self.read_only.callbacks.push_back(shared);
                if self.read_only.handle.is_none() {
                    let cb_hdl = sim.register_callback(SimCallback::ReadOnly)?;
                    self.read_only.handle.replace(cb_hdl);
                }
            }
            TrigKind::Timer(t) => {
                // Add current time to key since since simulator will send back absolute time, not delta
                let abs_time = t + sim.sim_time_steps();
                if let Some(callbacks) = self.timer_map.get_mut(abs_time) {
                    callbacks.callbacks.push_back(shared);
                } else {
                    let handle = sim.register_callback(SimCallback::Time(t))?;
                    let callback = CallbackHandles {
                        handle: Some(handle),
                        callbacks: VecDeque::from([shared]),
                    };
                    let _ = self.timer_map.insert(abs_time, callback);
                }
            }
            TrigKind::Edge(sig_hdl, edge_kind) => {
                shared.edge_kind = edge_kind;
                if let Some(callbacks) = self.edge_map.get_mut(sig_hdl as u64) {
                    callbacks.callbacks.push_back(shared);
                } else {
                    let handle = sim.register_callback(SimCallback::Edge(sig_hdl))?;
                    let callback = CallbackHandles {
                        handle: Some(handle),
                        callbacks: VecDeque::from([shared]),
                    };
                    let _ = self.edge_map.insert(sig_hdl as u64, callback);
                }
            }
        }
        Ok(())
    }

    /// Detaches the triggers served by `cb` and returns the ones to wake.
    fn collect(&mut self, sim: &Sim, cb: SimCallback, edge: Option<EdgeKind>) -> VecDeque<TrigShared> {
        match cb {
            SimCallback::ReadOnly => {
                // the simulator consumed the callback
                self.read_only.handle = None;
                std::mem::take(&mut self.read_only.callbacks)
            }
            SimCallback::Time(t) => self
                .timer_map
                .remove(t)
                .map(|callbacks| callbacks.callbacks)
                .unwrap_or_default(),
            SimCallback::Edge(sig_hdl) => {
                let Some(mut callbacks) = self.edge_map.remove(sig_hdl as u64) else {
                    return VecDeque::new();
                };
                let edge = edge.unwrap_or(EdgeKind::Any);
                let (wake, resched): (VecDeque<_>, VecDeque<_>) =
                    callbacks.callbacks.drain(..).partition(|trig| {
                        edge == EdgeKind::Any
                            || trig.edge_kind == EdgeKind::Any
                            || trig.edge_kind == edge
                    });
                if resched.is_empty() {
                    // if no callbacks are remaining, cancel
                    if let Some(handle) = callbacks.handle {
                        let _ = sim.cancel_callback(handle);
                    }
                } else {
                    callbacks.callbacks = resched;
                    let _ = self.edge_map.insert(sig_hdl as u64, callbacks);
                }
                wake
            }
        }
    }

    fn drain(&mut self) -> Vec<usize> {
        let mut handles = Vec::new();
        if let Some(handle) = self.read_only.handle.take() {
            handles.push(handle);
        }
        self.read_only.callbacks.clear();
        for (_, cb) in self.timer_map.drain() {
            handles.extend(cb.handle);
        }
        for (_, cb) in self.edge_map.drain() {
            handles.extend(cb.handle);
        }
        handles
    }
}

/// Wakes every task waiting on `cb` and runs them to their next suspension point.
#[inline]
pub(crate) fn react(sim: &Sim, cb: SimCallback, edge: Option<EdgeKind>) {
    let vec_wake = sim.with_triggers(|table| table.collect(sim, cb, edge));
    if !vec_wake.is_empty() {
        for shared in vec_wake {
            shared.fire();
        }
        // execute woken tasks
        sim.run_ready_tasks();
    }
}

pub(crate) fn cancel_all_triggers(sim: &Sim) {
    // the wakers are dropped with the table entries
    let handles = sim.with_triggers(|table| table.drain());
    for handle in handles {
        let _ = sim.cancel_callback(handle);
    }
}
