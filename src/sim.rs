//! Per-scenario simulation context.
//!
//! A [`Sim`] owns the simulator backend, the executor running the test's tasks,
//! the pending triggers and the scenario outcome. Scenarios never share one: each
//! gets a fresh device and a fresh `Sim`, so nothing leaks from one test into the
//! next and tests can run on separate threads.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::config::TbConfig;
use crate::device::{Device, DeviceSim};
use crate::executor::{Executor, JoinHandle, Task};
use crate::signal::SimObject;
use crate::sim_if::{SimCallback, SimIf};
use crate::tb_obj::{lock, TbObj};
use crate::trigger::{self, TriggerTable};
use crate::value::Val;
use crate::{TbError, TbResult};

// Writes from woken tasks can trigger further edges; a design that keeps toggling
// within one time step never settles.
const MAX_DELTA_CYCLES: u32 = 1_000;

#[derive(Clone)]
pub struct Sim(Arc<SimInner>);

struct SimInner {
    config: TbConfig,
    backend: Mutex<Box<dyn SimIf>>,
    executor: Executor,
    triggers: TbObj<TriggerTable>,
    current: TbObj<Option<Arc<Task>>>,
    outcome: TbObj<Option<TbResult>>,
}

impl Sim {
    pub fn new(device: Box<dyn Device>, config: &TbConfig) -> Self {
        let backend = DeviceSim::new(device, config.precision);
        Sim::with_backend(Box::new(backend), config)
    }

    pub fn with_backend(backend: Box<dyn SimIf>, config: &TbConfig) -> Self {
        Sim(Arc::new(SimInner {
            config: config.clone(),
            backend: Mutex::new(backend),
            executor: Executor::new(),
            triggers: TbObj::new(TriggerTable::new()),
            current: TbObj::new(None),
            outcome: TbObj::new(None),
        }))
    }

    pub fn config(&self) -> &TbConfig {
        &self.0.config
    }

    pub fn log(&self, msg: &str) {
        if !self.0.config.quiet {
            self.backend(|b| b.log(msg));
        }
    }

    pub fn root(&self) -> Result<SimObject, TbError> {
        let handle = self.backend(|b| b.get_root_handle());
        SimObject::from_handle(self, handle)
    }

    pub fn sim_time_steps(&self) -> u64 {
        self.backend(|b| b.get_sim_time_steps())
    }

    pub fn sim_time(&self, unit: &str) -> f64 {
        self.backend(|b| b.get_sim_time(unit))
    }

    pub fn sim_steps(&self, time: f64, unit: &str) -> Result<u64, TbError> {
        self.backend(|b| b.get_sim_steps(time, unit))
    }

    /// Runs `future` concurrently with the calling task.
    pub fn fork(&self, future: impl Future<Output = TbResult> + Send + 'static) -> JoinHandle {
        self.0.executor.spawn(future)
    }

    pub fn is_finished(&self) -> bool {
        self.0.outcome.get().is_some()
    }

    /// Passes the test unless it already has a result.
    pub fn pass_test(&self, msg: &str) {
        self.finish(Ok(Val::String(msg.to_string())));
    }

    /// Fails the test unless it already has a result.
    pub fn fail_test(&self, msg: &str) {
        self.finish(Err(TbError::Failed(msg.to_string())));
    }

    pub(crate) fn abort(&self, err: TbError) {
        self.log(&format!("Harness error: {}", err));
        self.finish(Err(err));
    }

    pub(crate) fn finish(&self, result: TbResult) {
        let first = self.0.outcome.with_mut(|outcome| {
            if outcome.is_some() {
                return false;
            }
            *outcome = Some(result);
            true
        });
        if first {
            self.tear_down();
        }
    }

    pub(crate) fn take_outcome(&self) -> Option<TbResult> {
        self.0.outcome.with_mut(|outcome| outcome.take())
    }

    fn tear_down(&self) {
        trigger::cancel_all_triggers(self);
        self.0.executor.clear_ready_queue();
        if let Some(task) = self.0.current.with_mut(|c| c.take()) {
            task.cancel();
        }
    }

    /// Runs `generator` as the test of this simulation until it completes, the
    /// simulation stalls, or the configured time limit is reached.
    pub fn run_test<F, Fut>(&self, generator: F, name: &str) -> TbResult
    where
        F: FnOnce(SimObject) -> Fut,
        Fut: Future<Output = TbResult> + Send + 'static,
    {
        let root = self.root()?;
        self.log(&format!("Starting test {}", name));
        let test = generator(root);
        let sim = self.clone();
        let handle = self.fork(async move {
            let result = test.await;
            sim.finish(result);
            Ok(Val::None)
        });
        self.0.current.with_mut(|c| *c = handle.task());

        // execute first simulation tick
        self.run_ready_tasks();
        self.run_sim();
        // drops the test future along with the Sim clones it holds
        handle.cancel();

        self.take_outcome().unwrap_or(Err(TbError::Cancelled))
    }

    fn run_sim(&self) {
        let limit = self
            .sim_steps(self.0.config.max_sim_time_ns as f64, "ns")
            .unwrap_or(u64::MAX);
        loop {
            if let Some(t) = self.backend(|b| b.take_due_time()) {
                trigger::react(self, SimCallback::Time(t), None);
            }
            if let Err(err) = self.settle() {
                self.abort(err);
            }
            if self.backend(|b| b.begin_read_only()) {
                trigger::react(self, SimCallback::ReadOnly, None);
                self.backend(|b| b.end_read_only());
            }
            if self.is_finished() {
                break;
            }
            match self.backend(|b| b.next_time()) {
                Some(t) if t <= limit => self.backend(|b| b.set_sim_time(t)),
                Some(_) => {
                    self.finish(Err(TbError::SimTimeLimit {
                        limit_ns: self.0.config.max_sim_time_ns,
                    }));
                    break;
                }
                None => {
                    self.finish(Err(TbError::Stalled {
                        time_ns: self.sim_time("ns") as u64,
                    }));
                    break;
                }
            }
        }
    }

    fn settle(&self) -> Result<(), TbError> {
        for _ in 0..MAX_DELTA_CYCLES {
            let edges = self.backend(|b| b.eval());
            if edges.is_empty() {
                return Ok(());
            }
            for (sig_hdl, edge) in edges {
                trigger::react(self, SimCallback::Edge(sig_hdl), Some(edge));
            }
        }
        Err(TbError::Sim(format!(
            "design did not settle within {} delta cycles",
            MAX_DELTA_CYCLES
        )))
    }

    pub(crate) fn run_ready_tasks(&self) {
        self.0.executor.run_once();
    }

    pub(crate) fn with_triggers<R>(&self, f: impl FnOnce(&mut TriggerTable) -> R) -> R {
        self.0.triggers.with_mut(f)
    }

    pub(crate) fn register_callback(&self, cb: SimCallback) -> Result<usize, TbError> {
        self.backend(|b| b.register_callback(cb))
            .map_err(|_| TbError::Sim(format!("could not register {:?} callback", cb)))
    }

    pub(crate) fn cancel_callback(&self, cb_hdl: usize) -> Result<(), TbError> {
        self.backend(|b| b.cancel_callback(cb_hdl))
            .map_err(|_| TbError::Sim(format!("unknown callback handle {}", cb_hdl)))
    }

    // The guard never outlives the closure, so no task runs while it is held.
    pub(crate) fn backend<R>(&self, f: impl FnOnce(&mut dyn SimIf) -> R) -> R {
        let mut backend = lock(&self.0.backend);
        f(&mut **backend)
    }
}
