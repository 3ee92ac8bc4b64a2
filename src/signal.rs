use std::fmt;

use crate::sim::Sim;
use crate::sim_if::ObjectKind;
use crate::trigger::Trigger;
use crate::TbError;

/// A handle on one object of the simulated design: the device scope or one of its pins.
#[derive(Clone)]
pub struct SimObject {
    sim: Sim,
    handle: usize,
    kind: ObjectKind,
}

impl fmt::Debug for SimObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimObject")
            .field("name", &self.name())
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish()
    }
}

impl SimObject {
    pub(crate) fn from_handle(sim: &Sim, handle: usize) -> Result<Self, TbError> {
        let kind = sim
            .backend(|b| b.get_kind(handle))
            .map_err(|_| TbError::Sim(format!("invalid object handle {}", handle)))?;
        Ok(SimObject {
            sim: sim.clone(),
            handle,
            kind,
        })
    }

    pub fn from_name(sim: &Sim, full_name: &str) -> Result<Self, TbError> {
        let handle = sim
            .backend(|b| b.get_handle_by_name(full_name))
            .map_err(|_| TbError::UnknownSignal(full_name.to_string()))?;
        SimObject::from_handle(sim, handle)
    }

    pub fn handle(&self) -> usize {
        self.handle
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn sim(&self) -> &Sim {
        &self.sim
    }

    pub fn name(&self) -> String {
        self.sim
            .backend(|b| b.get_full_name(self.handle))
            .unwrap_or_else(|_| format!("<handle {}>", self.handle))
    }

    pub fn get_child(&self, name: &str) -> Result<Self, TbError> {
        let mut child_name = self.name();
        child_name.push('.');
        child_name.push_str(name);
        SimObject::from_name(&self.sim, &child_name)
    }

    pub fn try_u32(&self) -> Result<u32, TbError> {
        self.sim
            .backend(|b| b.get_value(self.handle))
            .map_err(|_| TbError::Sim(format!("can't read {}", self.name())))
    }

    pub fn try_set_u32(&self, val: u32) -> Result<(), TbError> {
        self.sim
            .backend(|b| b.set_value(self.handle, val))
            .map_err(|_| TbError::Sim(format!("can't write {:#x} to {}", val, self.name())))
    }

    // convenience functions to get edge triggers for this signal
    pub fn rising_edge(&self) -> Trigger {
        Trigger::rising_edge(self)
    }
    /// Rising edge, then the read-only phase of the same time step, where the
    /// design has settled and outputs can be sampled.
    pub async fn rising_edge_ro(&self) {
        self.rising_edge().await;
        Trigger::read_only(&self.sim).await;
    }
    pub fn falling_edge(&self) -> Trigger {
        Trigger::falling_edge(self)
    }
    pub fn edge(&self) -> Trigger {
        Trigger::edge(self)
    }
}
