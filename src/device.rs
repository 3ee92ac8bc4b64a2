//! The device under test and the in-process simulator that drives it.
//!
//! A [`Device`] is a pin-level black box: the harness writes inputs, calls
//! [`Device::eval`] and reads outputs. Clocked devices watch their own clock
//! input and update registers when they see it rise, the way a Verilator model
//! does. [`DeviceSim`] wraps a device into a [`SimIf`] with a time axis,
//! callbacks and edge detection.

use intmap::IntMap;
use std::collections::BTreeMap;

use crate::sim_if::{ObjectKind, SimCallback, SimIf};
use crate::trigger::EdgeKind;
use crate::SimpleResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortDir {
    Input,
    Output,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Port {
    pub name: &'static str,
    pub dir: PortDir,
    pub width: u32,
}

impl Port {
    pub const fn input(name: &'static str, width: u32) -> Self {
        Self {
            name,
            dir: PortDir::Input,
            width,
        }
    }
    pub const fn output(name: &'static str, width: u32) -> Self {
        Self {
            name,
            dir: PortDir::Output,
            width,
        }
    }
    pub fn mask(&self) -> u32 {
        match self.width {
            w if w >= 32 => u32::MAX,
            w => (1 << w) - 1,
        }
    }
}

/// Pin-level model of the device under test.
///
/// Port indices passed to [`Device::write`] and [`Device::read`] are positions in
/// [`Device::ports`]. Values are already masked to the port width.
pub trait Device: Send {
    fn name(&self) -> &str {
        "dut"
    }
    fn ports(&self) -> &[Port];
    fn write(&mut self, port: usize, value: u32);
    fn read(&self, port: usize) -> u32;
    /// Settles the device for the current inputs.
    fn eval(&mut self);
}

enum CbKind {
    Time(u64),
    Edge(usize),
    ReadOnly,
}

/// Runs a [`Device`] in process. Handle 0 is the device scope, handle `i + 1` is port `i`.
pub struct DeviceSim {
    device: Box<dyn Device>,
    ports: Vec<Port>,
    precision: i8,
    time: u64,
    cb_hdl_cnt: usize,
    cb_hdl_map: IntMap<CbKind>,
    // absolute time -> callback handle
    timers: BTreeMap<u64, usize>,
    // signal handle -> (callback handle, last seen value)
    edges: BTreeMap<usize, (usize, u32)>,
    read_only: Option<usize>,
    in_read_only: bool,
}

impl DeviceSim {
    pub fn new(device: Box<dyn Device>, precision: i8) -> Self {
        let ports = device.ports().to_vec();
        Self {
            device,
            ports,
            precision,
            time: 0,
            cb_hdl_cnt: 0,
            cb_hdl_map: IntMap::new(),
            timers: BTreeMap::new(),
            edges: BTreeMap::new(),
            read_only: None,
            in_read_only: false,
        }
    }

    fn port(&self, handle: usize) -> SimpleResult<(usize, &Port)> {
        let idx = handle.checked_sub(1).ok_or(())?;
        self.ports.get(idx).map(|p| (idx, p)).ok_or(())
    }

    fn new_cb_hdl(&mut self, kind: CbKind) -> usize {
        let hdl = self.cb_hdl_cnt;
        self.cb_hdl_cnt += 1;
        let _ = self.cb_hdl_map.insert(hdl as u64, kind);
        hdl
    }
}

impl SimIf for DeviceSim {
    fn set_value(&mut self, handle: usize, value: u32) -> SimpleResult<()> {
        if self.in_read_only {
            return Err(());
        }
        let (idx, port) = self.port(handle)?;
        if port.dir != PortDir::Input {
            return Err(());
        }
        let value = value & port.mask();
        self.device.write(idx, value);
        Ok(())
    }
    fn get_value(&self, handle: usize) -> SimpleResult<u32> {
        let (idx, port) = self.port(handle)?;
        Ok(self.device.read(idx) & port.mask())
    }
    fn get_handle_by_name(&self, name: &str) -> SimpleResult<usize> {
        let root = self.device.name();
        if name == root {
            return Ok(0);
        }
        let local = name
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or(())?;
        self.ports
            .iter()
            .position(|p| p.name == local)
            .map(|idx| idx + 1)
            .ok_or(())
    }
    fn get_root_handle(&self) -> usize {
        0
    }
    fn get_kind(&self, handle: usize) -> SimpleResult<ObjectKind> {
        if handle == 0 {
            return Ok(ObjectKind::Hier);
        }
        let (_, port) = self.port(handle)?;
        Ok(ObjectKind::Int(port.width))
    }
    fn get_full_name(&self, handle: usize) -> SimpleResult<String> {
        if handle == 0 {
            return Ok(self.device.name().to_string());
        }
        let (_, port) = self.port(handle)?;
        Ok(format!("{}.{}", self.device.name(), port.name))
    }
    fn get_sim_time_steps(&self) -> u64 {
        self.time
    }
    fn get_sim_precision(&self) -> i8 {
        self.precision
    }
    fn register_callback(&mut self, cb: SimCallback) -> SimpleResult<usize> {
        match cb {
            SimCallback::Time(t) => {
                let t_abs = self.time + t;
                if self.timers.contains_key(&t_abs) {
                    // one callback per point in time, the trigger table fans out
                    return Err(());
                }
                let hdl = self.new_cb_hdl(CbKind::Time(t_abs));
                self.timers.insert(t_abs, hdl);
                Ok(hdl)
            }
            SimCallback::Edge(sig_hdl) => {
                if self.edges.contains_key(&sig_hdl) {
                    return Err(());
                }
                let current_value = self.get_value(sig_hdl)?;
                let hdl = self.new_cb_hdl(CbKind::Edge(sig_hdl));
                self.edges.insert(sig_hdl, (hdl, current_value));
                Ok(hdl)
            }
            SimCallback::ReadOnly => {
                if let Some(hdl) = self.read_only {
                    return Ok(hdl);
                }
                let hdl = self.new_cb_hdl(CbKind::ReadOnly);
                self.read_only = Some(hdl);
                Ok(hdl)
            }
        }
    }
    fn cancel_callback(&mut self, cb_hdl: usize) -> SimpleResult<()> {
        match self.cb_hdl_map.remove(cb_hdl as u64).ok_or(())? {
            CbKind::Time(t_abs) => {
                self.timers.remove(&t_abs);
            }
            CbKind::Edge(sig_hdl) => {
                self.edges.remove(&sig_hdl);
            }
            CbKind::ReadOnly => self.read_only = None,
        }
        Ok(())
    }

    fn take_due_time(&mut self) -> Option<u64> {
        let hdl = self.timers.remove(&self.time)?;
        self.cb_hdl_map.remove(hdl as u64);
        Some(self.time)
    }
    fn next_time(&self) -> Option<u64> {
        self.timers.keys().next().copied()
    }
    fn set_sim_time(&mut self, steps: u64) {
        self.time = steps;
    }
    fn eval(&mut self) -> Vec<(usize, EdgeKind)> {
        self.device.eval();
        let mut changed = Vec::new();
        for (&sig_hdl, (_, last)) in self.edges.iter_mut() {
            let idx = sig_hdl - 1;
            let port = self.ports[idx];
            let value = self.device.read(idx) & port.mask();
            if value != *last {
                let edge = match port.width {
                    1 if value != 0 => EdgeKind::Rising,
                    1 => EdgeKind::Falling,
                    _ => EdgeKind::Any,
                };
                *last = value;
                changed.push((sig_hdl, edge));
            }
        }
        changed
    }
    fn begin_read_only(&mut self) -> bool {
        match self.read_only.take() {
            Some(hdl) => {
                self.cb_hdl_map.remove(hdl as u64);
                self.in_read_only = true;
                true
            }
            None => false,
        }
    }
    fn end_read_only(&mut self) {
        self.in_read_only = false;
    }
}
