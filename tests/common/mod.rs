#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use liftb::pins::LIF_PORTS;
use liftb::{Device, Port, TbConfig};

const CLK: usize = 0;
const RST_N: usize = 1;
const ENA: usize = 2;
const UI_IN: usize = 3;
const UIO_IN: usize = 4;
const UO_OUT: usize = 5;

pub fn quiet() -> TbConfig {
    TbConfig {
        quiet: true,
        results_xml: None,
        ..TbConfig::default()
    }
}

/// How a core model misbehaves, if at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// Never fires.
    Dead,
    /// Refractory flag never clears once set.
    StuckRefractory,
    /// Spike bit is always high.
    Chattering,
    /// Refractory flag is only visible on the spike edge itself.
    ShortRefractory,
}

/// Small leaky-integrate-and-fire core. The membrane integrates the signed
/// Q4.4 input, leaks by v/16 per cycle and fires at [`LifNeuron::THRESHOLD`].
/// After a spike it stays refractory while the membrane discharges.
#[derive(Debug, Default)]
pub struct LifNeuron {
    fault: Fault,
    pins: [u32; 6],
    prev_clk: u32,
    v: i16,
    spike: bool,
    refractory: bool,
}

impl LifNeuron {
    pub const THRESHOLD: i16 = 64;
    pub const DISCHARGE: i16 = 16;

    pub fn with_fault(fault: Fault) -> Self {
        Self {
            fault,
            ..Self::default()
        }
    }

    fn clock_edge(&mut self) {
        if self.pins[RST_N] == 0 {
            self.v = 0;
            self.spike = false;
            self.refractory = false;
            return;
        }
        if self.pins[ENA] == 0 {
            return;
        }
        if self.refractory {
            self.spike = false;
            self.v -= Self::DISCHARGE;
            if self.v <= -Self::THRESHOLD && self.fault != Fault::StuckRefractory {
                self.v = 0;
                self.refractory = false;
            }
        } else {
            let current = i16::from(self.pins[UI_IN] as u8 as i8);
            self.v = self.v + current - (self.v >> 4);
            if self.v >= Self::THRESHOLD && self.fault != Fault::Dead {
                self.spike = true;
                self.refractory = true;
            }
        }
    }

    fn out_word(&self) -> u32 {
        let spike = self.spike || self.fault == Fault::Chattering;
        let refractory = match self.fault {
            Fault::ShortRefractory => self.spike,
            _ => self.refractory,
        };
        u32::from(spike) | u32::from(refractory) << 1
    }
}

impl Device for LifNeuron {
    fn ports(&self) -> &[Port] {
        &LIF_PORTS
    }
    fn write(&mut self, port: usize, value: u32) {
        if port != UO_OUT {
            self.pins[port] = value;
        }
    }
    fn read(&self, port: usize) -> u32 {
        match port {
            UO_OUT => self.out_word(),
            _ => self.pins[port],
        }
    }
    fn eval(&mut self) {
        if self.prev_clk == 0 && self.pins[CLK] == 1 {
            self.clock_edge();
        }
        self.prev_clk = self.pins[CLK];
    }
}

/// Inputs as the core saw them on one rising clock edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeSample {
    pub rst_n: u32,
    pub ena: u32,
    pub ui_in: u32,
    pub uio_in: u32,
}

/// Healthy core that also logs its inputs on every rising clock edge.
#[derive(Default)]
pub struct Recorder {
    core: LifNeuron,
    pub samples: Arc<Mutex<Vec<EdgeSample>>>,
}

impl Recorder {
    pub fn new(samples: Arc<Mutex<Vec<EdgeSample>>>) -> Self {
        Self {
            core: LifNeuron::default(),
            samples,
        }
    }
}

impl Device for Recorder {
    fn ports(&self) -> &[Port] {
        &LIF_PORTS
    }
    fn write(&mut self, port: usize, value: u32) {
        self.core.write(port, value);
    }
    fn read(&self, port: usize) -> u32 {
        self.core.read(port)
    }
    fn eval(&mut self) {
        let pins = self.core.pins;
        if self.core.prev_clk == 0 && pins[CLK] == 1 {
            self.samples.lock().unwrap().push(EdgeSample {
                rst_n: pins[RST_N],
                ena: pins[ENA],
                ui_in: pins[UI_IN],
                uio_in: pins[UIO_IN],
            });
        }
        self.core.eval();
    }
}
