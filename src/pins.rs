//! Pin contract of the LIF core and its typed handles.

use crate::device::Port;
use crate::signal::SimObject;
use crate::TbError;

/// Ports of the LIF core, in the order a conforming [`crate::Device`] should expose them.
pub const LIF_PORTS: [Port; 6] = [
    Port::input("clk", 1),
    Port::input("rst_n", 1),
    Port::input("ena", 1),
    Port::input("ui_in", 8),
    Port::input("uio_in", 8),
    Port::output("uo_out", 8),
];

/// Every pin the harness touches, resolved once at scenario start.
#[derive(Clone, Debug)]
pub struct LifPins {
    pub clk: SimObject,
    /// Active low.
    pub rst_n: SimObject,
    pub ena: SimObject,
    /// Signed Q4.4 stimulus current.
    pub ui_in: SimObject,
    /// Unused, held at 0.
    pub uio_in: SimObject,
    pub uo_out: SimObject,
}

impl LifPins {
    pub fn bind(dut: &SimObject) -> Result<Self, TbError> {
        Ok(Self {
            clk: dut.get_child("clk")?,
            rst_n: dut.get_child("rst_n")?,
            ena: dut.get_child("ena")?,
            ui_in: dut.get_child("ui_in")?,
            uio_in: dut.get_child("uio_in")?,
            uo_out: dut.get_child("uo_out")?,
        })
    }
}
