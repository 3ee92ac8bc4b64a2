//! Clock and reset bring-up. The timing here is fixed: scenarios differ only in
//! the stimulus that follows.

use crate::executor::JoinHandle;
use crate::pins::LifPins;
use crate::testbench::clock;
use crate::utils::clock_cycles;
use crate::TbError;

/// Rising edges `rst_n` is held low for.
pub const RESET_CYCLES: u32 = 5;
/// Rising edges after reset release before any stimulus is applied.
pub const SETTLE_CYCLES: u32 = 2;

/// Forks the free-running clock with the configured period. A clock that can't
/// run fails the scenario, since every wait on it would stall.
pub fn start_clock(pins: &LifPins) -> JoinHandle {
    let sim = pins.clk.sim().clone();
    let clk = clock(pins.clk.clone(), sim.config().clock_period_ns, "ns");
    sim.clone().fork(async move {
        let result = clk.await;
        if let Err(err) = &result {
            sim.abort(err.clone());
        }
        result
    })
}

/// Enables the core, zeroes its data inputs and holds reset for [`RESET_CYCLES`] edges.
pub async fn hold_reset(pins: &LifPins) -> Result<(), TbError> {
    pins.ena.try_set_u32(1)?;
    pins.ui_in.try_set_u32(0)?;
    pins.uio_in.try_set_u32(0)?;
    pins.rst_n.try_set_u32(0)?;
    clock_cycles(&pins.clk, RESET_CYCLES).await
}

/// Releases reset and lets the core run [`SETTLE_CYCLES`] edges with zero input.
pub async fn release_reset(pins: &LifPins) -> Result<(), TbError> {
    pins.rst_n.try_set_u32(1)?;
    clock_cycles(&pins.clk, SETTLE_CYCLES).await
}

/// Full bring-up: clock, reset pulse, settling. Returns the clock task.
pub async fn reset_sequence(pins: &LifPins) -> Result<JoinHandle, TbError> {
    let clk = start_clock(pins);
    hold_reset(pins).await?;
    release_reset(pins).await?;
    Ok(clk)
}
