use crate::signal::SimObject;
use crate::trigger::Trigger;
use crate::value::Val;
use crate::{TbError, TbResult};

/*
 * CLOCK
 */
/// Free-running clock on `clk`, starting low. Runs until the test ends.
#[allow(unreachable_code)]
pub async fn clock(clk: SimObject, period: u32, unit: &str) -> TbResult {
    let sim = clk.sim().clone();
    if period < 2 {
        return Err(TbError::Config(format!("clock period {}{} has no low or high phase", period, unit)));
    }
    let high_t = period / 2;
    let low_t = period - high_t;
    if period % 2 != 0 {
        sim.log(&format!("Warning: Clock period {period}{unit} not dividable by 2. High time will be {high}{unit}; low time will be {low}{unit}.", period=period, unit=unit, high=high_t, low=low_t));
    }
    let low = sim.sim_steps(f64::from(low_t), unit)?;
    let high = sim.sim_steps(f64::from(high_t), unit)?;
    loop {
        clk.try_set_u32(0)?;
        Trigger::timer_steps(&sim, low).await;
        clk.try_set_u32(1)?;
        Trigger::timer_steps(&sim, high).await;
    }
    Ok(Val::None)
}
