use crate::signal::SimObject;
use crate::TbError;

/// Awaits `n_cycles` rising edges of `signal`.
pub async fn clock_cycles(signal: &SimObject, n_cycles: u32) -> Result<(), TbError> {
    for _ in 0..n_cycles {
        signal.rising_edge().await;
    }
    Ok(())
}
