use crate::fixed::Q4_4;
use crate::pins::LifPins;
use crate::TbError;

/// Drives `current` onto `ui_in` as Q4.4. The value stays on the bus until the
/// scenario ends; nothing rewrites it per cycle.
pub fn drive_current(pins: &LifPins, current: f64) -> Result<Q4_4, TbError> {
    let q = Q4_4::from_f64(current);
    pins.ui_in.try_set_u32(u32::from(q.bits()))?;
    Ok(q)
}
