use num_format::{Locale, ToFormattedString};

use crate::trigger::EdgeKind;
use crate::{SimpleResult, TbError};

#[derive(Debug, Hash, Clone, Copy, Eq, PartialEq)]
pub enum SimCallback {
    /// Delay in steps when registered, absolute time in steps when fired.
    Time(u64),
    Edge(usize),
    ReadOnly,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Scope holding the device's ports.
    Hier,
    /// Packed vector of the given width.
    Int(u32),
}

/// Everything the testbench needs from a simulator: signal access, time, callbacks,
/// and the scheduling hooks the kernel loop in [`crate::Sim`] drives.
pub trait SimIf: Send {
    fn set_value(&mut self, handle: usize, value: u32) -> SimpleResult<()>;
    fn get_value(&self, handle: usize) -> SimpleResult<u32>;
    fn get_handle_by_name(&self, name: &str) -> SimpleResult<usize>;
    fn get_root_handle(&self) -> usize;
    fn get_kind(&self, handle: usize) -> SimpleResult<ObjectKind>;
    fn get_full_name(&self, handle: usize) -> SimpleResult<String>;
    fn get_sim_time_steps(&self) -> u64;
    fn get_sim_precision(&self) -> i8;
    fn register_callback(&mut self, cb: SimCallback) -> SimpleResult<usize>;
    fn cancel_callback(&mut self, cb_hdl: usize) -> SimpleResult<()>;

    // scheduling
    /// Removes and returns the timer due at the current time, if any.
    fn take_due_time(&mut self) -> Option<u64>;
    fn next_time(&self) -> Option<u64>;
    fn set_sim_time(&mut self, steps: u64);
    /// Settles the design and reports watched signals that changed since the last call.
    fn eval(&mut self) -> Vec<(usize, EdgeKind)>;
    /// Enters the read-only phase if a read-only callback is pending.
    fn begin_read_only(&mut self) -> bool;
    fn end_read_only(&mut self);

    fn log(&self, msg: &str) {
        let t = self.get_sim_time("ns");
        let int = t.floor() as u64;
        let mut frac_str = format!("{:.3}", t % 1.0);
        frac_str.remove(0);
        println!(
            "{}{}ns {}",
            int.to_formatted_string(&Locale::en),
            frac_str,
            msg
        );
    }
    fn get_sim_time(&self, unit: &str) -> f64 {
        // this function does not preserve precision, so don't use carelessly
        let t = self.get_sim_time_steps() as f64;
        let precision = self.get_sim_precision();
        match time_scale(unit) {
            Ok(scale) => ldexp10(t, precision - scale),
            Err(_) => t,
        }
    }
    fn get_sim_steps(&self, time: f64, unit: &str) -> Result<u64, TbError> {
        let precision = self.get_sim_precision();
        let scale = time_scale(unit)
            .map_err(|_| TbError::Sim(format!("unknown time unit '{}'", unit)))?;
        let steps = ldexp10(time, scale - precision);
        if steps % 1.0 == 0.0 && steps >= 0.0 {
            Ok(steps as u64)
        } else {
            Err(TbError::Sim(format!(
                "can't convert time {} {} to sim steps without rounding (sim precision: {})",
                time,
                unit,
                scale_time(precision).unwrap_or_else(|_| precision.to_string())
            )))
        }
    }
}

pub fn time_scale(unit: &str) -> SimpleResult<i8> {
    match unit {
        "fs" => Ok(-15),
        "ps" => Ok(-12),
        "ns" => Ok(-9),
        "us" => Ok(-6),
        "ms" => Ok(-3),
        "sec" => Ok(0),
        _ => Err(()),
    }
}

fn scale_time(unit: i8) -> SimpleResult<String> {
    match unit {
        -15 => Ok("fs".to_string()),
        -12 => Ok("ps".to_string()),
        -9 => Ok("ns".to_string()),
        -6 => Ok("us".to_string()),
        -3 => Ok("ms".to_string()),
        0 => Ok("sec".to_string()),
        _ => Err(()),
    }
}

fn ldexp10(frac: f64, exp: i8) -> f64 {
    // Like math.ldexp, but base 10
    if exp >= 0 {
        frac * 10_u64.pow(exp as u32) as f64
    } else {
        let div = 10_u64.pow(-exp as u32) as f64;
        frac / div
    }
}
