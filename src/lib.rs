//! Clocked testbenches for leaky-integrate-and-fire neuron cores.
//!
//! Tests are async functions that drive a pin-level [`Device`] through a
//! simulated clock, in the style of cocotb. Each test gets its own device and its
//! own [`Sim`] context, so results never depend on test order.

pub mod bits;
pub mod config;
pub mod device;
mod error;
mod executor;
pub mod fixed;
mod junit;
pub mod observer;
pub mod pins;
pub mod prelude;
pub mod runner;
pub mod scenario;
pub mod sequencer;
mod signal;
mod sim;
pub mod sim_if;
pub mod stimulus;
mod tb_obj;
pub mod testbench;
mod trigger;
pub mod utils;
mod value;

use once_cell::sync::OnceCell;

pub use config::TbConfig;
pub use device::{Device, DeviceSim, Port, PortDir};
pub use error::TbError;
pub use executor::{JoinHandle, Task};
pub use futures;
pub use junit::write_junit_xml;
pub use runner::{Summary, TestReport, Testbench};
pub use signal::SimObject;
pub use sim::Sim;
pub use tb_obj::TbObj;
pub use test::{TbTests, Test, TestFn};
pub use trigger::{EdgeKind, Trigger};
pub use value::Val;

pub type SimpleResult<T> = Result<T, ()>;
pub type TbResult = Result<Val, TbError>;

/// Name of the testbench binary, used as the default JUnit suite name.
pub static CRATE_NAME: OnceCell<String> = OnceCell::new();

/// Generates a `main` that runs the listed tests against devices built by
/// `$factory` and exits non-zero if any of them failed.
///
/// ```ignore
/// use liftb::scenario::lif_no_spike_on_negative_current;
/// liftb::run_with_device!(MyCore::default; my_test, lif_no_spike_on_negative_current);
/// ```
#[macro_export]
macro_rules! run_with_device {
    ($factory:expr; $($i:ident),+ $(,)?) => {
        fn main() {
            let _ = $crate::CRATE_NAME.set(std::module_path!().to_string());
            let config = match $crate::TbConfig::from_env() {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("{}", err);
                    std::process::exit(2);
                }
            };
            let mut tests = $crate::TbTests::new();
            $(
                tests.push($crate::Test::new(stringify!($i), |dut| {
                    $crate::futures::FutureExt::boxed($i(dut))
                }));
            )+
            match $crate::Testbench::new(config, $factory).with_tests(tests).run() {
                Ok(summary) if summary.all_passed() => {}
                Ok(_) => std::process::exit(1),
                Err(err) => {
                    eprintln!("{}", err);
                    std::process::exit(2);
                }
            }
        }
    };
}
