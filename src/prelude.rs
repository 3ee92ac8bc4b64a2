pub use crate::bits::{OutBit, OutWord};
pub use crate::fixed::{q4_4, Q4_4};
pub use crate::observer::{Condition, Level, Observer};
pub use crate::pins::{LifPins, LIF_PORTS};
pub use crate::scenario::{lif_tests, Phase, Scenario};
pub use crate::testbench::clock;
pub use crate::utils::clock_cycles;
pub use crate::{
    Device, JoinHandle, Port, Sim, SimObject, TbConfig, TbError, TbResult, TbTests, Test,
    Testbench, Trigger, Val,
};
pub use futures::future::FutureExt;
