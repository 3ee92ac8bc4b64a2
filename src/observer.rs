//! Bounded observation of output bits, counted in clock edges.
//!
//! Every sample is taken in the read-only phase after a rising edge, when the
//! outputs have settled for that cycle. Edge counts are 0-indexed from the start
//! of the wait, so an event seen on the first edge is reported as edge 0.

use std::fmt;

use crate::bits::{OutBit, OutWord};
use crate::pins::LifPins;
use crate::signal::SimObject;
use crate::TbError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn value(self) -> u32 {
        match self {
            Level::Low => 0,
            Level::High => 1,
        }
    }
}

/// Single-bit predicate on the output word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Condition {
    pub bit: OutBit,
    pub level: Level,
}

impl Condition {
    pub const fn high(bit: OutBit) -> Self {
        Self {
            bit,
            level: Level::High,
        }
    }

    pub const fn low(bit: OutBit) -> Self {
        Self {
            bit,
            level: Level::Low,
        }
    }

    pub fn holds(self, word: OutWord) -> bool {
        word.get(self.bit) == self.level.value()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Low => "low",
            Level::High => "high",
        };
        write!(f, "{} {}", self.bit, level)
    }
}

#[derive(Clone, Debug)]
pub struct Observer {
    clk: SimObject,
    word: SimObject,
}

impl Observer {
    pub fn new(clk: &SimObject, word: &SimObject) -> Self {
        Self {
            clk: clk.clone(),
            word: word.clone(),
        }
    }

    pub fn for_pins(pins: &LifPins) -> Self {
        Self::new(&pins.clk, &pins.uo_out)
    }

    pub fn sample(&self) -> Result<OutWord, TbError> {
        self.word.try_u32().map(OutWord)
    }

    /// Waits until `cond` holds on a rising edge. Returns the edge it was seen on,
    /// or [`TbError::Timeout`] once `budget` edges passed without it.
    pub async fn wait_for(&self, cond: Condition, budget: u32) -> Result<u32, TbError> {
        for edge in 0..budget {
            self.clk.rising_edge_ro().await;
            if cond.holds(self.sample()?) {
                return Ok(edge);
            }
        }
        Err(TbError::Timeout {
            expectation: cond.to_string(),
            edges: budget,
        })
    }

    /// Checks `cond` exactly once, on the next rising edge.
    pub async fn expect_next(&self, cond: Condition) -> Result<(), TbError> {
        self.wait_for(cond, 1).await.map(|_| ())
    }

    /// Requires `cond` on each of the next `window` rising edges and fails on the
    /// first edge where it does not hold.
    pub async fn hold_for(&self, cond: Condition, window: u32) -> Result<(), TbError> {
        for edge in 0..window {
            self.clk.rising_edge_ro().await;
            if !cond.holds(self.sample()?) {
                return Err(TbError::InvariantViolation {
                    expectation: cond.to_string(),
                    edge,
                    window,
                });
            }
        }
        Ok(())
    }
}
