//! End-to-end scenarios for the LIF core.
//!
//! A [`Scenario`] walks the fixed bring-up (clock, reset, settle), applies one
//! constant stimulus and then observes the outputs. Its [`Phase`] only moves
//! forward; an attempt to skip reset or go back is a harness bug and fails the
//! scenario with [`TbError::PhaseViolation`].

use futures::FutureExt;
use std::fmt;

use crate::bits::OutBit;
use crate::executor::JoinHandle;
use crate::fixed::Q4_4;
use crate::observer::{Condition, Observer};
use crate::pins::LifPins;
use crate::signal::SimObject;
use crate::test::{TbTests, Test};
use crate::value::Val;
use crate::{sequencer, stimulus, TbError, TbResult};

pub const SPIKE_CURRENT: f64 = 2.0;
pub const SPIKE_BUDGET: u32 = 256;
pub const REFRACTORY_CLEAR_BUDGET: u32 = 128;
pub const INHIBIT_CURRENT: f64 = -1.0;
pub const QUIET_WINDOW: u32 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Init,
    ResetHeld,
    ResetReleasedSettling,
    StimulusApplied,
    WaitingForEvent,
    AssertingInvariant,
    Pass,
    Fail,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Pass | Phase::Fail)
    }

    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (from, Fail) => !from.is_terminal(),
            (Init, ResetHeld)
            | (ResetHeld, ResetReleasedSettling)
            | (ResetReleasedSettling, StimulusApplied)
            | (StimulusApplied, WaitingForEvent)
            | (StimulusApplied, AssertingInvariant)
            | (WaitingForEvent, WaitingForEvent)
            | (WaitingForEvent, Pass)
            | (AssertingInvariant, Pass) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "INIT",
            Phase::ResetHeld => "RESET_HELD",
            Phase::ResetReleasedSettling => "RESET_RELEASED_SETTLING",
            Phase::StimulusApplied => "STIMULUS_APPLIED",
            Phase::WaitingForEvent => "WAITING_FOR_EVENT",
            Phase::AssertingInvariant => "ASSERTING_INVARIANT",
            Phase::Pass => "PASS",
            Phase::Fail => "FAIL",
        };
        f.write_str(s)
    }
}

pub struct Scenario {
    pins: LifPins,
    observer: Observer,
    phase: Phase,
    // started by `reset`, stopped by `conclude`
    clock: Option<JoinHandle>,
}

impl Scenario {
    pub fn bind(dut: &SimObject) -> Result<Self, TbError> {
        let pins = LifPins::bind(dut)?;
        Ok(Self {
            observer: Observer::for_pins(&pins),
            pins,
            phase: Phase::Init,
            clock: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pins(&self) -> &LifPins {
        &self.pins
    }

    fn log(&self, msg: &str) {
        self.pins.clk.sim().log(msg);
    }

    fn advance(&mut self, next: Phase) -> Result<(), TbError> {
        if !self.phase.can_advance_to(next) {
            return Err(TbError::PhaseViolation {
                from: self.phase,
                to: next,
            });
        }
        if self.phase != next {
            self.log(&format!("{} -> {}", self.phase, next));
        }
        self.phase = next;
        Ok(())
    }

    /// Starts the clock, pulses reset and waits out the settling edges.
    pub async fn reset(&mut self) -> Result<(), TbError> {
        if self.clock.is_none() {
            self.clock = Some(sequencer::start_clock(&self.pins));
        }
        self.advance(Phase::ResetHeld)?;
        sequencer::hold_reset(&self.pins).await?;
        self.advance(Phase::ResetReleasedSettling)?;
        sequencer::release_reset(&self.pins).await
    }

    pub fn apply_stimulus(&mut self, current: f64) -> Result<Q4_4, TbError> {
        self.advance(Phase::StimulusApplied)?;
        let q = stimulus::drive_current(&self.pins, current)?;
        self.log(&format!("Driving ui_in = {}", q));
        Ok(q)
    }

    pub async fn wait_for(&mut self, cond: Condition, budget: u32) -> Result<u32, TbError> {
        self.advance(Phase::WaitingForEvent)?;
        let edge = self.observer.wait_for(cond, budget).await?;
        self.log(&format!("Saw {} on edge {}", cond, edge));
        Ok(edge)
    }

    pub async fn expect_next(&mut self, cond: Condition) -> Result<(), TbError> {
        self.advance(Phase::WaitingForEvent)?;
        self.observer.expect_next(cond).await
    }

    pub async fn hold_for(&mut self, cond: Condition, window: u32) -> Result<(), TbError> {
        self.advance(Phase::AssertingInvariant)?;
        self.observer.hold_for(cond, window).await?;
        self.log(&format!("{} held for {} edges", cond, window));
        Ok(())
    }

    /// Moves to the terminal phase matching `result` and hands the result back.
    pub fn conclude(mut self, result: TbResult) -> TbResult {
        let verdict = match result {
            Ok(_) => Phase::Pass,
            Err(_) => Phase::Fail,
        };
        if let Some(clock) = self.clock.take() {
            clock.cancel();
        }
        self.advance(verdict)?;
        if let Err(err) = &result {
            self.log(&format!("Scenario failed: {}", err));
        }
        result
    }
}

/// Drives +2.0 and expects a spike, the refractory flag on the edge after it,
/// and the refractory flag clearing again.
pub async fn lif_spikes_and_refractory_clears(dut: SimObject) -> TbResult {
    let mut scenario = Scenario::bind(&dut)?;
    let result = spike_and_clear(&mut scenario).await;
    scenario.conclude(result)
}

async fn spike_and_clear(scenario: &mut Scenario) -> TbResult {
    scenario.reset().await?;
    scenario.apply_stimulus(SPIKE_CURRENT)?;
    let spike_edge = scenario
        .wait_for(Condition::high(OutBit::Spike), SPIKE_BUDGET)
        .await?;
    // refractory is sampled one edge after the spike, never on the same edge
    scenario
        .expect_next(Condition::high(OutBit::Refractory))
        .await?;
    let clear_edge = scenario
        .wait_for(Condition::low(OutBit::Refractory), REFRACTORY_CLEAR_BUDGET)
        .await?;
    Ok(Val::String(format!(
        "spike on edge {}, refractory cleared on edge {} after it",
        spike_edge, clear_edge
    )))
}

/// Drives -1.0 and requires the spike bit to stay low for a whole window.
pub async fn lif_no_spike_on_negative_current(dut: SimObject) -> TbResult {
    let mut scenario = Scenario::bind(&dut)?;
    let result = no_spike(&mut scenario).await;
    scenario.conclude(result)
}

async fn no_spike(scenario: &mut Scenario) -> TbResult {
    scenario.reset().await?;
    scenario.apply_stimulus(INHIBIT_CURRENT)?;
    scenario
        .hold_for(Condition::low(OutBit::Spike), QUIET_WINDOW)
        .await?;
    Ok(Val::String(format!("no spike in {} edges", QUIET_WINDOW)))
}

/// Both LIF scenarios, in execution order.
pub fn lif_tests() -> TbTests {
    let mut tests = TbTests::new();
    tests.push(Test::new(
        "lif_spikes_and_refractory_clears",
        |dut| lif_spikes_and_refractory_clears(dut).boxed(),
    ));
    tests.push(Test::new(
        "lif_no_spike_on_negative_current",
        |dut| lif_no_spike_on_negative_current(dut).boxed(),
    ));
    tests
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Phase::Init, Phase::ResetHeld)]
    #[case(Phase::ResetHeld, Phase::ResetReleasedSettling)]
    #[case(Phase::ResetReleasedSettling, Phase::StimulusApplied)]
    #[case(Phase::StimulusApplied, Phase::AssertingInvariant)]
    #[case(Phase::WaitingForEvent, Phase::WaitingForEvent)]
    #[case(Phase::AssertingInvariant, Phase::Pass)]
    #[case(Phase::ResetHeld, Phase::Fail)]
    fn forward_transitions_are_allowed(#[case] from: Phase, #[case] to: Phase) {
        assert!(from.can_advance_to(to));
    }

    #[rstest]
    #[case(Phase::Init, Phase::StimulusApplied)]
    #[case(Phase::Init, Phase::ResetReleasedSettling)]
    #[case(Phase::StimulusApplied, Phase::ResetHeld)]
    #[case(Phase::WaitingForEvent, Phase::AssertingInvariant)]
    #[case(Phase::StimulusApplied, Phase::Pass)]
    #[case(Phase::Pass, Phase::Fail)]
    #[case(Phase::Fail, Phase::Fail)]
    fn skipping_or_going_back_is_rejected(#[case] from: Phase, #[case] to: Phase) {
        assert!(!from.can_advance_to(to));
    }

    #[test]
    fn both_scenarios_are_registered_in_order() {
        let tests = lif_tests();
        let names: Vec<_> = tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "lif_spikes_and_refractory_clears",
                "lif_no_spike_on_negative_current"
            ]
        );
    }
}
