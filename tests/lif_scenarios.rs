mod common;

use common::{quiet, Fault, LifNeuron};
use liftb::scenario::{
    lif_no_spike_on_negative_current, lif_spikes_and_refractory_clears, lif_tests,
    QUIET_WINDOW, REFRACTORY_CLEAR_BUDGET, SPIKE_BUDGET,
};
use liftb::futures::FutureExt;
use liftb::{runner, TbConfig, TbError, Test, Testbench};
use rstest::rstest;

fn spike_test() -> Test {
    Test::new("lif_spikes_and_refractory_clears", |dut| {
        lif_spikes_and_refractory_clears(dut).boxed()
    })
}

fn quiet_test() -> Test {
    Test::new("lif_no_spike_on_negative_current", |dut| {
        lif_no_spike_on_negative_current(dut).boxed()
    })
}

fn run_on(fault: Fault, test: &Test) -> runner::TestReport {
    runner::run_test(&quiet(), Box::new(LifNeuron::with_fault(fault)), test)
}

#[test]
fn healthy_core_passes_both_scenarios() {
    let summary = Testbench::new(quiet(), LifNeuron::default)
        .with_tests(lif_tests())
        .run()
        .unwrap();
    assert_eq!(summary.reports.len(), 2);
    for report in &summary.reports {
        assert!(report.passed(), "{}: {}", report.name, report.message());
    }
    assert!(summary.all_passed());
}

#[test]
fn healthy_core_reports_where_it_spiked() {
    let report = run_on(Fault::None, &spike_test());
    assert_eq!(
        report.message(),
        "spike on edge 2, refractory cleared on edge 8 after it"
    );
}

#[test]
fn dead_core_times_out_waiting_for_spike() {
    let report = run_on(Fault::Dead, &spike_test());
    assert_eq!(
        report.result,
        Err(TbError::Timeout {
            expectation: "spike (uo_out[0]) high".into(),
            edges: SPIKE_BUDGET,
        })
    );
}

#[test]
fn stuck_refractory_times_out_waiting_for_clear() {
    let report = run_on(Fault::StuckRefractory, &spike_test());
    assert_eq!(
        report.result,
        Err(TbError::Timeout {
            expectation: "refractory (uo_out[1]) low".into(),
            edges: REFRACTORY_CLEAR_BUDGET,
        })
    );
}

#[test]
fn refractory_must_still_be_high_one_edge_after_spike() {
    let report = run_on(Fault::ShortRefractory, &spike_test());
    assert_eq!(
        report.result,
        Err(TbError::Timeout {
            expectation: "refractory (uo_out[1]) high".into(),
            edges: 1,
        })
    );
}

#[test]
fn chattering_core_violates_quiet_window() {
    let report = run_on(Fault::Chattering, &quiet_test());
    assert_eq!(
        report.result,
        Err(TbError::InvariantViolation {
            expectation: "spike (uo_out[0]) low".into(),
            edge: 0,
            window: QUIET_WINDOW,
        })
    );
}

#[rstest]
#[case(Fault::Dead)]
#[case(Fault::StuckRefractory)]
#[case(Fault::ShortRefractory)]
fn faults_that_only_affect_spiking_keep_quiet_scenario_passing(#[case] fault: Fault) {
    let report = run_on(fault, &quiet_test());
    assert!(report.passed(), "{}", report.message());
}

#[test]
fn failures_are_device_failures() {
    let report = run_on(Fault::Dead, &spike_test());
    assert!(report.result.unwrap_err().is_device_failure());
}

#[test]
fn each_scenario_gets_a_fresh_device() {
    // a core left refractory by the first run would fail the second
    let summary = Testbench::new(quiet(), LifNeuron::default)
        .with_tests(lif_tests())
        .with_tests(lif_tests())
        .run()
        .unwrap();
    assert_eq!(summary.reports.len(), 4);
    assert!(summary.all_passed());
}

#[test]
fn junit_report_lists_every_scenario() {
    let path = std::env::temp_dir().join(format!("liftb-junit-{}.xml", std::process::id()));
    let config = TbConfig {
        results_xml: Some(path.clone()),
        suite_name: "lif_core".into(),
        ..quiet()
    };
    let summary = Testbench::new(config, || LifNeuron::with_fault(Fault::Dead))
        .with_tests(lif_tests())
        .run()
        .unwrap();
    assert!(!summary.all_passed());

    let xml = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert!(xml.contains("lif_core"));
    assert!(xml.contains("lif_spikes_and_refractory_clears"));
    assert!(xml.contains("lif_no_spike_on_negative_current"));
    assert_eq!(xml.matches("<failure").count(), 1);
}

#[test]
fn unwritable_report_path_is_an_error() {
    let config = TbConfig {
        results_xml: Some(std::env::temp_dir().join("liftb-missing-dir").join("r.xml")),
        ..quiet()
    };
    let result = Testbench::new(config, LifNeuron::default)
        .with_tests(lif_tests())
        .run();
    assert!(matches!(result, Err(TbError::Report(_))));
}
