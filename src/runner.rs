//! Runs a list of tests one after another, each against a new device instance,
//! and reports the results.

use std::time;

use num_format::{Locale, ToFormattedString};
use prettytable::{row, Table};

use crate::config::TbConfig;
use crate::device::Device;
use crate::junit;
use crate::sim::Sim;
use crate::test::{TbTests, Test, TestFn};
use crate::{TbError, TbResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub name: String,
    pub result: TbResult,
    /// Wall clock time spent on the test.
    pub time_secs: f64,
    pub sim_time_ns: f64,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }

    pub fn message(&self) -> String {
        match &self.result {
            Ok(val) => val.to_string(),
            Err(err) => err.to_string(),
        }
    }

    fn sim_speed(&self) -> f64 {
        self.sim_time_ns / self.time_secs
    }
}

/// Runs `test` to completion on `device`.
pub fn run_test(config: &TbConfig, device: Box<dyn Device>, test: &Test) -> TestReport {
    let sim = Sim::new(device, config);
    let time_start = time::Instant::now();
    let result = sim.run_test(test.generator, &test.name);
    TestReport {
        name: test.name.clone(),
        result,
        time_secs: time_start.elapsed().as_secs_f64(),
        sim_time_ns: sim.sim_time("ns"),
    }
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub reports: Vec<TestReport>,
    pub real_time_secs: f64,
    pub sim_time_ns: f64,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(TestReport::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TestReport> {
        self.reports.iter().filter(|r| !r.passed())
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_titles(row!["TEST", "RESULT", "SIM TIME (ns)", "REAL TIME (s)", "MESSAGE"]);
        for r in &self.reports {
            table.add_row(row![
                r.name,
                if r.passed() { "PASS" } else { "FAIL" },
                r.sim_time_ns,
                format!("{:.3}", r.time_secs),
                r.message()
            ]);
        }
        table
    }
}

/// A device factory plus the tests to run against it.
pub struct Testbench<F> {
    config: TbConfig,
    factory: F,
    tests: TbTests,
}

impl<F, D> Testbench<F>
where
    F: Fn() -> D,
    D: Device + 'static,
{
    pub fn new(config: TbConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            tests: TbTests::new(),
        }
    }

    pub fn add_test(mut self, name: &str, generator: TestFn) -> Self {
        self.tests.push(Test::new(name, generator));
        self
    }

    pub fn with_tests(mut self, tests: TbTests) -> Self {
        self.tests.extend(tests.iter().cloned());
        self
    }

    pub fn config(&self) -> &TbConfig {
        &self.config
    }

    /// Runs every test in order. Test failures end up in the summary; only
    /// an invalid configuration or an unwritable report is an `Err`.
    pub fn run(&self) -> Result<Summary, TbError> {
        self.config.validate()?;
        let start = time::Instant::now();
        let reports: Vec<_> = self
            .tests
            .iter()
            .map(|test| run_test(&self.config, Box::new((self.factory)()), test))
            .collect();
        let summary = Summary {
            sim_time_ns: reports.iter().map(|r| r.sim_time_ns).sum(),
            real_time_secs: start.elapsed().as_secs_f64(),
            reports,
        };
        self.end_of_simulation(&summary)?;
        Ok(summary)
    }

    fn end_of_simulation(&self, summary: &Summary) -> Result<(), TbError> {
        if !self.config.quiet {
            for r in &summary.reports {
                println!(
                    "TEST {}: Result={}, Time={:.3}, SimTime={}ns, SimSpeed={:.3}ns/s",
                    r.name,
                    if r.passed() { "passed" } else { "failed" },
                    r.time_secs,
                    (r.sim_time_ns as u64).to_formatted_string(&Locale::en),
                    r.sim_speed()
                );
            }
            println!("TOTAL SIMULATION");
            println!(
                "Simulation time: {} ns",
                (summary.sim_time_ns as u64).to_formatted_string(&Locale::en)
            );
            println!("Real time: {:.3} s", summary.real_time_secs);
            println!(
                "Simulation speed: {:.3} ns/s",
                summary.sim_time_ns / summary.real_time_secs
            );
            summary.table().printstd();
        }
        if let Some(path) = &self.config.results_xml {
            junit::write_junit_xml(path, &self.config.suite_name, &summary.reports)?;
        }
        Ok(())
    }
}
