use std::path::PathBuf;
use std::str::FromStr;

use crate::TbError;

/// Testbench settings. Everything here is environment; the reset timing and the
/// edge budgets of the scenarios are part of the protocol and not configurable.
#[derive(Debug, Clone, PartialEq)]
pub struct TbConfig {
    /// Clock period in ns.
    pub clock_period_ns: u32,
    /// Simulation time step as a power of ten seconds (-12 is 1ps).
    pub precision: i8,
    /// A scenario still running at this simulation time fails.
    pub max_sim_time_ns: u64,
    /// Where to write the JUnit report, if anywhere.
    pub results_xml: Option<PathBuf>,
    pub quiet: bool,
    pub suite_name: String,
}

impl Default for TbConfig {
    fn default() -> Self {
        Self {
            clock_period_ns: 10,
            precision: -12,
            max_sim_time_ns: 1_000_000,
            results_xml: None,
            quiet: false,
            suite_name: crate::CRATE_NAME
                .get()
                .cloned()
                .unwrap_or_else(|| "liftb".to_string()),
        }
    }
}

impl TbConfig {
    /// Defaults overridden by `LIFTB_*` environment variables.
    pub fn from_env() -> Result<Self, TbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TbError> {
        let mut config = TbConfig::default();
        if let Some(v) = lookup("LIFTB_CLOCK_PERIOD_NS") {
            config.clock_period_ns = parse("LIFTB_CLOCK_PERIOD_NS", &v)?;
        }
        if let Some(v) = lookup("LIFTB_MAX_SIM_TIME_NS") {
            config.max_sim_time_ns = parse("LIFTB_MAX_SIM_TIME_NS", &v)?;
        }
        if let Some(v) = lookup("LIFTB_RESULTS_XML") {
            config.results_xml = match v.trim() {
                "" | "none" => None,
                path => Some(PathBuf::from(path)),
            };
        }
        if let Some(v) = lookup("LIFTB_QUIET") {
            config.quiet = parse_bool("LIFTB_QUIET", &v)?;
        }
        if let Some(v) = lookup("LIFTB_SUITE") {
            config.suite_name = v;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TbError> {
        if self.clock_period_ns < 2 {
            return Err(TbError::Config(format!(
                "clock period must be at least 2ns, got {}ns",
                self.clock_period_ns
            )));
        }
        // the clock period is given in whole ns, so anything coarser can't place its edges
        if !(-15..=-9).contains(&self.precision) {
            return Err(TbError::Config(format!(
                "precision 1e{}s must be between 1fs and 1ns",
                self.precision
            )));
        }
        if self.max_sim_time_ns == 0 {
            return Err(TbError::Config("maximum simulation time is zero".into()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, TbError> {
    value
        .trim()
        .parse()
        .map_err(|_| TbError::Config(format!("{}={:?} is not a valid number", key, value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, TbError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(TbError::Config(format!("{}={:?} is not a boolean", key, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_clock() {
        let config = TbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.clock_period_ns, 10);
        assert_eq!(config.results_xml, None);
        assert!(!config.quiet);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = TbConfig::from_lookup(lookup(&[
            ("LIFTB_CLOCK_PERIOD_NS", "20"),
            ("LIFTB_MAX_SIM_TIME_NS", "5000"),
            ("LIFTB_RESULTS_XML", "out/results.xml"),
            ("LIFTB_QUIET", "yes"),
            ("LIFTB_SUITE", "lif_core"),
        ]))
        .unwrap();
        assert_eq!(config.clock_period_ns, 20);
        assert_eq!(config.max_sim_time_ns, 5000);
        assert_eq!(config.results_xml, Some(PathBuf::from("out/results.xml")));
        assert!(config.quiet);
        assert_eq!(config.suite_name, "lif_core");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = TbConfig::from_lookup(lookup(&[("LIFTB_CLOCK_PERIOD_NS", "fast")])).unwrap_err();
        assert!(matches!(err, TbError::Config(_)));
        assert!(TbConfig::from_lookup(lookup(&[("LIFTB_CLOCK_PERIOD_NS", "1")])).is_err());
        assert!(TbConfig::from_lookup(lookup(&[("LIFTB_QUIET", "maybe")])).is_err());
    }

    #[test]
    fn precision_must_resolve_whole_nanoseconds() {
        for precision in [-15, -12, -9] {
            let config = TbConfig {
                precision,
                ..TbConfig::default()
            };
            assert_eq!(config.validate(), Ok(()));
        }
        for precision in [-6, -3, 0, -16] {
            let config = TbConfig {
                precision,
                ..TbConfig::default()
            };
            assert!(matches!(config.validate(), Err(TbError::Config(_))));
        }
    }

    #[test]
    fn results_xml_can_be_disabled() {
        let config = TbConfig::from_lookup(lookup(&[("LIFTB_RESULTS_XML", "none")])).unwrap();
        assert_eq!(config.results_xml, None);
    }
}
