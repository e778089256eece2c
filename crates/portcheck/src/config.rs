use crate::simulation::TestbenchError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`TestbenchOptions::result_path`].
///
/// Only read by [`TestbenchOptions::apply_env`]. [`crate::run_testbench`]
/// takes its options as given, so library callers that want the override
/// call `apply_env` before the run.
pub const RESULT_PATH_ENV: &str = "RESULT_PATH";

/// Knobs of a testbench run.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// seed = 42
/// operations = 10
/// vcd = "run.vcd"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestbenchOptions {
    /// Seed of the master random generator.
    pub seed: u64,
    /// Number of randomized OR operations.
    pub operations: usize,
    /// Lower bound of the per-transaction delay, in rising edges.
    pub jitter_min: u32,
    /// Upper bound (inclusive) of the per-transaction delay.
    pub jitter_max: u32,
    /// Cycles between the operand writes and the read sweep.
    pub settle_cycles: u32,
    /// Idle cycles before the final verdict.
    pub drain_cycles: u32,
    /// Time the reset line is held in each phase of the reset pulse.
    pub reset_hold: u64,
    pub clock_period: u64,
    /// Issue the overflow writes and the status sweeps after them as bursts.
    pub burst_overflow: bool,
    /// Directory the coverage file is written to.
    pub result_path: PathBuf,
    pub coverage_file: String,
    /// Abort once simulated time passes this value.
    pub max_time: Option<u64>,
    /// Dump a waveform to this file.
    pub vcd: Option<PathBuf>,
}

impl Default for TestbenchOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            operations: 50,
            jitter_min: 1,
            jitter_max: 200,
            settle_cycles: 100,
            drain_cycles: 10,
            reset_hold: 20,
            clock_period: 10,
            burst_overflow: true,
            result_path: PathBuf::from("./"),
            coverage_file: "coverage.xml".to_string(),
            max_time: None,
            vcd: None,
        }
    }
}

impl TestbenchOptions {
    pub fn from_toml_str(s: &str) -> Result<Self, TestbenchError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TestbenchError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| TestbenchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Applies `RESULT_PATH` from the environment, if set.
    pub fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os(RESULT_PATH_ENV) {
            if !dir.is_empty() {
                self.result_path = PathBuf::from(dir);
            }
        }
    }

    /// Full path of the exported coverage file.
    pub fn coverage_path(&self) -> PathBuf {
        self.result_path.join(&self.coverage_file)
    }

    pub fn validate(&self) -> Result<(), TestbenchError> {
        if self.clock_period < 2 || !self.clock_period.is_multiple_of(2) {
            return Err(TestbenchError::Config(format!(
                "clock_period must be even and at least 2, got {}",
                self.clock_period
            )));
        }
        if self.jitter_min == 0 {
            return Err(TestbenchError::Config(
                "jitter_min must be at least one rising edge".to_string(),
            ));
        }
        if self.jitter_min > self.jitter_max {
            return Err(TestbenchError::Config(format!(
                "jitter range {}..={} is empty",
                self.jitter_min, self.jitter_max
            )));
        }
        if self.coverage_file.is_empty() {
            return Err(TestbenchError::Config(
                "coverage_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_run() {
        let options = TestbenchOptions::default();
        assert_eq!(options.operations, 50);
        assert_eq!((options.jitter_min, options.jitter_max), (1, 200));
        assert_eq!(options.coverage_path(), PathBuf::from("./coverage.xml"));
        options.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = TestbenchOptions::from_toml_str(
            r#"
            seed = 42
            operations = 3
            result_path = "out"
            "#,
        )
        .unwrap();
        assert_eq!(options.seed, 42);
        assert_eq!(options.operations, 3);
        assert_eq!(options.coverage_path(), PathBuf::from("out/coverage.xml"));
        assert_eq!(options.settle_cycles, 100);
        assert!(options.burst_overflow);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = TestbenchOptions::from_toml_str("sead = 1").unwrap_err();
        assert!(matches!(err, TestbenchError::ConfigParse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = TestbenchOptions::load(&path).unwrap_err();
        assert!(matches!(err, TestbenchError::Io { .. }));
    }

    #[test]
    fn result_path_env_overrides_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = TestbenchOptions::default();

        // SAFETY: no other test in this crate touches RESULT_PATH.
        unsafe { std::env::set_var(RESULT_PATH_ENV, dir.path()) };
        options.apply_env();
        unsafe { std::env::set_var(RESULT_PATH_ENV, "") };
        let mut untouched = TestbenchOptions::default();
        untouched.apply_env();
        unsafe { std::env::remove_var(RESULT_PATH_ENV) };

        assert_eq!(options.coverage_path(), dir.path().join("coverage.xml"));
        assert_eq!(untouched.coverage_path(), PathBuf::from("./coverage.xml"));
    }

    #[test]
    fn validate_rejects_bad_timing() {
        let odd = TestbenchOptions {
            clock_period: 7,
            ..Default::default()
        };
        assert!(odd.validate().is_err());

        let zero_jitter = TestbenchOptions {
            jitter_min: 0,
            ..Default::default()
        };
        assert!(zero_jitter.validate().is_err());

        let inverted = TestbenchOptions {
            jitter_min: 5,
            jitter_max: 4,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }
}
