use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::consts;
use crate::error::FmError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Copy)]
pub enum RegularizationNorm {
    L1 = 1,
    L2 = 2,
}

impl FromStr for RegularizationNorm {
    type Err = FmError;

    fn from_str(s: &str) -> Result<RegularizationNorm, FmError> {
        // "1"/"2" are accepted for compatibility with the numeric form of the option
        match s.to_lowercase().as_str() {
            "l1" | "1" => Ok(RegularizationNorm::L1),
            "l2" | "2" => Ok(RegularizationNorm::L2),
            _ => Err(FmError::Configuration(format!(
                "--regularization_norm only supports l1 or l2, got \"{}\"",
                s
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModelInstance {
    pub fm_degree: u32,
    pub factor_size: u32,
    pub regularization_factor: f32,
    pub learning_rate: f32,
    pub partial_fm: bool,
    pub init_std_dev: f32,
    pub regularization_norm: RegularizationNorm,
    pub mini_batch_size: usize,
    pub iteration_count: u32,

    // 0.0 reduces the L2 update to plain SGD
    #[serde(default = "default_f32_zero")]
    pub momentum_factor: f32,
    #[serde(default = "default_burn_in_iterations")]
    pub burn_in_iterations: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_f32_zero() -> f32 {
    0.0
}
fn default_burn_in_iterations() -> u32 {
    consts::DEFAULT_BURN_IN_ITERATIONS
}

fn parse_value<T: FromStr>(cl: &clap::ArgMatches, name: &str) -> Result<Option<T>, FmError> {
    match cl.value_of(name) {
        Some(val) => match val.parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => Err(FmError::Configuration(format!(
                "--{} expects a number, got \"{}\"",
                name, val
            ))),
        },
        None => Ok(None),
    }
}

impl ModelInstance {
    pub fn new_empty() -> ModelInstance {
        ModelInstance {
            fm_degree: consts::DEFAULT_FM_DEGREE,
            factor_size: consts::DEFAULT_FACTOR_SIZE,
            regularization_factor: 0.0,
            learning_rate: consts::DEFAULT_LEARNING_RATE,
            partial_fm: false,
            init_std_dev: consts::DEFAULT_INIT_STD_DEV,
            regularization_norm: RegularizationNorm::L2,
            mini_batch_size: consts::DEFAULT_MINI_BATCH_SIZE,
            iteration_count: consts::DEFAULT_ITERATION_COUNT,
            momentum_factor: 0.0,
            burn_in_iterations: consts::DEFAULT_BURN_IN_ITERATIONS,
            seed: None,
        }
    }

    pub fn new_from_cmdline(cl: &clap::ArgMatches) -> Result<ModelInstance, FmError> {
        let mut mi = ModelInstance::new_empty();

        if let Some(val) = parse_value(cl, "fm_degree")? {
            mi.fm_degree = val;
        }
        if let Some(val) = parse_value(cl, "factor_size")? {
            mi.factor_size = val;
        }
        if let Some(val) = parse_value(cl, "regularization_factor")? {
            mi.regularization_factor = val;
        }
        if let Some(val) = parse_value(cl, "learning_rate")? {
            mi.learning_rate = val;
        }
        if cl.is_present("partial_fm") {
            mi.partial_fm = true;
        }
        if let Some(val) = parse_value(cl, "init_std_dev")? {
            mi.init_std_dev = val;
        }
        if let Some(val) = cl.value_of("regularization_norm") {
            mi.regularization_norm = val.parse()?;
        }
        if let Some(val) = parse_value(cl, "mini_batch_size")? {
            mi.mini_batch_size = val;
        }
        if let Some(val) = parse_value(cl, "iteration_count")? {
            mi.iteration_count = val;
        }
        if let Some(val) = parse_value(cl, "momentum")? {
            mi.momentum_factor = val;
        }
        if let Some(val) = parse_value(cl, "burn_in")? {
            mi.burn_in_iterations = val;
        }
        if let Some(val) = parse_value(cl, "seed")? {
            mi.seed = Some(val);
        }

        mi.validate()?;
        Ok(mi)
    }

    pub fn validate(&self) -> Result<(), FmError> {
        if self.fm_degree < 1 || self.fm_degree > consts::MAX_FM_DEGREE {
            return Err(FmError::Configuration(format!(
                "--fm_degree should be in [1, {}], got {}",
                consts::MAX_FM_DEGREE,
                self.fm_degree
            )));
        }
        if self.factor_size == 0 {
            return Err(FmError::Configuration(
                "--factor_size should be > 0".to_string(),
            ));
        }
        check_non_negative("regularization_factor", self.regularization_factor)?;
        check_non_negative("learning_rate", self.learning_rate)?;
        check_non_negative("init_std_dev", self.init_std_dev)?;
        check_non_negative("momentum", self.momentum_factor)?;
        if self.momentum_factor >= 1.0 {
            return Err(FmError::Configuration(format!(
                "--momentum should be < 1.0, got {}",
                self.momentum_factor
            )));
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f32) -> Result<(), FmError> {
    if !value.is_finite() || value < 0.0 {
        return Err(FmError::Configuration(format!(
            "--{} should be a finite number >= 0, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdline;

    fn mi_from_args(args: &[&str]) -> Result<ModelInstance, FmError> {
        let mut words = vec!["fm", "-d", "train.txt"];
        words.extend_from_slice(args);
        let cl = cmdline::create_expected_args().get_matches_from(words);
        ModelInstance::new_from_cmdline(&cl)
    }

    #[test]
    fn test_defaults() {
        let mi = mi_from_args(&[]).unwrap();
        assert_eq!(mi.fm_degree, 2);
        assert_eq!(mi.factor_size, 3);
        assert_eq!(mi.learning_rate, 0.01);
        assert_eq!(mi.regularization_norm, RegularizationNorm::L2);
        assert_eq!(mi.mini_batch_size, 200);
        assert_eq!(mi.iteration_count, 200);
        assert!(!mi.partial_fm);
        assert_eq!(mi.seed, None);
    }

    #[test]
    fn test_cmdline_parsing() {
        let mi = mi_from_args(&[
            "--fm_degree",
            "3",
            "--factor_size",
            "8",
            "--regularization_norm",
            "L1",
            "--regularization_factor",
            "0.5",
            "--partial_fm",
            "--mini_batch_size",
            "0",
            "--iteration_count",
            "7",
            "--seed",
            "42",
        ])
        .unwrap();
        assert_eq!(mi.fm_degree, 3);
        assert_eq!(mi.factor_size, 8);
        assert_eq!(mi.regularization_norm, RegularizationNorm::L1);
        assert_eq!(mi.regularization_factor, 0.5);
        assert!(mi.partial_fm);
        assert_eq!(mi.mini_batch_size, 0);
        assert_eq!(mi.iteration_count, 7);
        assert_eq!(mi.seed, Some(42));
    }

    #[test]
    fn test_invalid_values() {
        assert!(mi_from_args(&["--fm_degree", "0"]).is_err());
        assert!(mi_from_args(&["--fm_degree", "11"]).is_err());
        assert!(mi_from_args(&["--factor_size", "0"]).is_err());
        assert!(mi_from_args(&["--learning_rate", "-0.1"]).is_err());
        assert!(mi_from_args(&["--init_std_dev", "abc"]).is_err());
        assert!(mi_from_args(&["--regularization_norm", "l3"]).is_err());
        assert!(mi_from_args(&["--mini_batch_size", "-1"]).is_err());
        assert!(mi_from_args(&["--momentum", "1.0"]).is_err());

        match mi_from_args(&["--factor_size", "0"]) {
            Err(FmError::Configuration(msg)) => assert!(msg.contains("factor_size")),
            _ => panic!("expected a configuration error"),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let mut mi = ModelInstance::new_empty();
        mi.regularization_norm = RegularizationNorm::L1;
        let s = serde_json::to_string(&mi).unwrap();
        let mi2: ModelInstance = serde_json::from_str(&s).unwrap();
        assert_eq!(mi2.regularization_norm, RegularizationNorm::L1);
        assert_eq!(mi2.factor_size, mi.factor_size);
    }
}
