//! Model parameters. Every field has a default, so a parameters file only needs to name the
//! values it overrides:
//!
//! ```json
//! { "grid_size": 4, "percent_showers": 0.5, "infestation_cap": 50 }
//! ```
//!
//! Times are in days. Fields named `percent_*` and `probability_*` are fractions in `[0, 1]`.

use std::fs;
use std::path::Path;

use log::trace;
use serde_derive::{Deserialize, Serialize};

use crate::error::SimError;

/// What the loop does when a shelter ledger or schedule cache check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvariantMode {
    /// Panic at the offending event.
    Fatal,
    /// Log at `error!` and keep running.
    Log,
    /// Skip the per-event ledger and schedule checks. A clock moving backwards is still
    /// logged.
    Off,
}

impl Default for InvariantMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            InvariantMode::Fatal
        } else {
            InvariantMode::Log
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Seed for shelter grid generation. `-1` requests a random seed.
    pub seed: i64,
    pub grid_size: usize,
    /// Maximum distance, in cells, a host travels in one move.
    pub field_of_view: usize,

    pub percent_formal_shelters: f64,
    pub percent_showers: f64,
    pub percent_laundry: f64,
    pub percent_medical: f64,
    pub percent_intake_delousing: f64,
    pub formal_capacity_min: usize,
    pub formal_capacity_max: usize,
    pub informal_capacity_min: usize,
    pub informal_capacity_max: usize,

    pub mean_time_between_host_moves: f64,
    pub mean_time_between_interactions: f64,
    pub mean_time_between_vector_moves: f64,

    /// Initially infected hosts were infected this many days before the start.
    pub days_since_infected_min: f64,
    pub days_since_infected_max: f64,
    pub percent_hosts_with_clothes_change: f64,
    /// Lice placed on each initially infested host.
    pub infestation_min: usize,
    pub infestation_max: usize,
    /// Most live vectors a single host can carry.
    pub infestation_cap: usize,
    /// Most live vectors the whole population can hold.
    pub max_vectors: usize,

    pub probability_louse_transfer: f64,
    pub transfer_fraction_min: f64,
    pub transfer_fraction_max: f64,
    /// Daily infection hazard contributed by each infected louse on a host.
    pub probability_infested_is_infected: f64,
    pub probability_infected_host_dies: f64,
    pub probability_treatment: f64,
    pub continuous_antibiotic_monitoring: bool,
    pub time_to_transmissibility_min: f64,
    pub time_to_transmissibility_max: f64,
    pub treatment_length_min: f64,
    pub treatment_length_max: f64,

    pub percent_females: f64,
    pub probability_feeding: f64,
    pub probability_unhosted_starves: f64,
    pub meal_duration_max: f64,
    pub eggs_per_day_min: f64,
    pub eggs_per_day_max: f64,
    pub nit_gestation_min: f64,
    pub nit_gestation_max: f64,
    pub mean_time_to_adult: f64,
    pub std_dev_time_to_adult: f64,
    pub louse_longevity_mean: f64,
    pub louse_longevity_std_dev: f64,
    pub louse_off_host_survival_min: f64,
    pub louse_off_host_survival_max: f64,
    pub nit_off_host_survival_min: f64,
    pub nit_off_host_survival_max: f64,
    pub probability_infected_by_feeding: f64,
    pub probability_removed_by_grooming: f64,
    pub probability_louse_rehosts: f64,

    pub invariant_mode: InvariantMode,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            seed: 8_675_309,
            grid_size: 8,
            field_of_view: 3,

            percent_formal_shelters: 0.2,
            percent_showers: 0.0,
            percent_laundry: 0.0,
            percent_medical: 0.0,
            percent_intake_delousing: 0.0,
            formal_capacity_min: 5,
            formal_capacity_max: 20,
            informal_capacity_min: 1,
            informal_capacity_max: 10,

            mean_time_between_host_moves: 1.0,
            mean_time_between_interactions: 3.0,
            mean_time_between_vector_moves: 0.2,

            days_since_infected_min: 0.0,
            days_since_infected_max: 20.0,
            percent_hosts_with_clothes_change: 0.0,
            infestation_min: 5,
            infestation_max: 20,
            infestation_cap: 30,
            max_vectors: 1_000_000,

            probability_louse_transfer: 0.3,
            transfer_fraction_min: 0.07,
            transfer_fraction_max: 0.2,
            probability_infested_is_infected: 0.1,
            probability_infected_host_dies: 0.0001,
            probability_treatment: 0.0,
            continuous_antibiotic_monitoring: false,
            time_to_transmissibility_min: 15.0,
            time_to_transmissibility_max: 25.0,
            treatment_length_min: 14.0,
            treatment_length_max: 21.0,

            percent_females: 0.7,
            probability_feeding: 0.13,
            probability_unhosted_starves: 0.15,
            meal_duration_max: 0.024,
            eggs_per_day_min: 2.0,
            eggs_per_day_max: 10.0,
            nit_gestation_min: 6.0,
            nit_gestation_max: 9.0,
            mean_time_to_adult: 12.81,
            std_dev_time_to_adult: 0.67,
            louse_longevity_mean: 17.6,
            louse_longevity_std_dev: 8.6,
            louse_off_host_survival_min: 1.0,
            louse_off_host_survival_max: 2.0,
            nit_off_host_survival_min: 6.0,
            nit_off_host_survival_max: 8.0,
            probability_infected_by_feeding: 0.6,
            probability_removed_by_grooming: 0.65,
            probability_louse_rehosts: 0.03,

            invariant_mode: InvariantMode::default(),
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), SimError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::ConfigError(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(
    name: &str,
    min: T,
    max: T,
) -> Result<(), SimError> {
    if min > max {
        Err(SimError::ConfigError(format!(
            "{name}: max ({max}) is less than min ({min})"
        )))
    } else {
        Ok(())
    }
}

fn check_non_negative_range(name: &str, min: f64, max: f64) -> Result<(), SimError> {
    if min < 0.0 || min.is_nan() {
        return Err(SimError::ConfigError(format!(
            "{name}: min must be non-negative, got {min}"
        )));
    }
    check_range(name, min, max)
}

fn check_positive(name: &str, value: f64) -> Result<(), SimError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimError::ConfigError(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

impl Parameters {
    /// Reads parameters from a JSON file. Missing fields take their defaults; unknown fields
    /// are an error. The result is validated before it is returned.
    ///
    /// # Errors
    /// Returns a `SimError` if the file cannot be read or parsed, or fails [`Self::validate`].
    pub fn load(path: &Path) -> Result<Self, SimError> {
        trace!("loading parameters from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// # Errors
    /// Returns a `SimError` if the text does not parse or fails [`Self::validate`].
    pub fn from_json(contents: &str) -> Result<Self, SimError> {
        let parameters: Parameters = serde_json::from_str(contents)?;
        parameters.validate()?;
        Ok(parameters)
    }

    /// Rejects inconsistent configurations before any simulation state is built.
    ///
    /// # Errors
    /// Returns `SimError::ConfigError` naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.grid_size == 0 {
            return Err(SimError::ConfigError("grid_size must be positive".into()));
        }
        if self.field_of_view == 0 {
            return Err(SimError::ConfigError("field_of_view must be positive".into()));
        }
        if self.formal_capacity_min == 0 || self.informal_capacity_min == 0 {
            return Err(SimError::ConfigError(
                "shelter capacities must be at least 1".into(),
            ));
        }

        for (name, value) in [
            ("percent_formal_shelters", self.percent_formal_shelters),
            ("percent_showers", self.percent_showers),
            ("percent_laundry", self.percent_laundry),
            ("percent_medical", self.percent_medical),
            ("percent_intake_delousing", self.percent_intake_delousing),
            (
                "percent_hosts_with_clothes_change",
                self.percent_hosts_with_clothes_change,
            ),
            ("probability_louse_transfer", self.probability_louse_transfer),
            ("transfer_fraction_min", self.transfer_fraction_min),
            ("transfer_fraction_max", self.transfer_fraction_max),
            (
                "probability_infested_is_infected",
                self.probability_infested_is_infected,
            ),
            (
                "probability_infected_host_dies",
                self.probability_infected_host_dies,
            ),
            ("probability_treatment", self.probability_treatment),
            ("percent_females", self.percent_females),
            ("probability_feeding", self.probability_feeding),
            (
                "probability_unhosted_starves",
                self.probability_unhosted_starves,
            ),
            (
                "probability_infected_by_feeding",
                self.probability_infected_by_feeding,
            ),
            (
                "probability_removed_by_grooming",
                self.probability_removed_by_grooming,
            ),
            ("probability_louse_rehosts", self.probability_louse_rehosts),
        ] {
            check_probability(name, value)?;
        }

        check_range(
            "formal_capacity",
            self.formal_capacity_min,
            self.formal_capacity_max,
        )?;
        check_range(
            "informal_capacity",
            self.informal_capacity_min,
            self.informal_capacity_max,
        )?;
        check_range("infestation", self.infestation_min, self.infestation_max)?;
        check_range(
            "transfer_fraction",
            self.transfer_fraction_min,
            self.transfer_fraction_max,
        )?;
        for (name, min, max) in [
            (
                "days_since_infected",
                self.days_since_infected_min,
                self.days_since_infected_max,
            ),
            (
                "time_to_transmissibility",
                self.time_to_transmissibility_min,
                self.time_to_transmissibility_max,
            ),
            (
                "treatment_length",
                self.treatment_length_min,
                self.treatment_length_max,
            ),
            ("eggs_per_day", self.eggs_per_day_min, self.eggs_per_day_max),
            (
                "nit_gestation",
                self.nit_gestation_min,
                self.nit_gestation_max,
            ),
            (
                "louse_off_host_survival",
                self.louse_off_host_survival_min,
                self.louse_off_host_survival_max,
            ),
            (
                "nit_off_host_survival",
                self.nit_off_host_survival_min,
                self.nit_off_host_survival_max,
            ),
            ("meal_duration", 0.0, self.meal_duration_max),
        ] {
            check_non_negative_range(name, min, max)?;
        }

        for (name, value) in [
            (
                "mean_time_between_host_moves",
                self.mean_time_between_host_moves,
            ),
            (
                "mean_time_between_interactions",
                self.mean_time_between_interactions,
            ),
            (
                "mean_time_between_vector_moves",
                self.mean_time_between_vector_moves,
            ),
            ("mean_time_to_adult", self.mean_time_to_adult),
            ("louse_longevity_mean", self.louse_longevity_mean),
        ] {
            check_positive(name, value)?;
        }
        for (name, value) in [
            ("std_dev_time_to_adult", self.std_dev_time_to_adult),
            ("louse_longevity_std_dev", self.louse_longevity_std_dev),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(SimError::ConfigError(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_valid() {
        assert!(Parameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let parameters = Parameters {
            treatment_length_min: 21.0,
            treatment_length_max: 14.0,
            ..Parameters::default()
        };
        let err = parameters.validate().unwrap_err();
        assert!(matches!(err, SimError::ConfigError(msg) if msg.contains("treatment_length")));
    }

    #[test]
    fn rejects_bad_probability() {
        let parameters = Parameters {
            probability_feeding: 1.5,
            ..Parameters::default()
        };
        assert!(matches!(
            parameters.validate(),
            Err(SimError::ConfigError(msg)) if msg.contains("probability_feeding")
        ));
    }

    #[test]
    fn rejects_zero_grid_and_non_positive_means() {
        let parameters = Parameters {
            grid_size: 0,
            ..Parameters::default()
        };
        assert!(parameters.validate().is_err());

        let parameters = Parameters {
            mean_time_between_vector_moves: 0.0,
            ..Parameters::default()
        };
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let parameters =
            Parameters::from_json(r#"{ "grid_size": 4, "invariant_mode": "log" }"#).unwrap();
        assert_eq!(parameters.grid_size, 4);
        assert_eq!(parameters.invariant_mode, InvariantMode::Log);
        assert_eq!(parameters.infestation_cap, 30);

        let parameters = Parameters::from_json(r#"{ "invariant_mode": "off" }"#).unwrap();
        assert_eq!(parameters.invariant_mode, InvariantMode::Off);
    }

    #[test]
    fn unknown_field_is_rejected() {
        assert!(matches!(
            Parameters::from_json(r#"{ "grid_sise": 4 }"#),
            Err(SimError::JsonError(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "seed": 42, "percent_laundry": 1.0 }}"#).unwrap();
        let parameters = Parameters::load(file.path()).unwrap();
        assert_eq!(parameters.seed, 42);
        assert!((parameters.percent_laundry - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_invalid_values_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "eggs_per_day_min": 12.0 }}"#).unwrap();
        assert!(matches!(
            Parameters::load(file.path()),
            Err(SimError::ConfigError(_))
        ));
    }
}
