// ── Simulation parameters ──
//
// The full input of one coverage prediction, grouped the way the planner
// form groups it. Every field is owned data so `Clone` is a deep copy.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::CoreError;

// ── Enumerations ────────────────────────────────────────────────────

/// ITM radio-climate regions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RadioClimate {
    Equatorial,
    ContinentalSubtropical,
    MaritimeSubtropical,
    Desert,
    #[default]
    ContinentalTemperate,
    MaritimeTemperateLand,
    MaritimeTemperateSea,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Polarization {
    Horizontal,
    #[default]
    Vertical,
}

/// Colormaps the service renders coverage with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColorScale {
    #[default]
    Plasma,
    Viridis,
    Inferno,
    Magma,
    Cividis,
    Turbo,
    Rainbow,
    Jet,
}

// ── Sections ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transmitter {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Transmit power in watts.
    pub power_watts: f64,
    pub frequency_mhz: f64,
    /// Antenna height above ground in meters.
    pub height_m: f64,
    pub gain_dbi: f64,
}

impl Default for Transmitter {
    fn default() -> Self {
        Self {
            name: "Transmitter".into(),
            latitude: 51.102_167,
            longitude: -114.098_667,
            power_watts: 0.1,
            frequency_mhz: 907.0,
            height_m: 2.0,
            gain_dbi: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Receiver {
    /// Weakest signal still drawn, in dBm.
    pub sensitivity_dbm: f64,
    pub height_m: f64,
    pub gain_dbi: f64,
    pub loss_db: f64,
}

impl Default for Receiver {
    fn default() -> Self {
        Self {
            sensitivity_dbm: -130.0,
            height_m: 1.0,
            gain_dbi: 2.0,
            loss_db: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub radio_climate: RadioClimate,
    pub polarization: Polarization,
    pub clutter_height_m: f64,
    pub ground_dielectric: f64,
    /// Siemens per meter.
    pub ground_conductivity: f64,
    /// N-units.
    pub atmosphere_bending: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            radio_climate: RadioClimate::default(),
            polarization: Polarization::default(),
            clutter_height_m: 1.0,
            ground_dielectric: 15.0,
            ground_conductivity: 0.005,
            atmosphere_bending: 301.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Percentage of locations the prediction should hold for.
    pub situation_fraction: f64,
    /// Percentage of time the prediction should hold for.
    pub time_fraction: f64,
    /// Model radius in kilometers.
    pub extent_km: f64,
    /// Use 1-arcsecond terrain tiles instead of 3-arcsecond.
    pub high_resolution: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            situation_fraction: 95.0,
            time_fraction: 95.0,
            extent_km: 30.0,
            high_resolution: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub color_scale: ColorScale,
    pub min_dbm: f64,
    pub max_dbm: f64,
    /// Overlay transparency in percent (0 = opaque).
    pub overlay_transparency: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            color_scale: ColorScale::default(),
            min_dbm: -130.0,
            max_dbm: -80.0,
            overlay_transparency: 50.0,
        }
    }
}

impl DisplaySettings {
    /// Overlay opacity in `[0, 1]` derived from the transparency percentage.
    pub fn opacity(&self) -> f64 {
        (1.0 - self.overlay_transparency / 100.0).clamp(0.0, 1.0)
    }
}

// ── SimulationParameters ────────────────────────────────────────────

/// Everything one coverage prediction needs.
///
/// A plain value: cloning produces a fully independent copy, which is
/// what lets a [`Site`](crate::Site) keep the exact parameters that
/// produced it while the caller keeps editing its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub transmitter: Transmitter,
    pub receiver: Receiver,
    pub environment: Environment,
    pub simulation: SimulationSettings,
    pub display: DisplaySettings,
}

impl SimulationParameters {
    /// Move the transmitter.
    pub fn set_tx_coords(&mut self, latitude: f64, longitude: f64) {
        self.transmitter.latitude = latitude;
        self.transmitter.longitude = longitude;
    }

    /// Check every field against the ranges the prediction service accepts.
    ///
    /// Returns the first violation as [`CoreError::Validation`].
    pub fn validate(&self) -> Result<(), CoreError> {
        let tx = &self.transmitter;
        ensure(
            "transmitter.latitude",
            tx.latitude,
            |v| (-90.0..=90.0).contains(&v),
            "between -90 and 90",
        )?;
        ensure(
            "transmitter.longitude",
            tx.longitude,
            |v| (-180.0..=180.0).contains(&v),
            "between -180 and 180",
        )?;
        ensure(
            "transmitter.power_watts",
            tx.power_watts,
            |v| v > 0.001,
            "greater than 0.001 (1 mW, 0 dBm)",
        )?;
        ensure(
            "transmitter.frequency_mhz",
            tx.frequency_mhz,
            |v| (20.0..=30_000.0).contains(&v),
            "between 20 and 30000",
        )?;
        ensure("transmitter.height_m", tx.height_m, |v| v >= 1.0, "at least 1")?;
        ensure("transmitter.gain_dbi", tx.gain_dbi, |v| v >= 0.0, "non-negative")?;

        let rx = &self.receiver;
        ensure("receiver.sensitivity_dbm", rx.sensitivity_dbm, |v| v <= 0.0, "at most 0")?;
        ensure("receiver.height_m", rx.height_m, |v| v >= 1.0, "at least 1")?;
        ensure("receiver.gain_dbi", rx.gain_dbi, |v| v >= 0.0, "non-negative")?;
        ensure("receiver.loss_db", rx.loss_db, |v| v >= 0.0, "non-negative")?;

        let env = &self.environment;
        ensure("environment.clutter_height_m", env.clutter_height_m, |v| v >= 0.0, "non-negative")?;
        ensure("environment.ground_dielectric", env.ground_dielectric, |v| v >= 1.0, "at least 1")?;
        ensure(
            "environment.ground_conductivity",
            env.ground_conductivity,
            |v| v >= 0.0,
            "non-negative",
        )?;
        ensure(
            "environment.atmosphere_bending",
            env.atmosphere_bending,
            |v| v >= 0.0,
            "non-negative",
        )?;

        let sim = &self.simulation;
        ensure(
            "simulation.situation_fraction",
            sim.situation_fraction,
            |v| v > 1.0 && v <= 100.0,
            "greater than 1 and at most 100",
        )?;
        ensure(
            "simulation.time_fraction",
            sim.time_fraction,
            |v| v > 1.0 && v <= 100.0,
            "greater than 1 and at most 100",
        )?;
        ensure("simulation.extent_km", sim.extent_km, |v| v >= 0.001, "at least 0.001 (1 m)")?;

        let display = &self.display;
        ensure("display.min_dbm", display.min_dbm, |_| true, "finite")?;
        ensure(
            "display.max_dbm",
            display.max_dbm,
            |v| v > display.min_dbm,
            "greater than display.min_dbm",
        )?;
        ensure(
            "display.overlay_transparency",
            display.overlay_transparency,
            |v| (0.0..=100.0).contains(&v),
            "between 0 and 100",
        )?;

        Ok(())
    }
}

fn ensure(
    field: &str,
    value: f64,
    valid: impl Fn(f64) -> bool,
    expected: &str,
) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::Validation {
            field: field.into(),
            reason: format!("must be a finite number, got {value}"),
        });
    }
    if valid(value) {
        Ok(())
    } else {
        Err(CoreError::Validation {
            field: field.into(),
            reason: format!("must be {expected}, got {value}"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimulationParameters::default().validate().unwrap();
    }

    #[test]
    fn clone_is_independent() {
        let original = SimulationParameters::default();
        let mut copy = original.clone();
        copy.transmitter.name = "Hilltop".into();
        copy.set_tx_coords(10.0, 20.0);
        copy.environment.radio_climate = RadioClimate::Desert;

        assert_eq!(original, SimulationParameters::default());
        assert_ne!(original, copy);
    }

    #[test]
    fn out_of_range_frequency_names_field() {
        let mut params = SimulationParameters::default();
        params.transmitter.frequency_mhz = 45_000.0;

        match params.validate().unwrap_err() {
            CoreError::Validation { field, reason } => {
                assert_eq!(field, "transmitter.frequency_mhz");
                assert!(reason.contains("between 20 and 30000"), "{reason}");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn power_must_stay_above_zero_dbm() {
        let mut params = SimulationParameters::default();
        for watts in [0.0, 0.0005, 0.001] {
            params.transmitter.power_watts = watts;
            match params.validate() {
                Err(CoreError::Validation { field, .. }) => {
                    assert_eq!(field, "transmitter.power_watts");
                }
                other => panic!("{watts} W should be rejected, got {other:?}"),
            }
        }

        params.transmitter.power_watts = 0.002;
        params.validate().unwrap();
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut params = SimulationParameters::default();
        params.receiver.gain_dbi = f64::NAN;
        assert!(matches!(
            params.validate(),
            Err(CoreError::Validation { ref field, .. }) if field == "receiver.gain_dbi"
        ));
    }

    #[test]
    fn inverted_dbm_range_is_rejected() {
        let mut params = SimulationParameters::default();
        params.display.min_dbm = -60.0;
        params.display.max_dbm = -90.0;
        assert!(matches!(
            params.validate(),
            Err(CoreError::Validation { ref field, .. }) if field == "display.max_dbm"
        ));
    }

    #[test]
    fn opacity_follows_transparency() {
        let mut display = DisplaySettings::default();
        assert!((display.opacity() - 0.5).abs() < f64::EPSILON);
        display.overlay_transparency = 0.0;
        assert!((display.opacity() - 1.0).abs() < f64::EPSILON);
        display.overlay_transparency = 100.0;
        assert!(display.opacity().abs() < f64::EPSILON);
    }

    #[test]
    fn enum_names_match_wire_values() {
        assert_eq!(RadioClimate::MaritimeTemperateLand.as_ref(), "maritime_temperate_land");
        assert_eq!(Polarization::Horizontal.to_string(), "horizontal");
        assert_eq!(ColorScale::from_str("turbo").unwrap(), ColorScale::Turbo);
        assert_eq!(RadioClimate::iter().count(), 7);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let params: SimulationParameters = serde_json::from_value(serde_json::json!({
            "transmitter": { "name": "Ridge", "power_watts": 1.0 },
            "environment": { "radio_climate": "desert" }
        }))
        .unwrap();

        assert_eq!(params.transmitter.name, "Ridge");
        assert!((params.transmitter.power_watts - 1.0).abs() < f64::EPSILON);
        assert!((params.transmitter.frequency_mhz - 907.0).abs() < f64::EPSILON);
        assert_eq!(params.environment.radio_climate, RadioClimate::Desert);
        assert_eq!(params.display, DisplaySettings::default());
    }
}
