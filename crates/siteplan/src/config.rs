//! Profile resolution and parameter assembly for the CLI.
//!
//! The TOML schema lives in `siteplan-config`; this module layers global
//! flags over the chosen profile and turns `ParamOverrides` into
//! concrete `SimulationParameters`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use strum::IntoEnumIterator;

use siteplan_config::{Config, Defaults, Profile};
use siteplan_core::{ColorScale, PlannerConfig, Polarization, RadioClimate, SimulationParameters};

use crate::cli::{GlobalOpts, ParamOverrides};
use crate::error::CliError;

/// Overlay directory used when neither the flag nor the config names one.
const DEFAULT_OUT_DIR: &str = "overlays";

// ── Profile resolution ───────────────────────────────────────────────

/// A profile with global flag overrides applied.
#[derive(Debug)]
pub struct Session {
    /// `None` for an ad-hoc `--service` session.
    pub profile_name: Option<String>,
    pub profile: Profile,
    pub defaults: Defaults,
}

impl Session {
    pub fn planner_config(&self) -> Result<PlannerConfig, CliError> {
        Ok(siteplan_config::profile_to_planner_config(
            &self.profile,
            &self.defaults,
        )?)
    }

    pub fn parameters(&self) -> SimulationParameters {
        self.profile.parameters_or_default()
    }

    /// `--out-dir`, then `[defaults] out_dir`, then `./overlays`.
    pub fn out_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.defaults.out_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR))
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Pick the profile to talk to and apply `--service`, `--insecure` and
/// `--timeout` on top of it.
///
/// Without a matching profile, `--service` alone is enough for an ad-hoc
/// session. An explicitly requested profile that doesn't exist is an
/// error even when `--service` is set.
pub fn resolve_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = siteplan_config::load_config()?;
    let name = active_profile_name(global, &cfg);

    let (profile_name, mut profile) = match cfg.profiles.get(&name) {
        Some(profile) => (Some(name), profile.clone()),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name,
                available: cfg.profile_names(),
            });
        }
        None => {
            let service = global.service.clone().ok_or_else(|| CliError::NoConfig {
                path: siteplan_config::config_path().display().to_string(),
            })?;
            (None, Profile::new(service))
        }
    };

    if let Some(ref service) = global.service {
        profile.service.clone_from(service);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    Ok(Session {
        profile_name,
        profile,
        defaults: cfg.defaults,
    })
}

/// Parameters to start from when no service is needed: the active
/// profile's, or the built-in defaults when there is no profile.
pub fn base_parameters(global: &GlobalOpts) -> Result<SimulationParameters, CliError> {
    match resolve_session(global) {
        Ok(session) => Ok(session.parameters()),
        Err(CliError::NoConfig { .. }) => Ok(SimulationParameters::default()),
        Err(e) => Err(e),
    }
}

// ── Parameter assembly ───────────────────────────────────────────────

/// Build the parameter sets for one invocation.
///
/// A `--params` file holding a JSON array yields one set per element;
/// each file entry is merged over `base`, so partial objects are fine.
/// Flag overrides apply to every set.
pub fn build_parameters(
    base: &SimulationParameters,
    overrides: &ParamOverrides,
) -> Result<Vec<SimulationParameters>, CliError> {
    let mut sets = match overrides.params {
        Some(ref path) => load_parameter_file(base, path)?,
        None => vec![base.clone()],
    };
    for params in &mut sets {
        apply_overrides(params, overrides)?;
    }
    Ok(sets)
}

fn load_parameter_file(
    base: &SimulationParameters,
    path: &Path,
) -> Result<Vec<SimulationParameters>, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let patches = match serde_json::from_str::<Value>(&raw)? {
        Value::Array(items) => items,
        value @ Value::Object(_) => vec![value],
        _ => {
            return Err(CliError::Validation {
                field: "params".into(),
                reason: format!(
                    "{} must hold a JSON object or an array of objects",
                    path.display()
                ),
            });
        }
    };
    if patches.is_empty() {
        return Err(CliError::Validation {
            field: "params".into(),
            reason: format!("{} holds no parameter sets", path.display()),
        });
    }

    let base = serde_json::to_value(base)?;
    patches
        .into_iter()
        .map(|patch| {
            let mut merged = base.clone();
            merge_json(&mut merged, patch);
            Ok(serde_json::from_value(merged)?)
        })
        .collect()
}

/// Recursively overlay `patch` onto `target`; non-object values replace.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch,
    }
}

fn apply_overrides(
    params: &mut SimulationParameters,
    overrides: &ParamOverrides,
) -> Result<(), CliError> {
    let tx = &mut params.transmitter;
    if let Some(ref name) = overrides.name {
        tx.name.clone_from(name);
    }
    set(&mut tx.latitude, overrides.lat);
    set(&mut tx.longitude, overrides.lon);
    set(&mut tx.power_watts, overrides.power);
    set(&mut tx.frequency_mhz, overrides.frequency);
    set(&mut tx.height_m, overrides.tx_height);
    set(&mut tx.gain_dbi, overrides.tx_gain);

    let rx = &mut params.receiver;
    set(&mut rx.sensitivity_dbm, overrides.sensitivity);
    set(&mut rx.height_m, overrides.rx_height);
    set(&mut rx.gain_dbi, overrides.rx_gain);
    set(&mut rx.loss_db, overrides.loss);

    let env = &mut params.environment;
    if let Some(ref climate) = overrides.climate {
        env.radio_climate = parse_choice::<RadioClimate>("climate", climate)?;
    }
    if let Some(ref polarization) = overrides.polarization {
        env.polarization = parse_choice::<Polarization>("polarization", polarization)?;
    }
    set(&mut env.clutter_height_m, overrides.clutter);

    set(&mut params.simulation.extent_km, overrides.extent);
    if overrides.high_resolution {
        params.simulation.high_resolution = true;
    }

    if let Some(ref scale) = overrides.color_scale {
        params.display.color_scale = parse_choice::<ColorScale>("color-scale", scale)?;
    }
    set(
        &mut params.display.overlay_transparency,
        overrides.transparency,
    );
    Ok(())
}

fn set(slot: &mut f64, value: Option<f64>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Parse a snake_case enum name, listing the valid ones on failure.
fn parse_choice<T>(field: &str, raw: &str) -> Result<T, CliError>
where
    T: FromStr + IntoEnumIterator + AsRef<str>,
{
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    T::from_str(&normalized).map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!(
            "unknown value '{raw}' (expected one of: {})",
            T::iter()
                .map(|v| v.as_ref().to_owned())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn write_params(json: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();
        file
    }

    #[test]
    fn flags_override_base() {
        let overrides = ParamOverrides {
            name: Some("Ridge".into()),
            lat: Some(-33.5),
            power: Some(5.0),
            climate: Some("maritime-temperate-sea".into()),
            ..ParamOverrides::default()
        };

        let sets = build_parameters(&SimulationParameters::default(), &overrides).unwrap();

        assert_eq!(sets.len(), 1);
        let p = &sets[0];
        assert_eq!(p.transmitter.name, "Ridge");
        assert!((p.transmitter.latitude + 33.5).abs() < f64::EPSILON);
        assert!((p.transmitter.power_watts - 5.0).abs() < f64::EPSILON);
        assert_eq!(p.environment.radio_climate, RadioClimate::MaritimeTemperateSea);
    }

    #[test]
    fn unknown_enum_lists_choices() {
        let overrides = ParamOverrides {
            polarization: Some("circular".into()),
            ..ParamOverrides::default()
        };

        let err = build_parameters(&SimulationParameters::default(), &overrides).unwrap_err();

        let CliError::Validation { field, reason } = err else {
            panic!("expected validation error");
        };
        assert_eq!(field, "polarization");
        assert!(reason.contains("horizontal, vertical"));
    }

    #[test]
    fn partial_file_merges_over_base() {
        let mut base = SimulationParameters::default();
        base.receiver.sensitivity_dbm = -110.0;
        let file = write_params(r#"{ "transmitter": { "name": "Hill", "power_watts": 2.5 } }"#);
        let overrides = ParamOverrides {
            params: Some(file.path().to_path_buf()),
            ..ParamOverrides::default()
        };

        let sets = build_parameters(&base, &overrides).unwrap();

        let p = &sets[0];
        assert_eq!(p.transmitter.name, "Hill");
        assert!((p.transmitter.power_watts - 2.5).abs() < f64::EPSILON);
        let drift = p.transmitter.frequency_mhz - base.transmitter.frequency_mhz;
        assert!(drift.abs() < f64::EPSILON);
        assert!((p.receiver.sensitivity_dbm + 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn array_file_yields_one_set_per_entry_with_flags_applied() {
        let file = write_params(
            r#"[
                { "transmitter": { "name": "North", "latitude": 51.2 } },
                { "transmitter": { "name": "South", "latitude": 50.9 } }
            ]"#,
        );
        let overrides = ParamOverrides {
            params: Some(file.path().to_path_buf()),
            frequency: Some(433.0),
            ..ParamOverrides::default()
        };

        let sets = build_parameters(&SimulationParameters::default(), &overrides).unwrap();

        let names: Vec<&str> = sets.iter().map(|p| p.transmitter.name.as_str()).collect();
        assert_eq!(names, ["North", "South"]);
        assert!(sets
            .iter()
            .all(|p| (p.transmitter.frequency_mhz - 433.0).abs() < f64::EPSILON));
    }

    #[test]
    fn empty_array_is_rejected() {
        let file = write_params("[]");
        let overrides = ParamOverrides {
            params: Some(file.path().to_path_buf()),
            ..ParamOverrides::default()
        };

        let err = build_parameters(&SimulationParameters::default(), &overrides).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }
}
