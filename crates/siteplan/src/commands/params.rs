//! `siteplan params`: show the parameters a prediction would use.

use tabled::Tabled;

use siteplan_core::SimulationParameters;

use crate::cli::{GlobalOpts, ParamsArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ParamsRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Lat")]
    latitude: f64,
    #[tabled(rename = "Lon")]
    longitude: f64,
    #[tabled(rename = "W")]
    power: f64,
    #[tabled(rename = "MHz")]
    frequency: f64,
    #[tabled(rename = "km")]
    extent: f64,
}

impl From<&SimulationParameters> for ParamsRow {
    fn from(p: &SimulationParameters) -> Self {
        Self {
            name: p.transmitter.name.clone(),
            latitude: p.transmitter.latitude,
            longitude: p.transmitter.longitude,
            power: p.transmitter.power_watts,
            frequency: p.transmitter.frequency_mhz,
            extent: p.simulation.extent_km,
        }
    }
}

pub fn handle(args: &ParamsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let base = config::base_parameters(global)?;
    let sets = config::build_parameters(&base, &args.overrides)?;

    if args.validate {
        for params in &sets {
            params.validate()?;
        }
    }

    let out = match sets.as_slice() {
        [single] => output::render_single(&global.output, single, detail, |p| {
            p.transmitter.name.clone()
        })?,
        many => output::render_list(&global.output, many, |p| ParamsRow::from(p), |p| {
            p.transmitter.name.clone()
        })?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(p: &SimulationParameters) -> String {
    let tx = &p.transmitter;
    let rx = &p.receiver;
    let env = &p.environment;
    let sim = &p.simulation;
    let display = &p.display;
    output::detail_lines(&[
        ("Site", tx.name.clone()),
        ("Location", format!("{}, {}", tx.latitude, tx.longitude)),
        ("Power", format!("{} W", tx.power_watts)),
        ("Frequency", format!("{} MHz", tx.frequency_mhz)),
        ("TX antenna", format!("{} m, {} dBi", tx.height_m, tx.gain_dbi)),
        ("Sensitivity", format!("{} dBm", rx.sensitivity_dbm)),
        ("RX antenna", format!("{} m, {} dBi, {} dB loss", rx.height_m, rx.gain_dbi, rx.loss_db)),
        ("Climate", env.radio_climate.to_string()),
        ("Polarization", env.polarization.to_string()),
        ("Clutter", format!("{} m", env.clutter_height_m)),
        ("Ground", format!("ε {} / σ {} S/m", env.ground_dielectric, env.ground_conductivity)),
        ("Refractivity", format!("{} N", env.atmosphere_bending)),
        (
            "Confidence",
            format!("{}% situations, {}% time", sim.situation_fraction, sim.time_fraction),
        ),
        ("Radius", format!("{} km", sim.extent_km)),
        ("High-res", sim.high_resolution.to_string()),
        (
            "Colors",
            format!("{} ({} to {} dBm)", display.color_scale, display.min_dbm, display.max_dbm),
        ),
        ("Opacity", format!("{:.0}%", display.opacity() * 100.0)),
    ])
}
