// ── Domain → wire conversion ──
//
// Flattens `SimulationParameters` into the service's request body,
// re-expressing power in dBm and the extent in meters.

use siteplan_api::PredictRequest;

use crate::model::SimulationParameters;

/// `10·log10(W) + 30`
pub fn watts_to_dbm(watts: f64) -> f64 {
    10.0 * watts.log10() + 30.0
}

pub fn km_to_m(km: f64) -> f64 {
    km * 1000.0
}

impl From<&SimulationParameters> for PredictRequest {
    fn from(params: &SimulationParameters) -> Self {
        let tx = &params.transmitter;
        let rx = &params.receiver;
        let env = &params.environment;
        let sim = &params.simulation;
        let display = &params.display;

        PredictRequest {
            lat: tx.latitude,
            lon: tx.longitude,
            tx_height: tx.height_m,
            tx_power: watts_to_dbm(tx.power_watts),
            tx_gain: tx.gain_dbi,
            frequency_mhz: tx.frequency_mhz,

            rx_height: rx.height_m,
            rx_gain: rx.gain_dbi,
            signal_threshold: rx.sensitivity_dbm,
            system_loss: rx.loss_db,

            clutter_height: env.clutter_height_m,
            ground_dielectric: env.ground_dielectric,
            ground_conductivity: env.ground_conductivity,
            atmosphere_bending: env.atmosphere_bending,
            radio_climate: env.radio_climate.to_string(),
            polarization: env.polarization.to_string(),

            radius: km_to_m(sim.extent_km),
            situation_fraction: sim.situation_fraction,
            time_fraction: sim.time_fraction,
            high_resolution: sim.high_resolution,

            colormap: display.color_scale.to_string(),
            min_dbm: display.min_dbm,
            max_dbm: display.max_dbm,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{ColorScale, Polarization, RadioClimate};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn power_in_dbm() {
        assert!(approx(watts_to_dbm(0.1), 20.0));
        assert!(approx(watts_to_dbm(1.0), 30.0));
        assert!(approx(watts_to_dbm(0.001), 0.0));
    }

    #[test]
    fn default_parameters_flatten() {
        let req = PredictRequest::from(&SimulationParameters::default());

        assert!(approx(req.tx_power, 20.0));
        assert!(approx(req.radius, 30_000.0));
        assert!(approx(req.frequency_mhz, 907.0));
        assert!(approx(req.signal_threshold, -130.0));
        assert_eq!(req.radio_climate, "continental_temperate");
        assert_eq!(req.polarization, "vertical");
        assert_eq!(req.colormap, "plasma");
        assert!(!req.high_resolution);
    }

    #[test]
    fn enums_use_wire_names() {
        let mut params = SimulationParameters::default();
        params.environment.radio_climate = RadioClimate::MaritimeTemperateSea;
        params.environment.polarization = Polarization::Horizontal;
        params.display.color_scale = ColorScale::Cividis;

        let body = serde_json::to_value(PredictRequest::from(&params)).unwrap_or_default();
        assert_eq!(body["radio_climate"], "maritime_temperate_sea");
        assert_eq!(body["polarization"], "horizontal");
        assert_eq!(body["colormap"], "cividis");
    }
}
