//! Simulation handle and its JS-facing accessors.

use anyhow::{anyhow, Context, Result};
use nbody_core::adaptive::Tolerances;
use nbody_core::config::parse_config;
use nbody_core::diagnostics::Axis;
use nbody_core::integrators::IntegrationMethod;
use nbody_core::simulation::{Simulation, SimulationReport};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmSimulation {
    simulation: Simulation,
    report: Option<SimulationReport>,
}

/// Optional overrides accepted by `run_with_options`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RunOptions {
    pub method: Option<String>,
    pub rtol: Option<f64>,
    pub atol: Option<f64>,
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

impl WasmSimulation {
    pub(crate) fn from_json(config_json: &str) -> Result<Self> {
        let loaded = parse_config(config_json).context("Invalid simulation config")?;
        Ok(Self {
            simulation: Simulation::from(loaded),
            report: None,
        })
    }

    pub(crate) fn run_inner(&mut self, options: RunOptions) -> Result<()> {
        let method = match options.method.as_deref() {
            Some(name) => name.parse::<IntegrationMethod>()?,
            None => IntegrationMethod::default(),
        };
        let defaults = self.simulation.tolerances();
        let tolerances = Tolerances {
            rtol: options.rtol.unwrap_or(defaults.rtol),
            atol: options.atol.unwrap_or(defaults.atol),
        };
        tolerances.validate()?;
        // Overrides apply to this run only.
        let report = self
            .simulation
            .clone()
            .with_tolerances(tolerances)
            .run(method)
            .with_context(|| format!("{method} integration failed"))?;
        self.report = Some(report);
        Ok(())
    }

    pub(crate) fn report_ref(&self) -> Result<&SimulationReport> {
        self.report
            .as_ref()
            .ok_or_else(|| anyhow!("Simulation has not been run yet."))
    }

    pub(crate) fn radial_velocity_inner(&self, body: usize, axis: &str) -> Result<Vec<f64>> {
        let axis: Axis = axis.parse()?;
        Ok(self.report_ref()?.radial_velocity(body, axis)?)
    }
}

#[wasm_bindgen]
impl WasmSimulation {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSimulation, JsValue> {
        crate::init_logging();
        Self::from_json(config_json).map_err(to_js)
    }

    /// Runs with the named method ("euler", "rk4" or "adaptive").
    pub fn run(&mut self, method: &str) -> Result<(), JsValue> {
        self.run_inner(RunOptions {
            method: Some(method.to_string()),
            ..RunOptions::default()
        })
        .map_err(to_js)
    }

    pub fn run_with_options(&mut self, options: JsValue) -> Result<(), JsValue> {
        let options: RunOptions = if options.is_undefined() || options.is_null() {
            RunOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)
                .map_err(|err| JsValue::from_str(&format!("Invalid run options: {err}")))?
        };
        self.run_inner(options).map_err(to_js)
    }

    pub fn body_names(&self) -> Vec<String> {
        self.simulation.system().names()
    }

    pub fn body_count(&self) -> usize {
        self.simulation.system().len()
    }

    pub fn times(&self) -> Vec<f64> {
        self.simulation.grid().times().to_vec()
    }

    pub fn has_run(&self) -> bool {
        self.report.is_some()
    }

    /// Flat `(steps, bodies, 3)` positions.
    pub fn positions(&self) -> Result<js_sys::Float64Array, JsValue> {
        let report = self.report_ref().map_err(to_js)?;
        Ok(js_sys::Float64Array::from(report.trajectory.positions()))
    }

    /// Flat `(steps, bodies, 3)` velocities.
    pub fn velocities(&self) -> Result<js_sys::Float64Array, JsValue> {
        let report = self.report_ref().map_err(to_js)?;
        Ok(js_sys::Float64Array::from(report.trajectory.velocities()))
    }

    pub fn energy_error(&self) -> Result<Vec<f64>, JsValue> {
        Ok(self.report_ref().map_err(to_js)?.energy_error.clone())
    }

    pub fn barycenter_displacement(&self) -> Result<Vec<f64>, JsValue> {
        Ok(self
            .report_ref()
            .map_err(to_js)?
            .barycenter_displacement
            .clone())
    }

    pub fn radial_velocity(&self, body: usize, axis: &str) -> Result<Vec<f64>, JsValue> {
        self.radial_velocity_inner(body, axis).map_err(to_js)
    }

    /// The whole report as a plain JS object.
    pub fn report(&self) -> Result<JsValue, JsValue> {
        let report = self.report_ref().map_err(to_js)?;
        serde_wasm_bindgen::to_value(report)
            .map_err(|err| JsValue::from_str(&format!("Failed to serialize report: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUN_EARTH: &str = r#"{
        "duration_yr": 0.5,
        "steps": 101,
        "bodies": [
            {"name": "Sun", "m": 1.0, "r": [0, 0, 0], "v": [0, 0, 0]},
            {"name": "Earth", "m": 3e-6, "r": [1, 0, 0], "v": [0, 6.283185307179586, 0]}
        ]
    }"#;

    #[test]
    fn from_json_builds_an_unrun_simulation() {
        let sim = WasmSimulation::from_json(SUN_EARTH).expect("config");
        assert_eq!(sim.body_count(), 2);
        assert_eq!(sim.body_names(), vec!["Sun".to_string(), "Earth".to_string()]);
        assert_eq!(sim.times().len(), 101);
        assert!(!sim.has_run());
        assert!(sim.report_ref().is_err());
    }

    #[test]
    fn from_json_rejects_foreign_units() {
        let text = SUN_EARTH.replace("\"duration_yr\"", "\"units\": {\"distance\": \"km\", \"time\": \"yr\", \"mass\": \"Msun\"}, \"duration_yr\"");
        let err = WasmSimulation::from_json(&text).err().expect("km rejected");
        let message = format!("{err:#}");
        assert!(message.contains("Invalid simulation config"));
        assert!(message.contains("AU/yr/Msun"));
    }

    #[test]
    fn run_inner_fills_report() {
        let mut sim = WasmSimulation::from_json(SUN_EARTH).expect("config");
        sim.run_inner(RunOptions {
            method: Some("euler".into()),
            ..RunOptions::default()
        })
        .expect("run");
        assert!(sim.has_run());
        let report = sim.report_ref().expect("report");
        assert_eq!(report.method, IntegrationMethod::Euler);
        assert_eq!(report.trajectory.positions().len(), 101 * 2 * 3);

        let rv = sim.radial_velocity_inner(1, "y").expect("rv");
        assert_eq!(rv[0], 6.283185307179586);
    }

    #[test]
    fn run_inner_rejects_unknown_method_and_axis() {
        let mut sim = WasmSimulation::from_json(SUN_EARTH).expect("config");
        assert!(sim
            .run_inner(RunOptions {
                method: Some("scipy".into()),
                ..RunOptions::default()
            })
            .is_err());
        sim.run_inner(RunOptions::default()).expect("rk4 run");
        assert!(sim.radial_velocity_inner(0, "w").is_err());
        assert!(sim.radial_velocity_inner(7, "x").is_err());
    }

    #[test]
    fn tolerance_overrides_do_not_persist() {
        let mut sim = WasmSimulation::from_json(SUN_EARTH).expect("config");
        let configured = sim.simulation.tolerances();
        sim.run_inner(RunOptions {
            method: Some("rk4".into()),
            rtol: Some(1e-6),
            atol: Some(1e-8),
        })
        .expect("run with overrides");
        assert_eq!(sim.simulation.tolerances(), configured);

        assert!(sim
            .run_inner(RunOptions {
                rtol: Some(-1.0),
                ..RunOptions::default()
            })
            .is_err());
        assert_eq!(sim.simulation.tolerances(), configured);
    }

    #[test]
    #[cfg(target_arch = "wasm32")]
    fn constructor_reports_errors_as_js_strings() {
        let result = WasmSimulation::new("{}");
        assert!(result.is_err(), "expected missing-field error");
    }
}
