use serde::Deserialize;
use std::fs;

use anyhow::{Context, Result};
use tracing::info;

pub mod fft;
pub mod psatd;
pub mod save;
pub mod sim;

use psatd::{CurrentTreatment, GridType, PsatdParams, SpectralLayout, StencilOrder};
use sim::Sim;

// We use a type alias for f64/Float to easily support
// double and single precision.
#[cfg(feature = "dprec")]
pub type Float = f64;

#[cfg(not(feature = "dprec"))]
pub type Float = f32;

#[cfg(feature = "dprec")]
pub const E_TOL: Float = 1e-10;

#[cfg(not(feature = "dprec"))]
pub const E_TOL: Float = 1e-4;

pub const PI: f64 = std::f64::consts::PI;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub params: Params,
    pub setup: Setup,
    pub output: Output,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Setup {
    pub t_final: u32,
    pub mode_x: usize,
    pub mode_y: usize,
    pub amplitude: Float,
    #[serde(default)]
    pub noise: Float,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Output {
    pub write_output: bool,
    pub output_interval: u32,
    pub stride: usize,
}

fn default_true() -> bool {
    true
}

fn default_treatment() -> CurrentTreatment {
    CurrentTreatment::Direct
}

#[derive(Deserialize, Clone, Debug)]
pub struct Params {
    pub size_x: usize,
    pub size_y: usize,
    pub delta_x: f64,
    pub delta_y: f64,
    pub dt: f64,
    pub c: f64,
    pub ep0: f64,
    // -1 selects the infinite order (pure spectral) stencil
    pub norder_x: i64,
    pub norder_y: i64,
    pub grid_type: GridType,
    #[serde(default)]
    pub v_galilean: [f64; 3],
    #[serde(default = "default_true")]
    pub update_with_rho: bool,
    #[serde(default)]
    pub time_averaging: bool,
    #[serde(default)]
    pub dive_cleaning: bool,
    #[serde(default)]
    pub divb_cleaning: bool,
    #[serde(default = "default_treatment")]
    pub current_treatment: CurrentTreatment,
}

impl Config {
    pub fn new() -> Result<Config> {
        let contents =
            fs::read_to_string("config.toml").context("Could not open the config.toml file")?;
        Config::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Config> {
        toml::from_str(contents).with_context(|| "Could not parse Config file")
    }

    /// Solver parameters of the 2D periodic box, z collapsed to one cell.
    pub fn psatd_params(&self) -> Result<PsatdParams> {
        let p = &self.params;
        Ok(PsatdParams {
            n_cells: [p.size_x, p.size_y, 1],
            dx: [p.delta_x, p.delta_y, 1.0],
            norder: [
                StencilOrder::from_config(0, p.norder_x)?,
                StencilOrder::from_config(1, p.norder_y)?,
                StencilOrder::Infinite,
            ],
            grid_type: p.grid_type,
            layout: SpectralLayout::Complex,
            v_galilean: p.v_galilean,
            dt: p.dt,
            c: p.c,
            ep0: p.ep0,
            update_with_rho: p.update_with_rho,
            time_averaging: p.time_averaging,
            dive_cleaning: p.dive_cleaning,
            divb_cleaning: p.divb_cleaning,
            current_treatment: p.current_treatment,
            check_finite: true,
        })
    }
}

pub fn run(cfg: Config) -> Result<()> {
    if cfg.output.output_interval == 0 {
        return Err(anyhow::Error::msg("output_interval must be at least 1"));
    }
    if cfg.output.stride == 0 {
        return Err(anyhow::Error::msg("stride must be at least 1"));
    }

    let mut sim = Sim::new(&cfg)?;
    sim.init_plane_wave(
        cfg.setup.mode_x,
        cfg.setup.mode_y,
        cfg.setup.amplitude,
        cfg.setup.noise,
    )?;
    let energy_0 = sim.energy();

    for t in 0..=sim.t_final {
        if t % cfg.output.output_interval == 0 {
            let energy = sim.energy();
            info!(t, energy, drift = energy / energy_0 - 1.0, "field energy");
            if cfg.output.write_output {
                save::save_output(t, &mut sim, &cfg)?;
            }
        }
        sim.step()?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn build_test_params() -> PsatdParams {
    // A small 2D collocated patch that most unit tests start from
    PsatdParams {
        n_cells: [16, 12, 1],
        dx: [0.5, 0.4, 1.0],
        norder: [
            StencilOrder::Finite(16),
            StencilOrder::Finite(16),
            StencilOrder::Infinite,
        ],
        grid_type: GridType::Collocated,
        layout: SpectralLayout::Complex,
        v_galilean: [0.0; 3],
        dt: 0.1,
        c: 3.0,
        ep0: 0.5,
        update_with_rho: true,
        time_averaging: false,
        dive_cleaning: false,
        divb_cleaning: false,
        current_treatment: CurrentTreatment::Direct,
        check_finite: true,
    }
}
