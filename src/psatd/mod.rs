//! Pseudo-spectral analytical time-domain (PSATD) field solver.
//!
//! Per step the caller deposits J and rho, transforms them together with E
//! and B into a `SpectralFieldData`, optionally calls `correct_current` or
//! `vay_deposition`, then `push_spectral_fields`, and transforms E and B
//! back to real space.
pub mod coefficients;
pub mod current;
pub mod error;
pub mod index;
pub mod kspace;
pub mod push;

use serde::Deserialize;
use tracing::{debug, info};

pub use coefficients::CoefficientSet;
pub use error::{PsatdError, Result};
pub use index::{FieldComp, SpectralFieldData, SpectralFieldIndex};
pub use kspace::{SpectralKSpace, StencilOrder};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    Collocated,
    Staggered,
}

/// Mode layout along x: every mode, or the non-negative half produced by a
/// real-to-complex transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralLayout {
    Complex,
    RealToComplex,
}

/// How the deposited current is made charge conserving before the push.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrentTreatment {
    Direct,
    Correction,
    Vay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoefficientState {
    Stale,
    Ready,
}

/// Everything needed to build a solver for one spectral patch.
#[derive(Clone, Debug, PartialEq)]
pub struct PsatdParams {
    pub n_cells: [usize; 3],
    pub dx: [f64; 3],
    pub norder: [StencilOrder; 3],
    pub grid_type: GridType,
    pub layout: SpectralLayout,
    pub v_galilean: [f64; 3],
    pub dt: f64,
    pub c: f64,
    pub ep0: f64,
    pub update_with_rho: bool,
    pub time_averaging: bool,
    pub dive_cleaning: bool,
    pub divb_cleaning: bool,
    pub current_treatment: CurrentTreatment,
    /// scan the input slots for NaN/Inf before every operation
    pub check_finite: bool,
}

fn check_dt(dt: f64) -> Result<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(PsatdError::InvalidTimeStep(dt))
    }
}

impl PsatdParams {
    pub fn is_galilean(&self) -> bool {
        self.v_galilean.iter().any(|&v| v != 0.0)
    }

    pub fn validate(&self) -> Result<()> {
        for (axis, (&n, &d)) in self.n_cells.iter().zip(self.dx.iter()).enumerate() {
            if n == 0 {
                return Err(PsatdError::InvalidGrid(format!("axis {} has no cells", axis)));
            }
            if !(d.is_finite() && d > 0.0) {
                return Err(PsatdError::InvalidGrid(format!(
                    "axis {} has cell size {}",
                    axis, d
                )));
            }
        }
        for (axis, order) in self.norder.iter().enumerate() {
            order.validate(axis)?;
        }
        check_dt(self.dt)?;
        if !(self.c.is_finite() && self.c > 0.0 && self.ep0.is_finite() && self.ep0 > 0.0) {
            return Err(PsatdError::InvalidConstants {
                c: self.c,
                ep0: self.ep0,
            });
        }
        self.validate_galilean()?;
        if self.dive_cleaning && !self.update_with_rho {
            return Err(PsatdError::DivECleaningWithoutRho);
        }
        Ok(())
    }

    fn validate_galilean(&self) -> Result<()> {
        let v = self.v_galilean;
        let speed = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        if !(speed < self.c) {
            return Err(PsatdError::SuperluminalFrame { speed, c: self.c });
        }
        if !self.is_galilean() {
            return Ok(());
        }
        if self.grid_type != GridType::Collocated {
            return Err(PsatdError::GalileanOnStaggeredGrid);
        }
        for (axis, (&n, &component)) in self.n_cells.iter().zip(v.iter()).enumerate() {
            if n == 1 && component != 0.0 {
                return Err(PsatdError::GalileanOnCollapsedAxis { axis, component });
            }
        }
        Ok(())
    }
}

/// Solver instance of one spectral patch.
///
/// Owns the wavevectors, the slot layout and the coefficient arrays. The
/// per-step operations take `&self` and run in parallel over modes; changing
/// dt or the Galilean velocity takes `&mut self` and leaves the coefficients
/// stale until `init_coefficients` rebuilds them.
pub struct PsatdSolver {
    params: PsatdParams,
    kspace: SpectralKSpace,
    index: SpectralFieldIndex,
    coefs: CoefficientSet,
    state: CoefficientState,
}

impl PsatdSolver {
    pub fn new(params: PsatdParams) -> Result<PsatdSolver> {
        params.validate()?;
        let kspace = SpectralKSpace::new(
            params.n_cells,
            params.dx,
            params.norder,
            params.grid_type,
            params.layout,
        );
        let index =
            SpectralFieldIndex::new(params.dive_cleaning, params.divb_cleaning, params.time_averaging);
        let coefs = CoefficientSet::new(&kspace, &params);
        debug_assert!(coefs.all_finite());
        info!(
            n_modes = kspace.n_modes_total(),
            n_comps = index.n_comps(),
            grid = ?params.grid_type,
            galilean = params.is_galilean(),
            "PSATD solver ready"
        );
        Ok(PsatdSolver {
            params,
            kspace,
            index,
            coefs,
            state: CoefficientState::Ready,
        })
    }

    pub fn params(&self) -> &PsatdParams {
        &self.params
    }

    pub fn kspace(&self) -> &SpectralKSpace {
        &self.kspace
    }

    pub fn index(&self) -> &SpectralFieldIndex {
        &self.index
    }

    pub fn coefficients(&self) -> &CoefficientSet {
        &self.coefs
    }

    pub fn state(&self) -> CoefficientState {
        self.state
    }

    pub fn dt(&self) -> f64 {
        self.params.dt
    }

    pub fn n_modes(&self) -> usize {
        self.kspace.n_modes_total()
    }

    /// Zeroed field data with this solver's layout.
    pub fn new_field_data(&self) -> SpectralFieldData {
        SpectralFieldData::new(&self.index, self.n_modes())
    }

    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        check_dt(dt)?;
        if dt != self.params.dt {
            debug!(old = self.params.dt, new = dt, "time step changed, coefficients stale");
            self.params.dt = dt;
            self.state = CoefficientState::Stale;
        }
        Ok(())
    }

    pub fn set_v_galilean(&mut self, v: [f64; 3]) -> Result<()> {
        let mut params = self.params.clone();
        params.v_galilean = v;
        params.validate_galilean()?;
        if v != self.params.v_galilean {
            debug!(?v, "Galilean velocity changed, coefficients stale");
            self.params = params;
            self.state = CoefficientState::Stale;
        }
        Ok(())
    }

    /// Rebuilds every coefficient array from the current dt and velocity.
    pub fn init_coefficients(&mut self) {
        self.coefs = CoefficientSet::new(&self.kspace, &self.params);
        debug_assert!(self.coefs.all_finite());
        self.state = CoefficientState::Ready;
        debug!(dt = self.params.dt, n_modes = self.n_modes(), "rebuilt PSATD coefficients");
    }

    /// Slots read by the per-step operations.
    fn input_slots(&self) -> Vec<usize> {
        let idx = &self.index;
        let mut slots = vec![
            idx.ex, idx.ey, idx.ez, idx.bx, idx.by, idx.bz, idx.jx, idx.jy, idx.jz, idx.rho_old,
            idx.rho_new,
        ];
        slots.extend(idx.f);
        slots.extend(idx.g);
        slots
    }

    fn check_layout(&self, fields: &SpectralFieldData) -> Result<()> {
        if fields.n_comps() != self.index.n_comps() || fields.n_modes() != self.n_modes() {
            return Err(PsatdError::FieldLayout {
                expected_comps: self.index.n_comps(),
                expected_modes: self.n_modes(),
                found_comps: fields.n_comps(),
                found_modes: fields.n_modes(),
            });
        }
        if self.params.check_finite {
            if let Some((slot, mode)) = fields.find_non_finite(&self.input_slots()) {
                return Err(PsatdError::NonFinite { slot, mode });
            }
        }
        Ok(())
    }

    fn check_ready(&self, fields: &SpectralFieldData) -> Result<()> {
        if self.state != CoefficientState::Ready {
            return Err(PsatdError::CoefficientsStale);
        }
        self.check_layout(fields)
    }

    fn check_treatment(&self, wanted: CurrentTreatment, operation: &'static str) -> Result<()> {
        if self.params.current_treatment != wanted {
            return Err(PsatdError::CurrentTreatment {
                operation,
                configured: self.params.current_treatment,
            });
        }
        Ok(())
    }
}
