use crate::psatd::CurrentTreatment;
use thiserror::Error;

/// Everything the solver can refuse to do. Configuration variants come out of
/// `PsatdSolver::new`/`set_dt`, the rest out of the per-step operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PsatdError {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("stencil order {order} along axis {axis} must be a positive even number, or -1 for infinite order")]
    InvalidStencilOrder { axis: usize, order: i64 },

    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f64),

    #[error("physical constants must be finite and positive (c = {c}, ep0 = {ep0})")]
    InvalidConstants { c: f64, ep0: f64 },

    #[error("a Galilean velocity is only supported on a collocated grid")]
    GalileanOnStaggeredGrid,

    #[error("Galilean velocity component {component} lies along collapsed axis {axis}")]
    GalileanOnCollapsedAxis { axis: usize, component: f64 },

    #[error("Galilean speed {speed} must be finite and below the speed of light {c}")]
    SuperluminalFrame { speed: f64, c: f64 },

    #[error("div(E) cleaning needs the rho form of the E update (update_with_rho = true)")]
    DivECleaningWithoutRho,

    #[error("coefficients are stale, call init_coefficients after changing dt or the Galilean velocity")]
    CoefficientsStale,

    #[error("field data is {found_comps} comps x {found_modes} modes, solver expects {expected_comps} x {expected_modes}")]
    FieldLayout {
        expected_comps: usize,
        expected_modes: usize,
        found_comps: usize,
        found_modes: usize,
    },

    #[error("non-finite value in slot {slot} at mode {mode}")]
    NonFinite { slot: usize, mode: usize },

    #[error("{operation} cannot run when the current treatment is {configured:?}")]
    CurrentTreatment {
        operation: &'static str,
        configured: CurrentTreatment,
    },
}

pub type Result<T> = std::result::Result<T, PsatdError>;
