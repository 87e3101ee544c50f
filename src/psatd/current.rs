use crate::psatd::coefficients::sinc;
use crate::psatd::error::Result;
use crate::psatd::push::{dot, to_float};
use crate::psatd::{CurrentTreatment, PsatdSolver, SpectralFieldData};
use crate::{Float, PI};
use rayon::prelude::*;
use rustfft::num_complex::{Complex, Complex64};
use rustfft::num_traits::Zero;
use tracing::warn;

/// |sin(w dt / 2)| below which `1 - T2` vanishes at `w dt = 2πn`, n ≠ 0, and
/// rho carries no information about k·J.
const RESONANCE_TOL: f64 = 1e-10;

impl PsatdSolver {
    /// Projects J onto the currents satisfying the discrete continuity
    /// equation `(rho_new - rho_old)/dt + i k·J = 0` (or its co-moving
    /// counterpart with a Galilean velocity). Only the component of J along
    /// k changes; the zero mode is left alone.
    pub fn correct_current(&self, fields: &mut SpectralFieldData) -> Result<()> {
        self.check_treatment(CurrentTreatment::Correction, "correct_current")?;
        self.check_ready(fields)?;

        let idx = &self.index;
        let kspace = &self.kspace;
        let t2s = &self.coefs.t2;
        let dt = self.params.dt;
        let v = self.params.v_galilean;
        let i = Complex::<Float>::i();

        let skipped: usize = fields
            .par_modes_mut()
            .enumerate()
            .map(|(m, fld)| {
                let k = to_float(kspace.modified_k_vec(m));
                let k2 = k[0] * k[0] + k[1] * k[1] + k[2] * k[2];
                if k2 == 0.0 {
                    return 0;
                }
                let kc = kspace.modified_k_centered_vec(m);
                let w = kc[0] * v[0] + kc[1] * v[1] + kc[2] * v[2];
                let j = [fld[idx.jx], fld[idx.jy], fld[idx.jz]];
                let rho_old = fld[idx.rho_old];
                let rho_new = fld[idx.rho_new];

                let target = if w == 0.0 {
                    i * (rho_new - rho_old) / (dt as Float)
                } else {
                    let half = 0.5 * w * dt;
                    // only nonzero multiples of 2π are singular, small w tends to i/dt
                    if half.abs() >= 0.5 * PI && half.sin().abs() < RESONANCE_TOL {
                        return 1;
                    }
                    // w / (1 - T2) = i e^{-i w dt/2} / (dt sinc(w dt/2))
                    let factor =
                        Complex64::from_polar(1.0 / (dt * sinc(half)), -half) * Complex64::i();
                    let factor = Complex::new(factor.re as Float, factor.im as Float);
                    factor * (rho_new - rho_old * t2s[m])
                };

                let corr = (dot(&k, &j) - target) / k2;
                fld[idx.jx] = j[0] - corr * k[0];
                fld[idx.jy] = j[1] - corr * k[1];
                fld[idx.jz] = j[2] - corr * k[2];
                0
            })
            .sum();

        if skipped > 0 {
            warn!(skipped, "current correction skipped modes at the Galilean resonance");
        }
        Ok(())
    }

    /// Rebuilds J from the Vay D moments stored in the J slots,
    /// `J_i = i D_i / k_i`. Axes with `k_i = 0` carry no current.
    pub fn vay_deposition(&self, fields: &mut SpectralFieldData) -> Result<()> {
        self.check_treatment(CurrentTreatment::Vay, "vay_deposition")?;
        self.check_layout(fields)?;

        let idx = &self.index;
        let kspace = &self.kspace;
        let i = Complex::<Float>::i();
        let slots = [idx.jx, idx.jy, idx.jz];

        fields.par_modes_mut().enumerate().for_each(|(m, fld)| {
            let k = to_float(kspace.modified_k_vec(m));
            for (&kd, &s) in k.iter().zip(slots.iter()) {
                fld[s] = if kd != 0.0 {
                    i * fld[s] / kd
                } else {
                    Complex::zero()
                };
            }
        });
        Ok(())
    }
}
