use crate::psatd::error::Result;
use crate::psatd::{PsatdSolver, SpectralFieldData};
use crate::Float;
use rayon::prelude::*;
use rustfft::num_complex::Complex;

pub(crate) type Vec3 = [Complex<Float>; 3];

/// `k × v`
#[inline(always)]
pub(crate) fn cross(k: &[Float; 3], v: &Vec3) -> Vec3 {
    [
        v[2] * k[1] - v[1] * k[2],
        v[0] * k[2] - v[2] * k[0],
        v[1] * k[0] - v[0] * k[1],
    ]
}

/// `k · v`
#[inline(always)]
pub(crate) fn dot(k: &[Float; 3], v: &Vec3) -> Complex<Float> {
    v[0] * k[0] + v[1] * k[1] + v[2] * k[2]
}

#[inline(always)]
pub(crate) fn to_float(k: [f64; 3]) -> [Float; 3] {
    [k[0] as Float, k[1] as Float, k[2] as Float]
}

impl PsatdSolver {
    /// Advances E and B (plus F and G when cleaning is on) by one time step
    /// in place. J and rho are only read. With time averaging the averaged
    /// E and B over the step are written to their own slots.
    pub fn push_spectral_fields(&self, fields: &mut SpectralFieldData) -> Result<()> {
        self.check_ready(fields)?;

        let idx = &self.index;
        let coefs = &self.coefs;
        let kspace = &self.kspace;
        let c2 = (self.params.c * self.params.c) as Float;
        let rho_form = self.params.update_with_rho;
        let i = Complex::<Float>::i();

        fields.par_modes_mut().enumerate().for_each(|(m, fld)| {
            let k = to_float(kspace.modified_k_vec(m));
            let e0 = [fld[idx.ex], fld[idx.ey], fld[idx.ez]];
            let b0 = [fld[idx.bx], fld[idx.by], fld[idx.bz]];
            let j = [fld[idx.jx], fld[idx.jy], fld[idx.jz]];
            let rho_old = fld[idx.rho_old];
            let rho_new = fld[idx.rho_new];
            let f0 = idx.f.map(|s| fld[s]);
            let g0 = idx.g.map(|s| fld[s]);

            let c = coefs.c[m];
            let t2 = coefs.t2[m];
            let t2c = t2 * c;
            let t2s = t2 * coefs.s_ck[m];
            let x1 = coefs.x1[m];
            let x2 = coefs.x2[m];
            let x3 = coefs.x3[m];
            let x4 = coefs.x4[m];

            let k_cross_e = cross(&k, &e0);
            let k_cross_b = cross(&k, &b0);
            let k_cross_j = cross(&k, &j);
            let k_dot_e = dot(&k, &e0);
            let k_dot_j = dot(&k, &j);

            // longitudinal source term, multiplies k
            let long = if rho_form {
                -i * (x2 * rho_new - t2 * x3 * rho_old)
            } else {
                x2 * k_dot_e + x3 * k_dot_j
            };

            let mut e = [Complex::new(0.0, 0.0); 3];
            let mut b = [Complex::new(0.0, 0.0); 3];
            for d in 0..3 {
                e[d] = t2c * e0[d] + i * c2 * t2s * k_cross_b[d] + x4 * j[d] + long * k[d];
                b[d] = t2c * b0[d] - i * t2s * k_cross_e[d] + i * x1 * k_cross_j[d];
            }

            if let (Some(sf), Some(f0), Some(x5)) = (idx.f, f0, coefs.x5.as_ref()) {
                for d in 0..3 {
                    e[d] += i * c2 * t2s * f0 * k[d];
                }
                fld[sf] = t2c * f0 + i * t2s * k_dot_e + x4 * rho_old
                    - x5[m] * (rho_new - rho_old)
                    - i * x1 * k_dot_j;
            }

            if let (Some(sg), Some(g0)) = (idx.g, g0) {
                for d in 0..3 {
                    b[d] += i * t2s * g0 * k[d];
                }
                fld[sg] = t2c * g0 + i * c2 * t2s * dot(&k, &b0);
            }

            if let (Some(se), Some(sb), Some(avg)) = (idx.e_avg, idx.b_avg, coefs.avg.as_ref()) {
                let psi1 = avg.psi1[m];
                let psi2 = avg.psi2[m];
                let long_avg = if rho_form {
                    -i * (avg.y2[m] * rho_new - avg.y3[m] * rho_old)
                } else {
                    avg.y2[m] * k_dot_e + avg.y3[m] * k_dot_j
                };
                for d in 0..3 {
                    let mut ea = psi1 * e0[d]
                        + i * c2 * psi2 * k_cross_b[d]
                        + avg.y4[m] * j[d]
                        + long_avg * k[d];
                    let mut ba = psi1 * b0[d] - i * psi2 * k_cross_e[d] + i * avg.y1[m] * k_cross_j[d];
                    if let Some(f0) = f0 {
                        ea += i * c2 * psi2 * f0 * k[d];
                    }
                    if let Some(g0) = g0 {
                        ba += i * psi2 * g0 * k[d];
                    }
                    fld[se[d]] = ea;
                    fld[sb[d]] = ba;
                }
            }

            fld[idx.ex] = e[0];
            fld[idx.ey] = e[1];
            fld[idx.ez] = e[2];
            fld[idx.bx] = b[0];
            fld[idx.by] = b[1];
            fld[idx.bz] = b[2];
        });
        Ok(())
    }
}
