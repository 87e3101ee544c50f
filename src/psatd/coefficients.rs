//! Per-mode transfer coefficients of the PSATD update.
//!
//! Sources are modelled as J constant over the step and rho linear in time
//! between `rho_old` and `rho_new` (in the co-moving frame when a Galilean
//! velocity is set). All kernels are evaluated in f64 with series expansions
//! near the origin, so the k = 0 mode gets its exact limit instead of a
//! guarded division.
use crate::psatd::kspace::SpectralKSpace;
use crate::psatd::PsatdParams;
use crate::Float;
use rayon::prelude::*;
use rustfft::num_complex::{Complex, Complex64};

/// Below this argument the kernels are summed as Taylor series.
const SERIES_RADIUS: f64 = 1.0;
const SERIES_TERMS: usize = 20;

/// `Σ_j (-1)^j x^{2j} / (2j + s)!`, the even series shared by the real kernels.
fn even_series(x: f64, s: usize) -> f64 {
    let x2 = x * x;
    let mut term = 1.0 / (1..=s).map(|q| q as f64).product::<f64>();
    let mut sum = term;
    for j in 1..SERIES_TERMS {
        term *= -x2 / (((2 * j + s - 1) * (2 * j + s)) as f64);
        sum += term;
    }
    sum
}

/// `sin x / x`
pub(crate) fn sinc(x: f64) -> f64 {
    if x.abs() < SERIES_RADIUS {
        even_series(x, 1)
    } else {
        x.sin() / x
    }
}

/// `(1 - cos x) / x²`
pub(crate) fn f1(x: f64) -> f64 {
    if x.abs() < SERIES_RADIUS {
        even_series(x, 2)
    } else {
        (1.0 - x.cos()) / (x * x)
    }
}

/// `(x - sin x) / x³`
pub(crate) fn f2(x: f64) -> f64 {
    if x.abs() < SERIES_RADIUS {
        even_series(x, 3)
    } else {
        (x - x.sin()) / (x * x * x)
    }
}

/// `(x²/2 - 1 + cos x) / x⁴`
pub(crate) fn f3(x: f64) -> f64 {
    if x.abs() < SERIES_RADIUS {
        even_series(x, 4)
    } else {
        (0.5 * x * x - 1.0 + x.cos()) / (x * x * x * x)
    }
}

/// Exponential integrator functions `[φ1, φ2, φ3]` with
/// `φ1 = (eˣ - 1)/x`, `φ2 = (eˣ - 1 - x)/x²`, `φ3 = (eˣ - 1 - x - x²/2)/x³`.
pub(crate) fn phi(x: Complex64) -> [Complex64; 3] {
    if x.norm() < SERIES_RADIUS {
        let mut term = Complex64::new(1.0 / 6.0, 0.0);
        let mut p3 = term;
        for j in 1..SERIES_TERMS {
            term = term * x / (j as f64 + 3.0);
            p3 += term;
        }
        // φn = 1/n! + x φ(n+1)
        let p2 = 0.5 + x * p3;
        let p1 = 1.0 + x * p2;
        [p1, p2, p3]
    } else {
        let p1 = (x.exp() - 1.0) / x;
        let p2 = (p1 - 1.0) / x;
        let p3 = (p2 - 0.5) / x;
        [p1, p2, p3]
    }
}

/// Inputs shared by every mode of one coefficient build.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SourceModel {
    pub dt: f64,
    pub c: f64,
    pub ep0: f64,
    pub update_with_rho: bool,
}

impl SourceModel {
    fn from_params(params: &PsatdParams) -> SourceModel {
        SourceModel {
            dt: params.dt,
            c: params.c,
            ep0: params.ep0,
            update_with_rho: params.update_with_rho,
        }
    }
}

/// Full-precision coefficients of a single mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeCoefficients {
    pub c: f64,
    pub s_ck: f64,
    pub t2: Complex64,
    pub x1: Complex64,
    pub x2: Complex64,
    pub x3: Complex64,
    pub x4: Complex64,
    pub x5: Complex64,
    pub psi1: Complex64,
    pub psi2: Complex64,
    pub y1: Complex64,
    pub y2: Complex64,
    pub y3: Complex64,
    pub y4: Complex64,
}

fn re(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

impl ModeCoefficients {
    /// `k_norm` is the norm of the modified wavevector, `w = k_c . v` the
    /// Galilean frequency. `w == 0` exactly (always true for v = 0 and for
    /// the zero mode) takes the real closed forms.
    pub(crate) fn new(k_norm: f64, w: f64, model: &SourceModel) -> ModeCoefficients {
        if w == 0.0 {
            ModeCoefficients::standard(k_norm, model)
        } else {
            ModeCoefficients::galilean(k_norm, w, model)
        }
    }

    fn standard(k_norm: f64, model: &SourceModel) -> ModeCoefficients {
        let SourceModel { dt, c, ep0, update_with_rho } = *model;
        let theta = c * k_norm * dt;
        let sc = sinc(theta);
        let g1 = f1(theta);
        let g2 = f2(theta);
        let g3 = f3(theta);
        let c2dt2 = c * c * dt * dt;
        let s_ck = dt * sc;

        let (x2, x3, y2, y3) = if update_with_rho {
            (
                c2dt2 * g2 / ep0,
                c2dt2 * (g2 - g1) / ep0,
                c2dt2 * g3 / ep0,
                c2dt2 * (g3 - g2) / ep0,
            )
        } else {
            (
                c2dt2 * g1,
                -c2dt2 * dt * g2 / ep0,
                c2dt2 * g2,
                -c2dt2 * dt * g3 / ep0,
            )
        };

        ModeCoefficients {
            c: theta.cos(),
            s_ck,
            t2: re(1.0),
            x1: re(dt * dt * g1 / ep0),
            x2: re(x2),
            x3: re(x3),
            x4: re(-s_ck / ep0),
            x5: re(dt * g1 / ep0),
            psi1: re(sc),
            psi2: re(dt * g1),
            y1: re(dt * dt * g2 / ep0),
            y2: re(y2),
            y3: re(y3),
            y4: re(-dt * g1 / ep0),
        }
    }

    /// Moments `∫_0^dt (dt-u)^n/n! e^{iwu} {cos ωu, sin(ωu)/ω} du` built from
    /// the φ functions of `i(w ± ω) dt`. Only valid for `k_norm > 0`.
    fn galilean(k_norm: f64, w: f64, model: &SourceModel) -> ModeCoefficients {
        let SourceModel { dt, c, ep0, update_with_rho } = *model;
        let omega = c * k_norm;
        let theta = omega * dt;
        let c2 = c * c;
        let k2 = k_norm * k_norm;
        let t2 = Complex64::from_polar(1.0, w * dt);

        let plus = phi(Complex64::new(0.0, (w + omega) * dt));
        let minus = phi(Complex64::new(0.0, (w - omega) * dt));
        let drift = phi(Complex64::new(0.0, w * dt));
        let two_i_omega = Complex64::new(0.0, 2.0 * omega);

        let mut scale = 1.0;
        let mut cos_moment = [Complex64::new(0.0, 0.0); 3];
        let mut sin_moment = [Complex64::new(0.0, 0.0); 3];
        for n in 0..3 {
            scale *= dt;
            cos_moment[n] = (plus[n] + minus[n]) * (0.5 * scale);
            sin_moment[n] = (plus[n] - minus[n]) * scale / two_i_omega;
        }
        let [m0c, m1c, _] = cos_moment;
        let [m0s, m1s, m2s] = sin_moment;
        // pure drift moments, no oscillation
        let m0w = drift[0] * dt;
        let m1w = drift[1] * dt * dt;

        let psi1 = m0c / dt;
        let y4 = -m1c / (ep0 * dt);

        let (x2, x3, y2, y3) = if update_with_rho {
            (
                c2 * m1s / (ep0 * dt),
                c2 * (m1s / dt - m0s) / (ep0 * t2),
                c2 * m2s / (ep0 * dt * dt),
                c2 * (m2s / (dt * dt) - m1s / dt) / ep0,
            )
        } else {
            (
                t2 * (c2 * dt * dt * f1(theta)),
                (m0c - m0w) / (ep0 * k2),
                (m0w / dt - psi1) / k2,
                -(y4 + m1w / (ep0 * dt)) / k2,
            )
        };

        ModeCoefficients {
            c: theta.cos(),
            s_ck: dt * sinc(theta),
            t2,
            x1: m0s / ep0,
            x2,
            x3,
            x4: -m0c / ep0,
            x5: m1c / (ep0 * dt),
            psi1,
            psi2: m0s / dt,
            y1: m1s / (ep0 * dt),
            y2,
            y3,
            y4,
        }
    }
}

/// Time-averaging kernels, only built when averaged fields are requested.
#[derive(Clone, Debug, PartialEq)]
pub struct AveragingCoefficients {
    pub psi1: Vec<Complex<Float>>,
    pub psi2: Vec<Complex<Float>>,
    pub y1: Vec<Complex<Float>>,
    pub y2: Vec<Complex<Float>>,
    pub y3: Vec<Complex<Float>>,
    pub y4: Vec<Complex<Float>>,
}

/// Flat, mode-indexed coefficient arrays of one solver.
#[derive(Clone, Debug, PartialEq)]
pub struct CoefficientSet {
    pub c: Vec<Float>,
    pub s_ck: Vec<Float>,
    pub t2: Vec<Complex<Float>>,
    pub x1: Vec<Complex<Float>>,
    pub x2: Vec<Complex<Float>>,
    pub x3: Vec<Complex<Float>>,
    pub x4: Vec<Complex<Float>>,
    /// rho weight of the F update, present with div(E) cleaning
    pub x5: Option<Vec<Complex<Float>>>,
    pub avg: Option<AveragingCoefficients>,
}

#[inline(always)]
fn cast(z: Complex64) -> Complex<Float> {
    Complex::new(z.re as Float, z.im as Float)
}

impl CoefficientSet {
    pub fn new(kspace: &SpectralKSpace, params: &PsatdParams) -> CoefficientSet {
        let model = SourceModel::from_params(params);
        let v = params.v_galilean;
        let n_modes = kspace.n_modes_total();

        let per_mode: Vec<ModeCoefficients> = (0..n_modes)
            .into_par_iter()
            .map(|m| {
                let k = kspace.modified_k_vec(m);
                let kc = kspace.modified_k_centered_vec(m);
                let k_norm = (k[0] * k[0] + k[1] * k[1] + k[2] * k[2]).sqrt();
                let w = kc[0] * v[0] + kc[1] * v[1] + kc[2] * v[2];
                ModeCoefficients::new(k_norm, w, &model)
            })
            .collect();

        let mut set = CoefficientSet {
            c: Vec::with_capacity(n_modes),
            s_ck: Vec::with_capacity(n_modes),
            t2: Vec::with_capacity(n_modes),
            x1: Vec::with_capacity(n_modes),
            x2: Vec::with_capacity(n_modes),
            x3: Vec::with_capacity(n_modes),
            x4: Vec::with_capacity(n_modes),
            x5: if params.dive_cleaning {
                Some(Vec::with_capacity(n_modes))
            } else {
                None
            },
            avg: if params.time_averaging {
                Some(AveragingCoefficients {
                    psi1: Vec::with_capacity(n_modes),
                    psi2: Vec::with_capacity(n_modes),
                    y1: Vec::with_capacity(n_modes),
                    y2: Vec::with_capacity(n_modes),
                    y3: Vec::with_capacity(n_modes),
                    y4: Vec::with_capacity(n_modes),
                })
            } else {
                None
            },
        };

        for mc in &per_mode {
            set.c.push(mc.c as Float);
            set.s_ck.push(mc.s_ck as Float);
            set.t2.push(cast(mc.t2));
            set.x1.push(cast(mc.x1));
            set.x2.push(cast(mc.x2));
            set.x3.push(cast(mc.x3));
            set.x4.push(cast(mc.x4));
            if let Some(x5) = set.x5.as_mut() {
                x5.push(cast(mc.x5));
            }
            if let Some(avg) = set.avg.as_mut() {
                avg.psi1.push(cast(mc.psi1));
                avg.psi2.push(cast(mc.psi2));
                avg.y1.push(cast(mc.y1));
                avg.y2.push(cast(mc.y2));
                avg.y3.push(cast(mc.y3));
                avg.y4.push(cast(mc.y4));
            }
        }
        set
    }

    pub fn n_modes(&self) -> usize {
        self.c.len()
    }

    /// True when every stored coefficient is finite.
    pub fn all_finite(&self) -> bool {
        let finite = |v: &Vec<Complex<Float>>| v.iter().all(|z| z.re.is_finite() && z.im.is_finite());
        let mut ok = self.c.iter().chain(&self.s_ck).all(|x| x.is_finite())
            && [&self.t2, &self.x1, &self.x2, &self.x3, &self.x4]
                .iter()
                .all(|v| finite(v));
        if let Some(x5) = &self.x5 {
            ok &= finite(x5);
        }
        if let Some(avg) = &self.avg {
            ok &= [&avg.psi1, &avg.psi2, &avg.y1, &avg.y2, &avg.y3, &avg.y4]
                .iter()
                .all(|v| finite(v));
        }
        ok
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::build_test_params;
    use crate::psatd::kspace::StencilOrder;

    fn model(update_with_rho: bool) -> SourceModel {
        SourceModel {
            dt: 0.07,
            c: 3.0,
            ep0: 0.5,
            update_with_rho,
        }
    }

    fn close(a: Complex64, b: Complex64, tol: f64) -> bool {
        (a - b).norm() <= tol * b.norm().max(1e-30)
    }

    /// Composite Simpson rule for a complex integrand on [0, dt].
    fn simpson<F: Fn(f64) -> Complex64>(f: F, dt: f64) -> Complex64 {
        let n = 2000;
        let h = dt / n as f64;
        let mut sum = f(0.0) + f(dt);
        for i in 1..n {
            let wgt = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += f(i as f64 * h) * wgt;
        }
        sum * (h / 3.0)
    }

    #[test]
    fn kernels_are_continuous_across_the_series_radius() {
        for &x in &[SERIES_RADIUS, -SERIES_RADIUS] {
            let below = x * (1.0 - 1e-12);
            let above = x * (1.0 + 1e-12);
            for f in &[sinc as fn(f64) -> f64, f1, f2, f3] {
                assert!((f(below) - f(above)).abs() < 1e-11);
            }
        }
        let z = Complex64::new(0.0, SERIES_RADIUS);
        let lo = phi(z * (1.0 - 1e-12));
        let hi = phi(z * (1.0 + 1e-12));
        for n in 0..3 {
            assert!((lo[n] - hi[n]).norm() < 1e-11);
        }
    }

    #[test]
    fn kernel_limits_at_zero() {
        assert_eq!(sinc(0.0), 1.0);
        assert_eq!(f1(0.0), 0.5);
        assert!((f2(0.0) - 1.0 / 6.0).abs() < 1e-16);
        assert!((f3(0.0) - 1.0 / 24.0).abs() < 1e-16);
        let p = phi(Complex64::new(0.0, 0.0));
        assert_eq!(p[0], Complex64::new(1.0, 0.0));
        assert_eq!(p[1], Complex64::new(0.5, 0.0));
        assert!((p[2].re - 1.0 / 6.0).abs() < 1e-16);
    }

    #[test]
    fn zero_mode_limits() {
        let m = model(true);
        let mc = ModeCoefficients::new(0.0, 0.0, &m);
        assert_eq!(mc.c, 1.0);
        assert_eq!(mc.s_ck, m.dt);
        assert_eq!(mc.t2, re(1.0));
        assert_eq!(mc.x4, re(-m.dt / m.ep0));
        assert_eq!(mc.x1, re(0.5 * m.dt * m.dt / m.ep0));
        assert_eq!(mc.psi1, re(1.0));
        assert!(close(mc.x3, re(-m.c * m.c * m.dt * m.dt / (3.0 * m.ep0)), 1e-14));
        assert!(close(mc.y3, re(-m.c * m.c * m.dt * m.dt / (8.0 * m.ep0)), 1e-14));
    }

    #[test]
    fn standard_path_matches_closed_forms() {
        for &rho in &[true, false] {
            let m = model(rho);
            let k = 4.2;
            let omega = m.c * k;
            let theta = omega * m.dt;
            let (cc, s) = (theta.cos(), theta.sin() / omega);
            let mc = ModeCoefficients::new(k, 0.0, &m);
            let ep0 = m.ep0;
            let c2 = m.c * m.c;
            assert!((mc.c - cc).abs() < 1e-15);
            assert!((mc.s_ck - s).abs() < 1e-15);
            assert!(close(mc.x1, re((1.0 - cc) / (ep0 * omega * omega)), 1e-12));
            assert!(close(mc.x4, re(-s / ep0), 1e-12));
            if rho {
                assert!(close(mc.x2, re(c2 * (1.0 - s / m.dt) / (ep0 * omega * omega)), 1e-12));
                assert!(close(mc.x3, re(c2 * (cc - s / m.dt) / (ep0 * omega * omega)), 1e-12));
            } else {
                assert!(close(mc.x2, re((1.0 - cc) / (k * k)), 1e-12));
                assert!(close(mc.x3, re((s - m.dt) / (ep0 * k * k)), 1e-12));
            }
        }
    }

    #[test]
    fn galilean_moments_match_quadrature() {
        let m = model(true);
        let (k, w) = (5.0, 7.5);
        let omega = m.c * k;
        let mc = ModeCoefficients::new(k, w, &m);
        let i = Complex64::new(0.0, 1.0);
        let drift = |u: f64| (i * w * u).exp();

        let m0c = simpson(|u| drift(u) * (omega * u).cos(), m.dt);
        let m0s = simpson(|u| drift(u) * (omega * u).sin() / omega, m.dt);
        let m1c = simpson(|u| drift(u) * (omega * u).cos() * (m.dt - u), m.dt);
        let m1s = simpson(|u| drift(u) * (omega * u).sin() / omega * (m.dt - u), m.dt);

        assert!(close(mc.t2, (i * w * m.dt).exp(), 1e-14));
        assert!(close(mc.x4, -m0c / m.ep0, 1e-10));
        assert!(close(mc.x1, m0s / m.ep0, 1e-10));
        assert!(close(mc.x5, m1c / (m.ep0 * m.dt), 1e-10));
        assert!(close(mc.x2, m.c * m.c * m1s / (m.ep0 * m.dt), 1e-10));
        assert!(close(mc.psi2, m0s / m.dt, 1e-10));
    }

    #[test]
    fn galilean_path_tends_to_standard_path() {
        for &rho in &[true, false] {
            let m = model(rho);
            let k = 3.3;
            let still = ModeCoefficients::new(k, 0.0, &m);
            let moving = ModeCoefficients::new(k, 1e-7, &m);
            for (a, b) in [
                (moving.x1, still.x1),
                (moving.x2, still.x2),
                (moving.x3, still.x3),
                (moving.x4, still.x4),
                (moving.x5, still.x5),
                (moving.psi1, still.psi1),
                (moving.psi2, still.psi2),
                (moving.y1, still.y1),
                (moving.y2, still.y2),
                (moving.y3, still.y3),
                (moving.y4, still.y4),
            ] {
                assert!(close(a, b, 1e-6));
            }
        }
    }

    #[test]
    fn zero_velocity_gives_standard_coefficients() {
        let mut params = build_test_params();
        params.time_averaging = true;
        params.dive_cleaning = true;
        let solver = crate::psatd::PsatdSolver::new(params).unwrap();
        let coefs = solver.coefficients();
        assert!(coefs.all_finite());
        assert!(coefs.t2.iter().all(|t| *t == Complex::new(1.0, 0.0)));
        assert!(coefs.x1.iter().all(|x| x.im == 0.0));
    }

    #[test]
    fn modes_without_drift_are_bitwise_standard() {
        let mut params = build_test_params();
        params.n_cells = [8, 6, 4];
        params.dx = [0.5, 0.4, 0.3];
        params.norder = [StencilOrder::Finite(8); 3];
        params.time_averaging = true;
        params.update_with_rho = false;
        let still = crate::psatd::PsatdSolver::new(params.clone()).unwrap();
        params.v_galilean = [0.0, 0.0, 0.4 * params.c];
        let moving = crate::psatd::PsatdSolver::new(params).unwrap();

        let (a, b) = (still.coefficients(), moving.coefficients());
        assert!(b.all_finite());
        let mut n_checked = 0;
        for m in 0..a.n_modes() {
            // the collocated Nyquist plane along z has no drift either
            if still.kspace().modified_k_centered_vec(m)[2] != 0.0 {
                assert_ne!(b.t2[m], Complex::new(1.0, 0.0));
                continue;
            }
            n_checked += 1;
            assert_eq!(a.t2[m], b.t2[m]);
            assert_eq!(a.x1[m], b.x1[m]);
            assert_eq!(a.x2[m], b.x2[m]);
            assert_eq!(a.x3[m], b.x3[m]);
            assert_eq!(a.x4[m], b.x4[m]);
            let (aa, ba) = (a.avg.as_ref().unwrap(), b.avg.as_ref().unwrap());
            assert_eq!(aa.y2[m], ba.y2[m]);
            assert_eq!(aa.y3[m], ba.y3[m]);
        }
        assert_eq!(n_checked, 8 * 6 * 2);
    }
}
