use crate::psatd::error::{PsatdError, Result};
use crate::psatd::{GridType, SpectralLayout};
use itertools::izip;
use strength_reduce::StrengthReducedUsize;

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Order of the finite-difference stencil the modified wavevector mimics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StencilOrder {
    Finite(usize),
    Infinite,
}

impl StencilOrder {
    /// Config files use `-1` for the spectral-exact (infinite order) stencil.
    pub fn from_config(axis: usize, order: i64) -> Result<StencilOrder> {
        if order == -1 {
            return Ok(StencilOrder::Infinite);
        }
        if order <= 0 || order % 2 != 0 {
            return Err(PsatdError::InvalidStencilOrder { axis, order });
        }
        Ok(StencilOrder::Finite(order as usize))
    }

    pub(crate) fn validate(&self, axis: usize) -> Result<()> {
        match *self {
            StencilOrder::Finite(p) if p == 0 || p % 2 != 0 => Err(PsatdError::InvalidStencilOrder {
                axis,
                order: p as i64,
            }),
            _ => Ok(()),
        }
    }
}

/// Finite-difference weights `a_0..a_{m-1}` of a stencil of order `2m`.
pub fn stencil_coefficients(order: usize, grid_type: GridType) -> Vec<f64> {
    let m = order / 2;
    let mut coefs = Vec::with_capacity(m);
    if m == 0 {
        return coefs;
    }
    let mf = m as f64;
    match grid_type {
        GridType::Collocated => {
            coefs.push(2.0 * mf / (mf + 1.0));
            for n in 1..m {
                let nf = n as f64;
                let prev = coefs[n - 1];
                coefs.push(-(mf - nf) / (mf + nf + 1.0) * prev);
            }
        }
        GridType::Staggered => {
            let prod: f64 = (1..=m)
                .map(|q| (mf + q as f64) / (4.0 * q as f64))
                .product();
            coefs.push(4.0 * mf * prod * prod);
            for n in 1..m {
                let nf = n as f64;
                let prev = coefs[n - 1];
                coefs.push(-((2.0 * nf - 1.0) * (mf - nf)) / ((2.0 * nf + 1.0) * (mf + nf)) * prev);
            }
        }
    }
    coefs
}

/// Raw wavenumbers of one axis in FFT order. With `half` only the
/// `n/2 + 1` non-negative modes of a real-to-complex transform are kept.
fn raw_k_component(n: usize, dx: f64, half: bool) -> Vec<f64> {
    let dk = TWO_PI / (n as f64 * dx);
    if half {
        return (0..n / 2 + 1).map(|i| i as f64 * dk).collect();
    }
    let mid = (n + 1) / 2;
    (0..n)
        .map(|i| {
            if i < mid {
                i as f64 * dk
            } else {
                (i as f64 - n as f64) * dk
            }
        })
        .collect()
}

fn modified_k_component(
    k: &[f64],
    n: usize,
    dx: f64,
    order: StencilOrder,
    grid_type: GridType,
) -> Vec<f64> {
    let p = match order {
        StencilOrder::Infinite => return k.to_vec(),
        StencilOrder::Finite(p) => p,
    };
    let coefs = stencil_coefficients(p, grid_type);
    let mut k_mod: Vec<f64> = k
        .iter()
        .map(|&kv| {
            coefs
                .iter()
                .enumerate()
                .map(|(idx, a)| {
                    let shift = match grid_type {
                        GridType::Collocated => (idx + 1) as f64,
                        GridType::Staggered => idx as f64 + 0.5,
                    };
                    a * (shift * kv * dx).sin() / (shift * dx)
                })
                .sum()
        })
        .collect();

    // A centered difference cannot see the Nyquist mode; the sine sum only
    // vanishes to rounding there, so pin it.
    if grid_type == GridType::Collocated && n % 2 == 0 && n > 1 {
        if let Some(v) = k_mod.get_mut(n / 2) {
            *v = 0.0;
        }
    }
    k_mod
}

/// Splits a flat mode index `m = i + nx (j + ny l)` into its axis indices.
#[derive(Clone, Copy, Debug)]
pub struct ModeDecomposer {
    nx: StrengthReducedUsize,
    ny: StrengthReducedUsize,
}

impl ModeDecomposer {
    pub fn new(n_modes: [usize; 3]) -> ModeDecomposer {
        ModeDecomposer {
            nx: StrengthReducedUsize::new(n_modes[0]),
            ny: StrengthReducedUsize::new(n_modes[1]),
        }
    }

    #[inline(always)]
    pub fn split(&self, m: usize) -> [usize; 3] {
        let (rest, i) = StrengthReducedUsize::div_rem(m, self.nx);
        let (l, j) = StrengthReducedUsize::div_rem(rest, self.ny);
        [i, j, l]
    }
}

/// Wavevector components of one spectral patch.
///
/// Three arrays per axis: the raw wavenumbers, the modified ones matching
/// the finite-order stencil of the grid, and the modified ones of the
/// collocated (centered) stencil used for the Galilean phase `k_c . v`.
/// None of them depends on the time step.
#[derive(Clone, Debug)]
pub struct SpectralKSpace {
    n_modes: [usize; 3],
    k: [Vec<f64>; 3],
    k_mod: [Vec<f64>; 3],
    k_mod_centered: [Vec<f64>; 3],
    decomposer: ModeDecomposer,
}

impl SpectralKSpace {
    pub fn new(
        n_cells: [usize; 3],
        dx: [f64; 3],
        norder: [StencilOrder; 3],
        grid_type: GridType,
        layout: SpectralLayout,
    ) -> SpectralKSpace {
        let mut k: [Vec<f64>; 3] = Default::default();
        let mut k_mod: [Vec<f64>; 3] = Default::default();
        let mut k_mod_centered: [Vec<f64>; 3] = Default::default();
        let mut n_modes = [1; 3];

        for (axis, (&n, &d, &order)) in izip!(&n_cells, &dx, &norder).enumerate() {
            let half = axis == 0 && layout == SpectralLayout::RealToComplex;
            let raw = raw_k_component(n, d, half);
            n_modes[axis] = raw.len();
            k_mod[axis] = modified_k_component(&raw, n, d, order, grid_type);
            k_mod_centered[axis] = modified_k_component(&raw, n, d, order, GridType::Collocated);
            k[axis] = raw;
        }

        SpectralKSpace {
            n_modes,
            k,
            k_mod,
            k_mod_centered,
            decomposer: ModeDecomposer::new(n_modes),
        }
    }

    pub fn n_modes(&self) -> [usize; 3] {
        self.n_modes
    }

    pub fn n_modes_total(&self) -> usize {
        self.n_modes.iter().product()
    }

    pub fn k(&self, axis: usize) -> &[f64] {
        &self.k[axis]
    }

    pub fn modified_k(&self, axis: usize) -> &[f64] {
        &self.k_mod[axis]
    }

    pub fn modified_k_centered(&self, axis: usize) -> &[f64] {
        &self.k_mod_centered[axis]
    }

    pub fn decomposer(&self) -> ModeDecomposer {
        self.decomposer
    }

    /// Modified wavevector of flat mode `m`.
    #[inline(always)]
    pub fn modified_k_vec(&self, m: usize) -> [f64; 3] {
        let [i, j, l] = self.decomposer.split(m);
        [self.k_mod[0][i], self.k_mod[1][j], self.k_mod[2][l]]
    }

    #[inline(always)]
    pub fn modified_k_centered_vec(&self, m: usize) -> [f64; 3] {
        let [i, j, l] = self.decomposer.split(m);
        [
            self.k_mod_centered[0][i],
            self.k_mod_centered[1][j],
            self.k_mod_centered[2][l],
        ]
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::E_TOL;

    fn kspace_1d(n: usize, dx: f64, order: StencilOrder, grid_type: GridType) -> SpectralKSpace {
        SpectralKSpace::new(
            [n, 1, 1],
            [dx, 1.0, 1.0],
            [order, StencilOrder::Infinite, StencilOrder::Infinite],
            grid_type,
            SpectralLayout::Complex,
        )
    }

    #[test]
    fn raw_k_follows_fft_order() {
        let ks = kspace_1d(8, 0.5, StencilOrder::Infinite, GridType::Collocated);
        let dk = TWO_PI / 4.0;
        let expected = [0., 1., 2., 3., -4., -3., -2., -1.];
        assert_eq!(ks.k(0).len(), 8);
        for (k, e) in ks.k(0).iter().zip(expected.iter()) {
            assert!((k - e * dk).abs() < 1e-12);
        }
        // odd counts have no Nyquist mode
        let ks = kspace_1d(5, 1.0, StencilOrder::Infinite, GridType::Collocated);
        let expected = [0., 1., 2., -2., -1.];
        for (k, e) in ks.k(0).iter().zip(expected.iter()) {
            assert!((k - e * TWO_PI / 5.0).abs() < 1e-12);
        }
    }

    #[test]
    fn real_to_complex_keeps_non_negative_modes() {
        let ks = SpectralKSpace::new(
            [8, 4, 1],
            [1.0; 3],
            [StencilOrder::Infinite; 3],
            GridType::Collocated,
            SpectralLayout::RealToComplex,
        );
        assert_eq!(ks.n_modes(), [5, 4, 1]);
        assert_eq!(ks.n_modes_total(), 20);
        assert!(ks.k(0).iter().all(|&k| k >= 0.0));
        assert_eq!(ks.k(2), &[0.0]);
    }

    #[test]
    fn second_order_stencils() {
        let dx = 0.3;
        let ks = kspace_1d(16, dx, StencilOrder::Finite(2), GridType::Collocated);
        for (k, km) in ks.k(0).iter().zip(ks.modified_k(0)) {
            if (k.abs() - std::f64::consts::PI / dx).abs() < 1e-9 {
                assert_eq!(*km, 0.0);
            } else {
                assert!((km - (k * dx).sin() / dx).abs() < 1e-12);
            }
        }
        let ks = kspace_1d(16, dx, StencilOrder::Finite(2), GridType::Staggered);
        for (k, km) in ks.k(0).iter().zip(ks.modified_k(0)) {
            assert!((km - (0.5 * k * dx).sin() / (0.5 * dx)).abs() < 1e-12);
        }
        // the centered variant is always the collocated stencil
        for (k, km) in ks.k(0).iter().zip(ks.modified_k_centered(0)) {
            if (k.abs() - std::f64::consts::PI / dx).abs() > 1e-9 {
                assert!((km - (k * dx).sin() / dx).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn fourth_order_collocated_weights() {
        let coefs = stencil_coefficients(4, GridType::Collocated);
        assert_eq!(coefs.len(), 2);
        assert!((coefs[0] - 4.0 / 3.0).abs() < 1e-15);
        assert!((coefs[1] + 1.0 / 3.0).abs() < 1e-15);
        let coefs = stencil_coefficients(4, GridType::Staggered);
        assert!((coefs[0] - 9.0 / 8.0).abs() < 1e-15);
        assert!((coefs[1] + 1.0 / 8.0).abs() < 1e-15);
    }

    #[test]
    fn high_order_converges_to_raw_k() {
        let ks = kspace_1d(64, 1.0, StencilOrder::Finite(64), GridType::Staggered);
        for (k, km) in ks.k(0).iter().zip(ks.modified_k(0)).take(12) {
            assert!((k - km).abs() < 1e-6 * k.abs().max(1.0));
        }
    }

    #[test]
    fn infinite_order_is_raw() {
        let ks = kspace_1d(12, 0.1, StencilOrder::Infinite, GridType::Collocated);
        assert_eq!(ks.k(0), ks.modified_k(0));
        assert_eq!(ks.k(0), ks.modified_k_centered(0));
    }

    #[test]
    fn collapsed_axis_has_one_zero_mode() {
        let ks = SpectralKSpace::new(
            [6, 1, 1],
            [1.0; 3],
            [StencilOrder::Finite(8); 3],
            GridType::Staggered,
            SpectralLayout::Complex,
        );
        assert_eq!(ks.modified_k(1), &[0.0]);
        assert_eq!(ks.modified_k(2), &[0.0]);
    }

    #[test]
    fn flat_mode_index_is_x_fastest() {
        let ks = SpectralKSpace::new(
            [4, 3, 2],
            [1.0; 3],
            [StencilOrder::Infinite; 3],
            GridType::Collocated,
            SpectralLayout::Complex,
        );
        let dec = ks.decomposer();
        let mut m = 0;
        for l in 0..2 {
            for j in 0..3 {
                for i in 0..4 {
                    assert_eq!(dec.split(m), [i, j, l]);
                    let kv = ks.modified_k_vec(m);
                    assert!((kv[0] - ks.k(0)[i]).abs() < E_TOL as f64);
                    m += 1;
                }
            }
        }
    }

    #[test]
    fn stencil_order_from_config() {
        assert_eq!(StencilOrder::from_config(0, -1), Ok(StencilOrder::Infinite));
        assert_eq!(StencilOrder::from_config(1, 16), Ok(StencilOrder::Finite(16)));
        assert_eq!(
            StencilOrder::from_config(2, 3),
            Err(PsatdError::InvalidStencilOrder { axis: 2, order: 3 })
        );
        assert!(StencilOrder::from_config(0, 0).is_err());
        assert!(StencilOrder::from_config(0, -4).is_err());
    }
}
