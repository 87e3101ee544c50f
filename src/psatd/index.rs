use crate::Float;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

/// Named quantities stored in a `SpectralFieldData` arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldComp {
    Ex,
    Ey,
    Ez,
    Bx,
    By,
    Bz,
    Jx,
    Jy,
    Jz,
    RhoOld,
    RhoNew,
    F,
    G,
    ExAvg,
    EyAvg,
    EzAvg,
    BxAvg,
    ByAvg,
    BzAvg,
}

impl FieldComp {
    pub const ALL: [FieldComp; 19] = [
        FieldComp::Ex,
        FieldComp::Ey,
        FieldComp::Ez,
        FieldComp::Bx,
        FieldComp::By,
        FieldComp::Bz,
        FieldComp::Jx,
        FieldComp::Jy,
        FieldComp::Jz,
        FieldComp::RhoOld,
        FieldComp::RhoNew,
        FieldComp::F,
        FieldComp::G,
        FieldComp::ExAvg,
        FieldComp::EyAvg,
        FieldComp::EzAvg,
        FieldComp::BxAvg,
        FieldComp::ByAvg,
        FieldComp::BzAvg,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FieldComp::Ex => "ex",
            FieldComp::Ey => "ey",
            FieldComp::Ez => "ez",
            FieldComp::Bx => "bx",
            FieldComp::By => "by",
            FieldComp::Bz => "bz",
            FieldComp::Jx => "jx",
            FieldComp::Jy => "jy",
            FieldComp::Jz => "jz",
            FieldComp::RhoOld => "rho_old",
            FieldComp::RhoNew => "rho_new",
            FieldComp::F => "f",
            FieldComp::G => "g",
            FieldComp::ExAvg => "ex_avg",
            FieldComp::EyAvg => "ey_avg",
            FieldComp::EzAvg => "ez_avg",
            FieldComp::BxAvg => "bx_avg",
            FieldComp::ByAvg => "by_avg",
            FieldComp::BzAvg => "bz_avg",
        }
    }
}

/// Slot numbers of every quantity the solver works with. The always-present
/// slots come first, optional ones follow in a fixed order, so the mapping
/// only depends on the capability flags and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpectralFieldIndex {
    pub ex: usize,
    pub ey: usize,
    pub ez: usize,
    pub bx: usize,
    pub by: usize,
    pub bz: usize,
    pub jx: usize,
    pub jy: usize,
    pub jz: usize,
    pub rho_old: usize,
    pub rho_new: usize,
    pub f: Option<usize>,
    pub g: Option<usize>,
    pub e_avg: Option<[usize; 3]>,
    pub b_avg: Option<[usize; 3]>,
    n_comps: usize,
}

impl SpectralFieldIndex {
    pub fn new(dive_cleaning: bool, divb_cleaning: bool, time_averaging: bool) -> SpectralFieldIndex {
        let mut n_comps = 11;
        let mut alloc = |n: usize| {
            n_comps += n;
            n_comps - n
        };
        let f = if dive_cleaning { Some(alloc(1)) } else { None };
        let g = if divb_cleaning { Some(alloc(1)) } else { None };
        let mut alloc_vec = || {
            let s = alloc(3);
            [s, s + 1, s + 2]
        };
        let e_avg = if time_averaging { Some(alloc_vec()) } else { None };
        let b_avg = if time_averaging { Some(alloc_vec()) } else { None };

        SpectralFieldIndex {
            ex: 0,
            ey: 1,
            ez: 2,
            bx: 3,
            by: 4,
            bz: 5,
            jx: 6,
            jy: 7,
            jz: 8,
            rho_old: 9,
            rho_new: 10,
            f,
            g,
            e_avg,
            b_avg,
            n_comps,
        }
    }

    pub fn n_comps(&self) -> usize {
        self.n_comps
    }

    pub fn slot(&self, comp: FieldComp) -> Option<usize> {
        match comp {
            FieldComp::Ex => Some(self.ex),
            FieldComp::Ey => Some(self.ey),
            FieldComp::Ez => Some(self.ez),
            FieldComp::Bx => Some(self.bx),
            FieldComp::By => Some(self.by),
            FieldComp::Bz => Some(self.bz),
            FieldComp::Jx => Some(self.jx),
            FieldComp::Jy => Some(self.jy),
            FieldComp::Jz => Some(self.jz),
            FieldComp::RhoOld => Some(self.rho_old),
            FieldComp::RhoNew => Some(self.rho_new),
            FieldComp::F => self.f,
            FieldComp::G => self.g,
            FieldComp::ExAvg => self.e_avg.map(|s| s[0]),
            FieldComp::EyAvg => self.e_avg.map(|s| s[1]),
            FieldComp::EzAvg => self.e_avg.map(|s| s[2]),
            FieldComp::BxAvg => self.b_avg.map(|s| s[0]),
            FieldComp::ByAvg => self.b_avg.map(|s| s[1]),
            FieldComp::BzAvg => self.b_avg.map(|s| s[2]),
        }
    }

    /// Inverse of `slot`.
    pub fn comp(&self, slot: usize) -> Option<FieldComp> {
        FieldComp::ALL
            .iter()
            .copied()
            .find(|&c| self.slot(c) == Some(slot))
    }

    /// Quantities present in this layout, in slot order.
    pub fn comps(&self) -> Vec<FieldComp> {
        (0..self.n_comps).filter_map(|s| self.comp(s)).collect()
    }
}

/// Complex spectral data of one patch, stored mode-major: the `n_comps`
/// values of mode `m` sit contiguously at `m * n_comps..(m + 1) * n_comps`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectralFieldData {
    data: Vec<Complex<Float>>,
    n_comps: usize,
    n_modes: usize,
}

impl SpectralFieldData {
    pub fn new(index: &SpectralFieldIndex, n_modes: usize) -> SpectralFieldData {
        SpectralFieldData {
            data: vec![Complex::zero(); index.n_comps() * n_modes],
            n_comps: index.n_comps(),
            n_modes,
        }
    }

    pub fn n_comps(&self) -> usize {
        self.n_comps
    }

    pub fn n_modes(&self) -> usize {
        self.n_modes
    }

    #[inline(always)]
    pub fn get(&self, mode: usize, slot: usize) -> Complex<Float> {
        self.data[mode * self.n_comps + slot]
    }

    #[inline(always)]
    pub fn set(&mut self, mode: usize, slot: usize, val: Complex<Float>) {
        self.data[mode * self.n_comps + slot] = val;
    }

    pub fn mode(&self, mode: usize) -> &[Complex<Float>] {
        &self.data[mode * self.n_comps..(mode + 1) * self.n_comps]
    }

    pub fn mode_mut(&mut self, mode: usize) -> &mut [Complex<Float>] {
        &mut self.data[mode * self.n_comps..(mode + 1) * self.n_comps]
    }

    pub(crate) fn par_modes_mut(&mut self) -> rayon::slice::ChunksMut<'_, Complex<Float>> {
        self.data.par_chunks_mut(self.n_comps)
    }

    /// Gathers one slot into a contiguous buffer, e.g. before an inverse FFT.
    pub fn copy_slot_to(&self, slot: usize, out: &mut [Complex<Float>]) {
        if !cfg!(feature = "unchecked") {
            assert!(slot < self.n_comps);
            assert_eq!(out.len(), self.n_modes);
        }
        for (o, chunk) in out.iter_mut().zip(self.data.chunks_exact(self.n_comps)) {
            *o = chunk[slot];
        }
    }

    /// Scatters a contiguous buffer into one slot, e.g. after a forward FFT.
    pub fn copy_slot_from(&mut self, slot: usize, input: &[Complex<Float>]) {
        if !cfg!(feature = "unchecked") {
            assert!(slot < self.n_comps);
            assert_eq!(input.len(), self.n_modes);
        }
        let n_comps = self.n_comps;
        for (v, chunk) in input.iter().zip(self.data.chunks_exact_mut(n_comps)) {
            chunk[slot] = *v;
        }
    }

    pub fn zero_slot(&mut self, slot: usize) {
        let n_comps = self.n_comps;
        for chunk in self.data.chunks_exact_mut(n_comps) {
            chunk[slot] = Complex::zero();
        }
    }

    /// First `(slot, mode)` among `slots` holding a NaN or infinite value.
    pub fn find_non_finite(&self, slots: &[usize]) -> Option<(usize, usize)> {
        self.data
            .par_chunks(self.n_comps)
            .enumerate()
            .find_map_first(|(m, chunk)| {
                slots
                    .iter()
                    .find(|&&s| !(chunk[s].re.is_finite() && chunk[s].im.is_finite()))
                    .map(|&s| (s, m))
            })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn base_layout_has_eleven_slots() {
        let idx = SpectralFieldIndex::new(false, false, false);
        assert_eq!(idx.n_comps(), 11);
        assert_eq!(idx.slot(FieldComp::F), None);
        assert_eq!(idx.slot(FieldComp::G), None);
        assert_eq!(idx.slot(FieldComp::ExAvg), None);
        assert_eq!(idx.slot(FieldComp::RhoNew), Some(10));
    }

    #[test]
    fn slots_form_a_bijection() {
        for &(fe, fb, avg) in &[
            (false, false, false),
            (true, false, false),
            (false, true, true),
            (true, true, true),
        ] {
            let idx = SpectralFieldIndex::new(fe, fb, avg);
            let comps = idx.comps();
            assert_eq!(comps.len(), idx.n_comps());
            for (slot, comp) in comps.iter().enumerate() {
                assert_eq!(idx.slot(*comp), Some(slot));
                assert_eq!(idx.comp(slot), Some(*comp));
            }
            assert_eq!(idx.f.is_some(), fe);
            assert_eq!(idx.g.is_some(), fb);
            assert_eq!(idx.e_avg.is_some(), avg);
            assert_eq!(idx.n_comps(), 11 + fe as usize + fb as usize + 6 * avg as usize);
        }
    }

    #[test]
    fn averaged_slots_follow_cleaning_slots() {
        let idx = SpectralFieldIndex::new(true, true, true);
        assert_eq!(idx.f, Some(11));
        assert_eq!(idx.g, Some(12));
        assert_eq!(idx.e_avg, Some([13, 14, 15]));
        assert_eq!(idx.b_avg, Some([16, 17, 18]));
    }

    #[test]
    fn gather_scatter_slot() {
        let idx = SpectralFieldIndex::new(false, true, false);
        let mut data = SpectralFieldData::new(&idx, 5);
        let vals: Vec<Complex<Float>> = (0..5).map(|i| Complex::new(i as Float, -1.0)).collect();
        data.copy_slot_from(idx.jy, &vals);
        assert_eq!(data.get(3, idx.jy), Complex::new(3.0, -1.0));
        assert_eq!(data.mode(3)[idx.jy], Complex::new(3.0, -1.0));
        assert_eq!(data.get(3, idx.jx), Complex::zero());

        let mut out = vec![Complex::zero(); 5];
        data.copy_slot_to(idx.jy, &mut out);
        assert_eq!(out, vals);

        data.zero_slot(idx.jy);
        assert!(data.mode(3).iter().all(|v| v.is_zero()));
    }

    #[test]
    fn non_finite_values_are_located() {
        let idx = SpectralFieldIndex::new(false, false, false);
        let mut data = SpectralFieldData::new(&idx, 8);
        let all: Vec<usize> = (0..idx.n_comps()).collect();
        assert_eq!(data.find_non_finite(&all), None);
        data.set(6, idx.rho_old, Complex::new(0.0, Float::NAN));
        data.set(7, idx.bx, Complex::new(Float::INFINITY, 0.0));
        assert_eq!(data.find_non_finite(&all), Some((idx.rho_old, 6)));
        assert_eq!(data.find_non_finite(&[idx.bx, idx.ex]), Some((idx.bx, 7)));
        assert_eq!(data.find_non_finite(&[idx.jz]), None);
    }
}
