use crate::fft::Fft2D;
use crate::psatd::{CurrentTreatment, FieldComp, PsatdSolver, SpectralFieldData};
use crate::{Config, Float, PI};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_distr::StandardNormal;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;

/// Periodic 2D vacuum run: one spectral patch covering the whole box.
pub struct Sim {
    pub t_final: u32,
    pub size_x: usize,
    pub size_y: usize,
    pub delta_x: f64,
    pub delta_y: f64,
    pub solver: PsatdSolver,
    pub fields: SpectralFieldData,
    fft: Fft2D,
    buf: Vec<Complex<Float>>,
}

impl Sim {
    pub fn new(cfg: &Config) -> Result<Sim> {
        let params = cfg.psatd_params()?;
        let solver = PsatdSolver::new(params).context("Could not build the PSATD solver")?;
        let fields = solver.new_field_data();
        let size_x = cfg.params.size_x;
        let size_y = cfg.params.size_y;
        Ok(Sim {
            t_final: cfg.setup.t_final,
            size_x,
            size_y,
            delta_x: cfg.params.delta_x,
            delta_y: cfg.params.delta_y,
            solver,
            fields,
            fft: Fft2D::new(size_x, size_y),
            buf: vec![Complex::zero(); size_x * size_y],
        })
    }

    /// Loads a real-space array into one spectral slot.
    pub fn load_spatial(&mut self, comp: FieldComp, spatial: &[Float]) -> Result<()> {
        let slot = self
            .solver
            .index()
            .slot(comp)
            .with_context(|| format!("{} is not part of this field layout", comp.name()))?;
        for (b, v) in self.buf.iter_mut().zip(spatial.iter()) {
            *b = Complex::new(*v, 0.0);
        }
        self.fft.fft(&mut self.buf);
        self.fields.copy_slot_from(slot, &self.buf);
        Ok(())
    }

    /// Real part of the inverse transform of one spectral slot.
    pub fn spatial(&mut self, comp: FieldComp) -> Option<Vec<Float>> {
        let slot = self.solver.index().slot(comp)?;
        self.fields.copy_slot_to(slot, &mut self.buf);
        self.fft.inv_fft(&mut self.buf);
        Some(self.buf.iter().map(|v| v.re).collect())
    }

    /// Vacuum plane wave with E along z and wavevector (mode_x, mode_y),
    /// plus optional white noise on Ez.
    pub fn init_plane_wave(&mut self, mode_x: usize, mode_y: usize, amplitude: Float, noise: Float) -> Result<()> {
        let kx = 2.0 * PI * mode_x as f64 / (self.size_x as f64 * self.delta_x);
        let ky = 2.0 * PI * mode_y as f64 / (self.size_y as f64 * self.delta_y);
        // B = k x E / omega with the modified wavenumbers, so the wave is an
        // exact eigenmode of the discrete update.
        let kspace = self.solver.kspace();
        let kx_mod = kspace.modified_k(0)[mode_x % self.size_x];
        let ky_mod = kspace.modified_k(1)[mode_y % self.size_y];
        let omega = self.solver.params().c * (kx_mod * kx_mod + ky_mod * ky_mod).sqrt();
        let (bx_amp, by_amp) = if omega > 0.0 {
            (ky_mod / omega, -kx_mod / omega)
        } else {
            (0.0, 0.0)
        };

        let mut rng = thread_rng();
        let n = self.size_x * self.size_y;
        let mut ez = Vec::with_capacity(n);
        let mut bx = Vec::with_capacity(n);
        let mut by = Vec::with_capacity(n);
        for iy in 0..self.size_y {
            for ix in 0..self.size_x {
                let phase = kx * ix as f64 * self.delta_x + ky * iy as f64 * self.delta_y;
                let wave = amplitude * phase.cos() as Float;
                let jitter: Float = if noise != 0.0 {
                    noise * rng.sample::<Float, _>(StandardNormal)
                } else {
                    0.0
                };
                ez.push(wave + jitter);
                bx.push(bx_amp as Float * wave);
                by.push(by_amp as Float * wave);
            }
        }
        self.load_spatial(FieldComp::Ez, &ez)?;
        self.load_spatial(FieldComp::Bx, &bx)?;
        self.load_spatial(FieldComp::By, &by)?;
        Ok(())
    }

    /// Electromagnetic energy of the box, `Σ (ε0 E² + B²/μ0)/2 dV`, summed
    /// over modes with Parseval's theorem.
    pub fn energy(&self) -> f64 {
        let params = self.solver.params();
        let idx = self.solver.index();
        let ep0 = params.ep0;
        let inv_mu0 = ep0 * params.c * params.c;
        let n_cells = (self.size_x * self.size_y) as f64;
        let d_v = self.delta_x * self.delta_y;
        let sum: f64 = (0..self.fields.n_modes())
            .map(|m| {
                let fld = self.fields.mode(m);
                let e2: f64 = [idx.ex, idx.ey, idx.ez]
                    .iter()
                    .map(|&s| fld[s].norm_sqr() as f64)
                    .sum();
                let b2: f64 = [idx.bx, idx.by, idx.bz]
                    .iter()
                    .map(|&s| fld[s].norm_sqr() as f64)
                    .sum();
                ep0 * e2 + inv_mu0 * b2
            })
            .sum();
        0.5 * sum * d_v / n_cells
    }

    /// One PSATD step. The demo has no particles, so J and rho stay at
    /// whatever was loaded, except that Vay D moments are consumed by the
    /// step and must be loaded again before the next one.
    pub fn step(&mut self) -> Result<()> {
        let treatment = self.solver.params().current_treatment;
        match treatment {
            CurrentTreatment::Direct => {}
            CurrentTreatment::Correction => self.solver.correct_current(&mut self.fields)?,
            CurrentTreatment::Vay => self.solver.vay_deposition(&mut self.fields)?,
        }
        self.solver.push_spectral_fields(&mut self.fields)?;
        if treatment == CurrentTreatment::Vay {
            let idx = self.solver.index();
            for &s in &[idx.jx, idx.jy, idx.jz] {
                self.fields.zero_slot(s);
            }
        }
        Ok(())
    }
}
