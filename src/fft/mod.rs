//! 2D complex FFT used by the demo driver to move fields between real space
//! and the spectral patch the solver works on.
use crate::Float;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDim {
    pub size_x: usize,
    pub size_y: usize,
}

pub struct Fft2D {
    field_size: FieldDim,
    fft_x: Arc<dyn Fft<Float>>,
    ifft_x: Arc<dyn Fft<Float>>,
    fft_y: Arc<dyn Fft<Float>>,
    ifft_y: Arc<dyn Fft<Float>>,
    xscratch: Vec<Complex<Float>>,
    yscratch: Vec<Complex<Float>>,
    wrkspace: Vec<Complex<Float>>,
}

impl Fft2D {
    pub fn new(size_x: usize, size_y: usize) -> Fft2D {
        let mut planner = FftPlanner::new();
        let field_size = FieldDim { size_x, size_y };
        let fft_x = planner.plan_fft_forward(size_x);
        let ifft_x = planner.plan_fft_inverse(size_x);
        let fft_y = planner.plan_fft_forward(size_y);
        let ifft_y = planner.plan_fft_inverse(size_y);
        let x_len = fft_x
            .get_outofplace_scratch_len()
            .max(ifft_x.get_outofplace_scratch_len());
        let y_len = fft_y
            .get_outofplace_scratch_len()
            .max(ifft_y.get_outofplace_scratch_len());

        Fft2D {
            field_size,
            fft_x,
            ifft_x,
            fft_y,
            ifft_y,
            xscratch: vec![Complex::zero(); x_len],
            yscratch: vec![Complex::zero(); y_len],
            wrkspace: vec![Complex::zero(); size_x * size_y],
        }
    }

    pub fn dim(&self) -> FieldDim {
        self.field_size
    }

    fn transpose(input: &[Complex<Float>], output: &mut [Complex<Float>], dim: FieldDim) {
        if !cfg!(feature = "unchecked") {
            assert_eq!(input.len(), output.len());
            assert_eq!(input.len(), dim.size_x * dim.size_y);
        }
        for (iy, row) in input.chunks_exact(dim.size_x).enumerate() {
            for (ix, v) in row.iter().enumerate() {
                output[ix * dim.size_y + iy] = *v;
            }
        }
    }

    /// Runs `x_pass` along rows, transposes, runs `y_pass` along the new
    /// rows and transposes back, so `buf` ends in x-fastest order again.
    fn process(&mut self, buf: &mut [Complex<Float>], inverse: bool) {
        let dim = self.field_size;
        if !cfg!(feature = "unchecked") {
            assert_eq!(buf.len(), dim.size_x * dim.size_y);
        }
        let (x_pass, y_pass) = if inverse {
            (&self.ifft_x, &self.ifft_y)
        } else {
            (&self.fft_x, &self.fft_y)
        };

        x_pass.process_outofplace_with_scratch(buf, &mut self.wrkspace, &mut self.xscratch);
        Fft2D::transpose(&self.wrkspace, buf, dim);
        y_pass.process_outofplace_with_scratch(buf, &mut self.wrkspace, &mut self.yscratch);
        let transposed = FieldDim {
            size_x: dim.size_y,
            size_y: dim.size_x,
        };
        Fft2D::transpose(&self.wrkspace, buf, transposed);
    }

    /// Unnormalised forward transform, `buf` in x-fastest order.
    pub fn fft(&mut self, buf: &mut [Complex<Float>]) {
        self.process(buf, false);
    }

    /// Inverse transform including the `1/N` normalisation.
    pub fn inv_fft(&mut self, buf: &mut [Complex<Float>]) {
        self.process(buf, true);
        let norm = (buf.len() as Float).powi(-1);
        for v in buf.iter_mut() {
            *v *= norm;
        }
    }
}
