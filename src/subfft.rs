/*
 * // Copyright (c) Radzivon Bartoshyk 6/2025. All rights reserved.
 * //
 * // Redistribution and use in source and binary forms, with or without modification,
 * // are permitted provided that the following conditions are met:
 * //
 * // 1.  Redistributions of source code must retain the above copyright notice, this
 * // list of conditions and the following disclaimer.
 * //
 * // 2.  Redistributions in binary form must reproduce the above copyright notice,
 * // this list of conditions and the following disclaimer in the documentation
 * // and/or other materials provided with the distribution.
 * //
 * // 3.  Neither the name of the copyright holder nor the names of its
 * // contributors may be used to endorse or promote products derived from
 * // this software without specific prior written permission.
 * //
 * // THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
 * // AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
 * // IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
 * // DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
 * // FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
 * // DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
 * // SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
 * // CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
 * // OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
 * // OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.
 */
//! Thin batched drivers over the rustfft plans. The padded-FFT kernels only
//! ever talk to these; they never see a rustfft type.

use crate::err::{try_vec, PadConvError};
use crate::twiddle::compute_twiddle;
use num_complex::Complex;
use num_traits::{AsPrimitive, Float};
use rustfft::{Fft, FftDirection, FftNum, FftPlanner};
use std::sync::Arc;

/// A batch of 1-D complex transforms of a fixed length and layout.
///
/// `stride` separates successive elements of one transform, `dist` separates
/// transforms. The row count is a call argument: the plan only depends on the
/// length, so the short final pass of a residue loop reuses the same driver
/// with fewer rows.
pub(crate) struct Mfft1d<T> {
    fft: Arc<dyn Fft<T>>,
    len: usize,
    stride: usize,
    dist: usize,
}

impl<T: FftNum> Mfft1d<T> {
    pub fn new(
        len: usize,
        direction: FftDirection,
        stride: usize,
        dist: usize,
        planner: &mut FftPlanner<T>,
    ) -> Result<Mfft1d<T>, PadConvError> {
        if len == 0 {
            return Err(PadConvError::ZeroSizedTransform);
        }
        Ok(Mfft1d {
            fft: planner.plan_fft(len, direction),
            len,
            stride,
            dist,
        })
    }

    /// Transform `count` rows of `buf` in place.
    pub fn execute(&self, buf: &mut [Complex<T>], count: usize) -> Result<(), PadConvError> {
        let mut scratch =
            try_vec![Complex::<T>::new(T::zero(), T::zero()); self.fft.get_inplace_scratch_len()];
        if self.stride == 1 {
            if self.dist == self.len {
                self.fft
                    .process_with_scratch(&mut buf[..count * self.len], &mut scratch);
            } else {
                for d in 0..count {
                    let row = &mut buf[d * self.dist..d * self.dist + self.len];
                    self.fft.process_with_scratch(row, &mut scratch);
                }
            }
            return Ok(());
        }
        let mut row = try_vec![Complex::<T>::new(T::zero(), T::zero()); self.len];
        for d in 0..count {
            let base = d * self.dist;
            for (j, dst) in row.iter_mut().enumerate() {
                *dst = buf[base + j * self.stride];
            }
            self.fft.process_with_scratch(&mut row, &mut scratch);
            for (j, src) in row.iter().enumerate() {
                buf[base + j * self.stride] = *src;
            }
        }
        Ok(())
    }

    /// Transform `count` rows of `src` into `dst`. `src` is left intact, so a
    /// zero-padded work buffer keeps its padding across passes.
    pub fn execute_to(
        &self,
        src: &[Complex<T>],
        dst: &mut [Complex<T>],
        count: usize,
    ) -> Result<(), PadConvError> {
        if self.stride == 1 {
            for d in 0..count {
                let base = d * self.dist;
                dst[base..base + self.len].copy_from_slice(&src[base..base + self.len]);
            }
            return self.execute(dst, count);
        }
        let mut scratch =
            try_vec![Complex::<T>::new(T::zero(), T::zero()); self.fft.get_inplace_scratch_len()];
        let mut row = try_vec![Complex::<T>::new(T::zero(), T::zero()); self.len];
        for d in 0..count {
            let base = d * self.dist;
            for (j, dst_j) in row.iter_mut().enumerate() {
                *dst_j = src[base + j * self.stride];
            }
            self.fft.process_with_scratch(&mut row, &mut scratch);
            for (j, src_j) in row.iter().enumerate() {
                dst[base + j * self.stride] = *src_j;
            }
        }
        Ok(())
    }
}

/// Batched real -> half-complex analysis for even lengths, realised through a
/// half-length complex transform and an untangling pass. `m` real samples in,
/// `m/2 + 1` coefficients out per row.
pub(crate) struct Mrcfft1d<T> {
    half: Arc<dyn Fft<T>>,
    e: usize,
    rstride: usize,
    rdist: usize,
    cstride: usize,
    cdist: usize,
    /// `exp(-2 pi i k / m) / 2` for `k in [0, e]`.
    twiddles: Vec<Complex<T>>,
}

impl<T: FftNum + Float> Mrcfft1d<T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(
        m: usize,
        rstride: usize,
        rdist: usize,
        cstride: usize,
        cdist: usize,
        planner: &mut FftPlanner<T>,
    ) -> Result<Mrcfft1d<T>, PadConvError> {
        if m == 0 {
            return Err(PadConvError::ZeroSizedTransform);
        }
        if m % 2 != 0 {
            return Err(PadConvError::Unsupported(format!(
                "real transforms require an even length, got {m}"
            )));
        }
        let e = m / 2;
        let mut twiddles = try_vec![Complex::<T>::new(T::zero(), T::zero()); e + 1];
        for (k, dst) in twiddles.iter_mut().enumerate() {
            *dst = compute_twiddle::<T>(k, m, FftDirection::Forward) * 0.5f64.as_();
        }
        Ok(Mrcfft1d {
            half: planner.plan_fft_forward(e),
            e,
            rstride,
            rdist,
            cstride,
            cdist,
            twiddles,
        })
    }

    pub fn execute(
        &self,
        src: &[T],
        dst: &mut [Complex<T>],
        count: usize,
    ) -> Result<(), PadConvError> {
        let mut scratch =
            try_vec![Complex::<T>::new(T::zero(), T::zero()); self.half.get_inplace_scratch_len()];
        let mut z = try_vec![Complex::<T>::new(T::zero(), T::zero()); self.e];
        for d in 0..count {
            let rbase = d * self.rdist;
            let cbase = d * self.cdist;
            for (y, zy) in z.iter_mut().enumerate() {
                *zy = Complex::new(
                    src[rbase + 2 * y * self.rstride],
                    src[rbase + (2 * y + 1) * self.rstride],
                );
            }
            self.half.process_with_scratch(&mut z, &mut scratch);
            for k in 0..=self.e {
                let zk = if k == self.e { z[0] } else { z[k] };
                let zr = if k == 0 { z[0] } else { z[self.e - k] };
                let even = (zk + zr.conj()) * 0.5f64.as_();
                let diff = zk - zr.conj();
                // twiddles carry the 1/2; multiply by -i folds in the 1/(2i).
                let odd = self.twiddles[k] * Complex::new(diff.im, -diff.re);
                dst[cbase + k * self.cstride] = even + odd;
            }
        }
        Ok(())
    }
}

/// Batched half-complex -> real synthesis for even lengths, the inverse
/// layout of [`Mrcfft1d`]. Unnormalised: composing the pair scales by `m`.
pub(crate) struct Mcrfft1d<T> {
    half: Arc<dyn Fft<T>>,
    e: usize,
    cstride: usize,
    cdist: usize,
    rstride: usize,
    rdist: usize,
    /// `exp(+2 pi i k / m)` for `k in [0, e)`.
    twiddles: Vec<Complex<T>>,
}

impl<T: FftNum + Float> Mcrfft1d<T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(
        m: usize,
        cstride: usize,
        cdist: usize,
        rstride: usize,
        rdist: usize,
        planner: &mut FftPlanner<T>,
    ) -> Result<Mcrfft1d<T>, PadConvError> {
        if m == 0 {
            return Err(PadConvError::ZeroSizedTransform);
        }
        if m % 2 != 0 {
            return Err(PadConvError::Unsupported(format!(
                "real transforms require an even length, got {m}"
            )));
        }
        let e = m / 2;
        let mut twiddles = try_vec![Complex::<T>::new(T::zero(), T::zero()); e];
        for (k, dst) in twiddles.iter_mut().enumerate() {
            *dst = compute_twiddle::<T>(k, m, FftDirection::Inverse);
        }
        Ok(Mcrfft1d {
            half: planner.plan_fft_inverse(e),
            e,
            cstride,
            cdist,
            rstride,
            rdist,
            twiddles,
        })
    }

    pub fn execute(
        &self,
        src: &[Complex<T>],
        dst: &mut [T],
        count: usize,
    ) -> Result<(), PadConvError> {
        let mut scratch =
            try_vec![Complex::<T>::new(T::zero(), T::zero()); self.half.get_inplace_scratch_len()];
        let mut z = try_vec![Complex::<T>::new(T::zero(), T::zero()); self.e];
        for d in 0..count {
            let cbase = d * self.cdist;
            let rbase = d * self.rdist;
            for (k, zk) in z.iter_mut().enumerate() {
                let xk = src[cbase + k * self.cstride];
                let xr = src[cbase + (self.e - k) * self.cstride];
                let sum = xk + xr.conj();
                let diff = xk - xr.conj();
                let odd = self.twiddles[k] * diff;
                // Z = (X[k] + conj(X[e-k])) + i w^k (X[k] - conj(X[e-k]))
                *zk = sum + Complex::new(-odd.im, odd.re);
            }
            self.half.process_with_scratch(&mut z, &mut scratch);
            for (y, zy) in z.iter().enumerate() {
                dst[rbase + 2 * y * self.rstride] = zy.re;
                dst[rbase + (2 * y + 1) * self.rstride] = zy.im;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn naive_dft(input: &[Complex<f64>], sign: f64) -> Vec<Complex<f64>> {
        let n = input.len();
        (0..n)
            .map(|k| {
                let mut sum = Complex::new(0.0, 0.0);
                for (x, v) in input.iter().enumerate() {
                    let angle = sign * 2.0 * std::f64::consts::PI * (k * x) as f64 / n as f64;
                    sum += v * Complex::new(angle.cos(), angle.sin());
                }
                sum
            })
            .collect()
    }

    #[test]
    fn strided_batch_matches_contiguous() {
        let m = 8;
        let c = 3;
        let mut planner = FftPlanner::<f64>::new();
        let strided = Mfft1d::new(m, FftDirection::Forward, c, 1, &mut planner).unwrap();
        let mut rng = rand::rng();
        let mut buf: Vec<Complex<f64>> = (0..c * m)
            .map(|_| Complex::new(rng.random(), rng.random()))
            .collect();
        let mut rows: Vec<Vec<Complex<f64>>> = (0..c)
            .map(|ci| (0..m).map(|j| buf[c * j + ci]).collect())
            .collect();
        strided.execute(&mut buf, c).unwrap();
        for (ci, row) in rows.iter_mut().enumerate() {
            let reference = naive_dft(row, -1.0);
            for (j, want) in reference.iter().enumerate() {
                let got = buf[c * j + ci];
                assert!(
                    (got - want).norm() < 1e-9,
                    "transform {ci} bin {j}: {got} != {want}"
                );
            }
        }
    }

    #[test]
    fn execute_to_preserves_source() {
        let m = 16;
        let mut planner = FftPlanner::<f64>::new();
        let fft = Mfft1d::new(m, FftDirection::Forward, 1, m, &mut planner).unwrap();
        let src: Vec<Complex<f64>> = (0..2 * m)
            .map(|j| Complex::new(j as f64, -(j as f64)))
            .collect();
        let snapshot = src.clone();
        let mut dst = vec![Complex::new(0.0, 0.0); 2 * m];
        fft.execute_to(&src, &mut dst, 2).unwrap();
        assert_eq!(src, snapshot);
        let reference = naive_dft(&src[..m], -1.0);
        for (j, want) in reference.iter().enumerate() {
            assert!((dst[j] - want).norm() < 1e-9);
        }
    }

    #[test]
    fn real_pair_roundtrip_scales_by_m() {
        let mut rng = rand::rng();
        for m in [2usize, 4, 6, 8, 12, 16, 24] {
            let e = m / 2;
            let mut planner = FftPlanner::<f64>::new();
            let rc = Mrcfft1d::new(m, 1, m, 1, e + 1, &mut planner).unwrap();
            let cr = Mcrfft1d::new(m, 1, e + 1, 1, m, &mut planner).unwrap();
            let samples: Vec<f64> = (0..m).map(|_| rng.random::<f64>() - 0.5).collect();
            let mut coeffs = vec![Complex::new(0.0, 0.0); e + 1];
            rc.execute(&samples, &mut coeffs, 1).unwrap();

            // Against the full complex DFT of the real signal.
            let full: Vec<Complex<f64>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
            let reference = naive_dft(&full, -1.0);
            for k in 0..=e {
                assert!(
                    (coeffs[k] - reference[k]).norm() < 1e-9,
                    "m {m} bin {k}: {} != {}",
                    coeffs[k],
                    reference[k]
                );
            }

            let mut back = vec![0.0f64; m];
            cr.execute(&coeffs, &mut back, 1).unwrap();
            for (x, (&got, &want)) in back.iter().zip(samples.iter()).enumerate() {
                assert!(
                    (got / m as f64 - want).abs() < 1e-9,
                    "m {m} sample {x}: {got} != {want}"
                );
            }
        }
    }

    #[test]
    fn real_batch_interleaved_layout() {
        let m = 8;
        let c = 2;
        let e = m / 2;
        let mut planner = FftPlanner::<f64>::new();
        let rc = Mrcfft1d::new(m, c, 1, c, 1, &mut planner).unwrap();
        let mut rng = rand::rng();
        let src: Vec<f64> = (0..c * m).map(|_| rng.random()).collect();
        let mut dst = vec![Complex::new(0.0, 0.0); c * (e + 1)];
        rc.execute(&src, &mut dst, c).unwrap();
        for ci in 0..c {
            let row: Vec<Complex<f64>> = (0..m)
                .map(|x| Complex::new(src[c * x + ci], 0.0))
                .collect();
            let reference = naive_dft(&row, -1.0);
            for k in 0..=e {
                assert!((dst[c * k + ci] - reference[k]).norm() < 1e-9);
            }
        }
    }
}
