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
use crate::err::{try_vec, PadConvError};
use num_complex::Complex;
use num_traits::{AsPrimitive, Float};
use rustfft::FftDirection;

/// `exp(-2 pi i index / len)` for `Forward`, conjugated for `Inverse`.
///
/// The angle is reduced modulo `len` and evaluated in f64 before being
/// narrowed, so long root chains stay on the unit circle.
pub(crate) fn compute_twiddle<T: Float + 'static>(
    index: usize,
    len: usize,
    direction: FftDirection,
) -> Complex<T>
where
    f64: AsPrimitive<T>,
{
    let angle = -2.0 * std::f64::consts::PI * ((index % len) as f64) / (len as f64);
    let (v_sin, v_cos) = angle.sin_cos();
    let result = Complex {
        re: v_cos.as_(),
        im: v_sin.as_(),
    };
    match direction {
        FftDirection::Forward => result,
        FftDirection::Inverse => result.conj(),
    }
}

/// A phase table addressed by row `r >= 1`; row 0 would be all ones and is
/// never stored.
pub(crate) struct ZetaTable<T> {
    cols: usize,
    data: Vec<Complex<T>>,
}

impl<T: Float + 'static> ZetaTable<T>
where
    f64: AsPrimitive<T>,
{
    /// Row `r` as a slice of `cols` entries, `r` in `[1, rows)`.
    #[inline]
    pub fn row(&self, r: usize) -> &[Complex<T>] {
        debug_assert!(r >= 1);
        &self.data[(r - 1) * self.cols..r * self.cols]
    }

    /// `zeta_qm[m r + s] = exp(-2 pi i r s / N)` for `r in [1, q)`, `s in [0, m)`.
    pub fn zeta_qm(
        q: usize,
        m: usize,
        direction: FftDirection,
    ) -> Result<ZetaTable<T>, PadConvError> {
        let n = m * q;
        let mut data = try_vec![Complex::<T>::new(T::zero(), T::zero()); (q - 1) * m];
        for r in 1..q {
            let row = &mut data[(r - 1) * m..r * m];
            for (s, dst) in row.iter_mut().enumerate() {
                *dst = compute_twiddle(r * s, n, direction);
            }
        }
        Ok(ZetaTable { cols: m, data })
    }

    /// Wrap phases for the p=2 backward: `s in [m, l)`, stored at `[r][s - m]`.
    pub fn zeta_qm2(
        q: usize,
        m: usize,
        l: usize,
        direction: FftDirection,
    ) -> Result<ZetaTable<T>, PadConvError> {
        let n = m * q;
        let lm = l - m;
        let mut data = try_vec![Complex::<T>::new(T::zero(), T::zero()); (q - 1) * lm];
        for r in 1..q {
            let row = &mut data[(r - 1) * lm..r * lm];
            for (i, dst) in row.iter_mut().enumerate() {
                *dst = compute_twiddle(r * (m + i), n, direction);
            }
        }
        Ok(ZetaTable { cols: lm, data })
    }

    /// Inner block phases: `zeta_qp[r][t - 1] = exp(-2 pi i r t / q)` with
    /// `q = p n`, `r in [1, n)`, `t in [1, p)`.
    pub fn zeta_qp(
        n: usize,
        p: usize,
        direction: FftDirection,
    ) -> Result<ZetaTable<T>, PadConvError> {
        let q = p * n;
        let pm1 = p - 1;
        let mut data = try_vec![Complex::<T>::new(T::zero(), T::zero()); (n - 1) * pm1];
        for r in 1..n {
            let row = &mut data[(r - 1) * pm1..r * pm1];
            for (i, dst) in row.iter_mut().enumerate() {
                *dst = compute_twiddle(r * (i + 1), q, direction);
            }
        }
        Ok(ZetaTable { cols: pm1, data })
    }
}

/// `zeta_q[r] = exp(-2 pi i r / q)`.
pub(crate) fn zeta_q<T: Float + 'static>(
    q: usize,
    direction: FftDirection,
) -> Result<Vec<Complex<T>>, PadConvError>
where
    f64: AsPrimitive<T>,
{
    let mut data = try_vec![Complex::<T>::new(T::zero(), T::zero()); q];
    for (r, dst) in data.iter_mut().enumerate() {
        *dst = compute_twiddle(r, q, direction);
    }
    Ok(data)
}

/// Shift phases for the centered general path, addressed by the explicit
/// output index `j = q s + n t + r`: `zeta_shift[j] = exp(-2 pi i H j / N)`.
pub(crate) fn zeta_shift<T: Float + 'static>(
    l: usize,
    n_padded: usize,
    direction: FftDirection,
) -> Result<Vec<Complex<T>>, PadConvError>
where
    f64: AsPrimitive<T>,
{
    let h = l / 2;
    let mut data = try_vec![Complex::<T>::new(T::zero(), T::zero()); n_padded];
    for (j, dst) in data.iter_mut().enumerate() {
        *dst = compute_twiddle(h * j, n_padded, direction);
    }
    Ok(data)
}
