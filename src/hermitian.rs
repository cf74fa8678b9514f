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
//! Hermitian padded FFT: the input is the non-negative half of a
//! conjugate-symmetric spectrum, the forward direction synthesises real data
//! through batched c2r subtransforms, and the backward direction analyses
//! real data back into coefficients. Phase tables live in the synthesis sign.

use crate::err::PadConvError;
use crate::padfft::Options;
use crate::planner::{meantime, Application, Opt};
use crate::subfft::{Mcrfft1d, Mrcfft1d};
use crate::twiddle::{zeta_q, ZetaTable};
use num_complex::Complex;
use num_traits::{AsPrimitive, Float};
use rustfft::{FftDirection, FftNum, FftPlanner};

pub struct PadFftHermitian<T> {
    /// Data length of the logical (real) sequence.
    l: usize,
    c: usize,
    m: usize,
    q: usize,
    d: usize,
    /// Half subtransform length `m / 2`.
    e: usize,
    /// Stored non-negative coefficients reach index `h = floor(L/2)`.
    h: usize,
    residues: usize,
    crfft: Mcrfft1d<T>,
    rcfft: Mrcfft1d<T>,
    zeta_q: Vec<Complex<T>>,
    zeta_qm: Option<ZetaTable<T>>,
}

impl<T: FftNum + Float> PadFftHermitian<T>
where
    f64: AsPrimitive<T>,
{
    pub fn with_split(
        l: usize,
        m_min: usize,
        c: usize,
        m: usize,
        q: usize,
        d: usize,
        _options: Options,
    ) -> Result<PadFftHermitian<T>, PadConvError> {
        if l == 0 || c == 0 || m == 0 || q == 0 {
            return Err(PadConvError::ZeroSizedTransform);
        }
        if m_min < l {
            return Err(PadConvError::PaddedShorterThanData(m_min, l));
        }
        if m % 2 != 0 {
            return Err(PadConvError::Unsupported(format!(
                "Hermitian transforms need an even subtransform length, got m={m}"
            )));
        }
        let h = l / 2;
        let mut planner = FftPlanner::new();
        if q == 1 {
            if m < m_min {
                return Err(PadConvError::InvalidResidueSplit(m, q, m_min));
            }
            let e = m / 2;
            let (crfft, rcfft) = if c == 1 {
                (
                    Mcrfft1d::new(m, 1, e + 1, 1, m, &mut planner)?,
                    Mrcfft1d::new(m, 1, m, 1, e + 1, &mut planner)?,
                )
            } else {
                (
                    Mcrfft1d::new(m, c, 1, c, 1, &mut planner)?,
                    Mrcfft1d::new(m, c, 1, c, 1, &mut planner)?,
                )
            };
            return Ok(PadFftHermitian {
                l,
                c,
                m,
                q: 1,
                d: 1,
                e,
                h,
                residues: 1,
                crfft,
                rcfft,
                zeta_q: Vec::new(),
                zeta_qm: None,
            });
        }
        if m * q < m_min {
            return Err(PadConvError::InvalidResidueSplit(m, q, m_min));
        }
        let p = l.div_ceil(m);
        if p != 2 {
            return Err(PadConvError::Unsupported(format!(
                "Hermitian hybrid padding is only implemented for p = 2, got p = {p}"
            )));
        }
        if h >= m {
            return Err(PadConvError::Unsupported(format!(
                "Hermitian fold needs floor(L/2) < m, got L={l}, m={m}"
            )));
        }
        let e = m / 2;
        let d = if c > 1 { 1 } else { d.max(1).min(q) };
        let (crfft, rcfft) = if c == 1 {
            (
                Mcrfft1d::new(m, 1, e + 1, 1, m, &mut planner)?,
                Mrcfft1d::new(m, 1, m, 1, e + 1, &mut planner)?,
            )
        } else {
            (
                Mcrfft1d::new(m, c, 1, c, 1, &mut planner)?,
                Mrcfft1d::new(m, c, 1, c, 1, &mut planner)?,
            )
        };
        Ok(PadFftHermitian {
            l,
            c,
            m,
            q,
            d,
            e,
            h,
            residues: q,
            crfft,
            rcfft,
            // Synthesis-signed tables keep the kernel phases direct.
            zeta_q: zeta_q(q, FftDirection::Inverse)?,
            zeta_qm: Some(ZetaTable::zeta_qm(q, m, FftDirection::Inverse)?),
        })
    }

    /// Planner entry point over Hermitian candidates; odd `m` and `p != 2`
    /// splits are rejected by construction and skipped by the scan.
    pub fn new<A: Application<T, PadFftHermitian<T>>>(
        l: usize,
        m_min: usize,
        c: usize,
        app: &mut A,
        explicit: bool,
        fixed: bool,
        options: Options,
    ) -> Result<PadFftHermitian<T>, PadConvError> {
        let opt = Opt::scan(l, m_min, c, explicit, fixed, &options, |m, q, d| {
            let trial_min = if q == 1 { m } else { m_min };
            let fft = PadFftHermitian::with_split(l, trial_min, c, m, q, d, options).ok()?;
            app.init(&fft).ok()?;
            let t = meantime(|k| app.time(&fft, k));
            app.clear();
            Some(t)
        })?;
        let m_min = if explicit { opt.m } else { m_min };
        Self::with_split(l, m_min, c, opt.m, opt.q, opt.d, options)
    }

    pub fn residues(&self) -> usize {
        self.residues
    }

    pub fn per_pass(&self) -> usize {
        self.d
    }

    pub fn data_len(&self) -> usize {
        self.l
    }

    pub fn copies(&self) -> usize {
        self.c
    }

    /// Realised padded length `N`.
    pub fn size(&self) -> usize {
        self.m * self.q
    }

    /// Complex coefficients the caller supplies per copy: the half spectrum
    /// plus, for the hybrid path, the mirror fold region up to `m - 1`.
    pub fn input_size(&self) -> usize {
        self.c * if self.q == 1 { self.h + 1 } else { self.m }
    }

    /// Real values produced by one pass.
    pub fn work_size_real(&self) -> usize {
        self.c * self.m * self.d
    }

    /// Complex coefficient workspace consumed by one pass.
    pub fn work_size_coeff(&self) -> usize {
        self.c * (self.e + 1) * self.d
    }

    pub fn work_size_v(&self, _a: usize, _b: usize) -> usize {
        if self.q == 1 || self.d >= self.residues {
            0
        } else {
            self.input_size()
        }
    }

    /// Real values per single residue inside a full synthesis.
    pub fn residue_block_real(&self) -> usize {
        self.c * self.m
    }

    fn pass_width(&self, r0: usize) -> usize {
        (self.residues - r0).min(self.d)
    }

    /// Synthesise the full real sequence of length `C N`.
    pub fn forward(
        &self,
        f: &[Complex<T>],
        big: &mut [T],
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let b = self.residue_block_real();
        let mut r = 0;
        while r < self.residues {
            let width = b * self.pass_width(r);
            self.forward_pass(f, &mut big[b * r..b * r + width], r, w)?;
            r += self.d;
        }
        Ok(())
    }

    /// Analyse real data back into coefficients; unnormalised by `N`.
    pub fn backward(
        &self,
        big: &[T],
        f: &mut [Complex<T>],
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let b = self.residue_block_real();
        let mut r = 0;
        while r < self.residues {
            let width = b * self.pass_width(r);
            self.backward_pass(&big[b * r..b * r + width], f, r, w)?;
            r += self.d;
        }
        Ok(())
    }

    /// One pass of up to `D` residues: fold coefficients into `w`, then
    /// batched c2r into `fout`.
    pub fn forward_pass(
        &self,
        f: &[Complex<T>],
        fout: &mut [T],
        r0: usize,
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        if self.q == 1 {
            return self.forward_explicit(f, fout, w);
        }
        if self.c == 1 {
            self.forward2(f, fout, r0, w)
        } else {
            self.forward2_many(f, fout, r0, w)
        }
    }

    /// Adjoint pass: batched r2c of `fin` into `w`, then accumulate into the
    /// coefficient array, restoring conjugate symmetry in the mirror region.
    pub fn backward_pass(
        &self,
        fin: &[T],
        f: &mut [Complex<T>],
        r0: usize,
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        if self.q == 1 {
            return self.backward_explicit(fin, f, w);
        }
        if self.c == 1 {
            self.backward2(fin, f, r0, w)
        } else {
            self.backward2_many(fin, f, r0, w)
        }
    }

    fn forward_explicit(
        &self,
        f: &[Complex<T>],
        fout: &mut [T],
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let zero = Complex::new(T::zero(), T::zero());
        let c = self.c;
        w[..c * (self.h + 1)].copy_from_slice(&f[..c * (self.h + 1)]);
        for v in &mut w[c * (self.h + 1)..c * (self.e + 1)] {
            *v = zero;
        }
        self.crfft.execute(w, fout, c)
    }

    fn backward_explicit(
        &self,
        fin: &[T],
        f: &mut [Complex<T>],
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let c = self.c;
        self.rcfft.execute(fin, w, c)?;
        f[..c * (self.h + 1)].copy_from_slice(&w[..c * (self.h + 1)]);
        Ok(())
    }

    fn forward2(
        &self,
        f: &[Complex<T>],
        fout: &mut [T],
        r0: usize,
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let (m, e, h) = (self.m, self.e, self.h);
        let zeta_qm = self.zeta_qm.as_ref().ok_or_else(|| {
            PadConvError::Unsupported("Hermitian hybrid pass without phase tables".into())
        })?;
        let d0 = self.pass_width(r0);
        // Mirror terms f[m - s] exist only while m - s stays inside the
        // stored half spectrum.
        let fold_start = m - h;
        let first = (r0 == 0) as usize;
        if first == 1 {
            w[0] = f[0];
            for s in 1..fold_start {
                w[s] = f[s];
            }
            for s in fold_start..=e {
                w[s] = f[s] + f[m - s].conj();
            }
        }
        let e1 = e + 1;
        for d in first..d0 {
            let r = r0 + d;
            let row = &mut w[e1 * d..e1 * (d + 1)];
            let zq = self.zeta_q[r];
            let zr = zeta_qm.row(r);
            row[0] = f[0];
            for s in 1..fold_start {
                row[s] = zr[s] * f[s];
            }
            for s in fold_start..=e {
                row[s] = zr[s] * (f[s] + (f[m - s] * zq).conj());
            }
        }
        self.crfft.execute(w, fout, d0)
    }

    fn backward2(
        &self,
        fin: &[T],
        f: &mut [Complex<T>],
        r0: usize,
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let (m, e) = (self.m, self.e);
        let zeta_qm = self.zeta_qm.as_ref().ok_or_else(|| {
            PadConvError::Unsupported("Hermitian hybrid pass without phase tables".into())
        })?;
        let d0 = self.pass_width(r0);
        self.rcfft.execute(fin, w, d0)?;
        let e1 = e + 1;
        let first = (r0 == 0) as usize;
        if first == 1 {
            for s in 0..=e {
                f[s] = w[s];
            }
            for s in 1..m - e {
                f[m - s] = w[s].conj();
            }
        }
        for d in first..d0 {
            let r = r0 + d;
            let row = &w[e1 * d..e1 * (d + 1)];
            let zq = self.zeta_q[r];
            let zr = zeta_qm.row(r);
            for s in 0..=e {
                f[s] = f[s] + zr[s].conj() * row[s];
            }
            for s in 1..m - e {
                f[m - s] = f[m - s] + zr[s] * (zq * row[s]).conj();
            }
        }
        Ok(())
    }

    fn forward2_many(
        &self,
        f: &[Complex<T>],
        fout: &mut [T],
        r: usize,
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let (c, m, e, h) = (self.c, self.m, self.e, self.h);
        let zeta_qm = self.zeta_qm.as_ref().ok_or_else(|| {
            PadConvError::Unsupported("Hermitian hybrid pass without phase tables".into())
        })?;
        let fold_start = m - h;
        if r == 0 {
            w[..c * fold_start].copy_from_slice(&f[..c * fold_start]);
            for s in fold_start..=e {
                let cs = c * s;
                let cms = c * (m - s);
                for ci in 0..c {
                    w[cs + ci] = f[cs + ci] + f[cms + ci].conj();
                }
            }
        } else {
            let zq = self.zeta_q[r];
            let zr = zeta_qm.row(r);
            w[..c].copy_from_slice(&f[..c]);
            for s in 1..fold_start {
                let cs = c * s;
                let zs = zr[s];
                for ci in 0..c {
                    w[cs + ci] = zs * f[cs + ci];
                }
            }
            for s in fold_start..=e {
                let cs = c * s;
                let cms = c * (m - s);
                let zs = zr[s];
                for ci in 0..c {
                    w[cs + ci] = zs * (f[cs + ci] + (f[cms + ci] * zq).conj());
                }
            }
        }
        self.crfft.execute(w, fout, c)
    }

    fn backward2_many(
        &self,
        fin: &[T],
        f: &mut [Complex<T>],
        r: usize,
        w: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let (c, m, e) = (self.c, self.m, self.e);
        let zeta_qm = self.zeta_qm.as_ref().ok_or_else(|| {
            PadConvError::Unsupported("Hermitian hybrid pass without phase tables".into())
        })?;
        self.rcfft.execute(fin, w, c)?;
        if r == 0 {
            f[..c * (e + 1)].copy_from_slice(&w[..c * (e + 1)]);
            for s in 1..m - e {
                let cs = c * s;
                let cms = c * (m - s);
                for ci in 0..c {
                    f[cms + ci] = w[cs + ci].conj();
                }
            }
        } else {
            let zq = self.zeta_q[r];
            let zr = zeta_qm.row(r);
            for s in 0..=e {
                let cs = c * s;
                let zs = zr[s].conj();
                for ci in 0..c {
                    f[cs + ci] = f[cs + ci] + zs * w[cs + ci];
                }
            }
            for s in 1..m - e {
                let cs = c * s;
                let cms = c * (m - s);
                let zs = zr[s];
                for ci in 0..c {
                    f[cms + ci] = f[cms + ci] + zs * (zq * w[cs + ci]).conj();
                }
            }
        }
        Ok(())
    }
}

/// Timing workload for Hermitian planning, mirroring the complex
/// `ForwardBackward` with real work arrays.
pub struct ForwardBackwardHermitian<T> {
    a: usize,
    b: usize,
    f: Vec<Vec<Complex<T>>>,
    big: Vec<Vec<T>>,
    h: Vec<Vec<Complex<T>>>,
    w: Vec<Complex<T>>,
}

impl<T: FftNum + Float> ForwardBackwardHermitian<T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(a: usize, b: usize) -> ForwardBackwardHermitian<T> {
        ForwardBackwardHermitian {
            a,
            b,
            f: Vec::new(),
            big: Vec::new(),
            h: Vec::new(),
            w: Vec::new(),
        }
    }
}

impl<T: FftNum + Float> Default for ForwardBackwardHermitian<T>
where
    f64: AsPrimitive<T>,
{
    fn default() -> Self {
        ForwardBackwardHermitian::new(2, 1)
    }
}

impl<T: FftNum + Float> Application<T, PadFftHermitian<T>> for ForwardBackwardHermitian<T>
where
    f64: AsPrimitive<T>,
{
    fn init(&mut self, fft: &PadFftHermitian<T>) -> Result<(), PadConvError> {
        self.clear();
        let zero = Complex::new(T::zero(), T::zero());
        let e = self.a.max(self.b);
        for _ in 0..self.a {
            self.f.push(vec![zero; fft.input_size()]);
        }
        for _ in 0..e {
            self.big.push(vec![T::zero(); fft.work_size_real()]);
        }
        for _ in 0..self.b {
            self.h.push(vec![zero; fft.input_size()]);
        }
        self.w = vec![zero; fft.work_size_coeff()];
        Ok(())
    }

    fn time(&mut self, fft: &PadFftHermitian<T>, k: usize) -> f64 {
        let start = std::time::Instant::now();
        for _ in 0..k {
            let mut r = 0;
            while r < fft.residues() {
                for ai in 0..self.a {
                    if fft
                        .forward_pass(&self.f[ai], &mut self.big[ai], r, &mut self.w)
                        .is_err()
                    {
                        return f64::INFINITY;
                    }
                }
                for bi in 0..self.b {
                    if fft
                        .backward_pass(&self.big[bi], &mut self.h[bi], r, &mut self.w)
                        .is_err()
                    {
                        return f64::INFINITY;
                    }
                }
                r += fft.per_pass();
            }
        }
        start.elapsed().as_secs_f64()
    }

    fn clear(&mut self) {
        self.f.clear();
        self.big.clear();
        self.h.clear();
        self.w.clear();
    }
}
