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
//! The padded FFT kernel: a DFT of `L` data values padded to `N = m q >= M`
//! computed as `q` (or `q/p`) residue-class subtransforms of length `m`,
//! which is what lets a convolution skip the classical 2x zero padding.

use crate::err::PadConvError;
use crate::planner::{meantime, Application, Opt};
use crate::subfft::Mfft1d;
use crate::twiddle::{zeta_q, ZetaTable};
use num_complex::Complex;
use num_integer::div_ceil;
use num_traits::{AsPrimitive, Float};
use rustfft::{FftDirection, FftNum, FftPlanner};

/// Tuning knobs for planning and buffer policy.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Threads handed to multiplier callbacks. The transforms themselves run
    /// on the calling thread.
    pub threads: usize,
    /// Pin the subtransform size `m` (0 searches).
    pub m_option: usize,
    /// Pin the residues-per-pass count `D` (0 searches).
    pub d_option: usize,
    /// Overrides the default in-place policy of `C > 1`.
    pub inplace_option: Option<bool>,
    /// Extra FFT-friendly sizes scanned past the natural stop.
    pub surplus_fft_sizes: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            threads: 1,
            m_option: 0,
            d_option: 0,
            inplace_option: None,
            surplus_fft_sizes: 3,
        }
    }
}

/// Realised split geometry. `p` and `n` are stored post-collapse: the p=2
/// kernel folds its two blocks into single length-m rows, so it reports
/// `p = 1`, `n = q` and a residue space of `q`, exactly like p=1.
#[derive(Clone, Copy, Debug)]
pub struct Geometry {
    /// Number of physical data values per copy.
    pub l: usize,
    /// Minimum padded length requested.
    pub m_min: usize,
    /// Batch width (number of interleaved copies).
    pub c: usize,
    /// Subtransform length.
    pub m: usize,
    /// Blocks per residue tile.
    pub p: usize,
    /// Residue split of the padded length `N = m q`.
    pub q: usize,
    /// `q / p` for the inner kernels, `q` otherwise.
    pub n: usize,
    /// Total residue classes iterated.
    pub residues: usize,
    /// Residues handled per pass.
    pub d: usize,
    /// Whether passes may work inside the caller's output buffer.
    pub inplace: bool,
}

enum Kernel<T> {
    Explicit,
    Single {
        zeta_qm: ZetaTable<T>,
    },
    Two {
        zeta_q: Vec<Complex<T>>,
        zeta_qm: ZetaTable<T>,
        zeta_qm2: ZetaTable<T>,
    },
    Inner {
        zeta_qm: ZetaTable<T>,
        zeta_qp: ZetaTable<T>,
        fft_p: Mfft1d<T>,
        ifft_p: Mfft1d<T>,
    },
}

pub struct PadFft<T> {
    geom: Geometry,
    kernel: Kernel<T>,
    fft_m: Mfft1d<T>,
    ifft_m: Mfft1d<T>,
}

impl<T: FftNum + Float> PadFft<T>
where
    f64: AsPrimitive<T>,
{
    /// Build a transform with an explicit `(m, q, D)` split.
    pub fn with_split(
        l: usize,
        m_min: usize,
        c: usize,
        m: usize,
        q: usize,
        d: usize,
        options: Options,
    ) -> Result<PadFft<T>, PadConvError> {
        let geom = Geometry::common(l, m_min, c, m, q, d, options)?;
        let mut planner = FftPlanner::new();
        Self::init(geom, &mut planner)
    }

    /// Normal entry point: search the `(m, q, D)` space with the supplied
    /// timing application and keep the fastest split.
    pub fn new<A: Application<T, PadFft<T>>>(
        l: usize,
        m_min: usize,
        c: usize,
        app: &mut A,
        explicit: bool,
        fixed: bool,
        options: Options,
    ) -> Result<PadFft<T>, PadConvError> {
        let opt = Opt::scan(l, m_min, c, explicit, fixed, &options, |m, q, d| {
            let trial_min = if q == 1 { m } else { m_min };
            let fft = PadFft::with_split(l, trial_min, c, m, q, d, options).ok()?;
            app.init(&fft).ok()?;
            let t = meantime(|k| app.time(&fft, k));
            app.clear();
            Some(t)
        })?;
        let m_min = if explicit { opt.m } else { m_min };
        Self::with_split(l, m_min, c, opt.m, opt.q, opt.d, options)
    }

    fn init(geom: Geometry, planner: &mut FftPlanner<T>) -> Result<PadFft<T>, PadConvError> {
        let Geometry { l, c, m, p, q, .. } = geom;
        if q == 1 {
            let (fft_m, ifft_m) = if c == 1 {
                (
                    Mfft1d::new(m, FftDirection::Forward, 1, m, planner)?,
                    Mfft1d::new(m, FftDirection::Inverse, 1, m, planner)?,
                )
            } else {
                (
                    Mfft1d::new(m, FftDirection::Forward, c, 1, planner)?,
                    Mfft1d::new(m, FftDirection::Inverse, c, 1, planner)?,
                )
            };
            return Ok(PadFft {
                geom,
                kernel: Kernel::Explicit,
                fft_m,
                ifft_m,
            });
        }

        let (fft_m, ifft_m) = if c == 1 {
            (
                Mfft1d::new(m, FftDirection::Forward, 1, m, planner)?,
                Mfft1d::new(m, FftDirection::Inverse, 1, m, planner)?,
            )
        } else {
            (
                Mfft1d::new(m, FftDirection::Forward, c, 1, planner)?,
                Mfft1d::new(m, FftDirection::Inverse, c, 1, planner)?,
            )
        };

        let zeta_qm = ZetaTable::zeta_qm(q, m, FftDirection::Forward)?;
        let kernel = if p == 1 {
            if l > m {
                // Collapsed p=2 geometry: two data blocks folded per row.
                Kernel::Two {
                    zeta_q: zeta_q(q, FftDirection::Forward)?,
                    zeta_qm,
                    zeta_qm2: ZetaTable::zeta_qm2(q, m, l, FftDirection::Forward)?,
                }
            } else {
                Kernel::Single { zeta_qm }
            }
        } else {
            let n = geom.n;
            let (fft_p, ifft_p) = if c == 1 {
                (
                    Mfft1d::new(p, FftDirection::Forward, m, 1, planner)?,
                    Mfft1d::new(p, FftDirection::Inverse, m, 1, planner)?,
                )
            } else {
                (
                    Mfft1d::new(p, FftDirection::Forward, c * m, 1, planner)?,
                    Mfft1d::new(p, FftDirection::Inverse, c * m, 1, planner)?,
                )
            };
            Kernel::Inner {
                zeta_qm,
                zeta_qp: ZetaTable::zeta_qp(n, p, FftDirection::Forward)?,
                fft_p,
                ifft_p,
            }
        };
        Ok(PadFft {
            geom,
            kernel,
            fft_m,
            ifft_m,
        })
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geom
    }

    pub(crate) fn is_two_block(&self) -> bool {
        matches!(self.kernel, Kernel::Two { .. })
    }

    pub(crate) fn two_tables(&self) -> Option<(&[Complex<T>], &ZetaTable<T>)> {
        match &self.kernel {
            Kernel::Two { zeta_q, zeta_qm, .. } => Some((zeta_q, zeta_qm)),
            _ => None,
        }
    }

    pub(crate) fn fft_m(&self) -> &Mfft1d<T> {
        &self.fft_m
    }

    pub(crate) fn ifft_m(&self) -> &Mfft1d<T> {
        &self.ifft_m
    }

    /// Realised padded length `N`.
    pub fn size(&self) -> usize {
        self.geom.size()
    }

    /// Complex values the caller must supply per input array.
    pub fn input_size(&self) -> usize {
        self.geom.c * self.geom.l
    }

    /// Complex values of one full hybrid spectrum.
    pub fn spectrum_size(&self) -> usize {
        self.geom.c * self.size()
    }

    /// Work values consumed by one pass (the `F` blocks of the drivers).
    pub fn work_size(&self) -> usize {
        self.geom.work_size()
    }

    pub fn work_size_w(&self) -> usize {
        self.geom.work_size_w()
    }

    pub fn work_size_v(&self, a: usize, b: usize) -> usize {
        self.geom.work_size_v(a, b)
    }

    pub fn loop2(&self, a: usize, b: usize) -> bool {
        self.geom.loop2(a, b)
    }

    /// Complex values per single residue inside a full spectrum.
    pub fn residue_block(&self) -> usize {
        self.geom.c * self.geom.m * self.geom.p
    }

    fn pass_width(&self, r0: usize) -> usize {
        (self.geom.residues - r0).min(self.geom.d)
    }

    /// Zero the pad columns of a non-inplace work buffer. Only the p=1 kernel
    /// leaves them untouched between passes; everything else rewrites its
    /// rows completely.
    pub fn pad(&self, w: &mut [Complex<T>]) {
        let Geometry { l, c, m, d, .. } = self.geom;
        if !matches!(self.kernel, Kernel::Single { .. }) || l >= m {
            return;
        }
        let zero = Complex::new(T::zero(), T::zero());
        if c == 1 {
            for di in 0..d {
                for v in &mut w[di * m + l..(di + 1) * m] {
                    *v = zero;
                }
            }
        } else {
            for v in &mut w[c * l..c * m] {
                *v = zero;
            }
        }
    }

    /// Transform all residues of `f` into the full hybrid spectrum `big`.
    /// Unnormalised; the inverse pair scales by `N`.
    pub fn forward(
        &self,
        f: &[Complex<T>],
        big: &mut [Complex<T>],
        mut w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        if let Some(w) = w.as_deref_mut() {
            self.pad(w);
        }
        let b = self.residue_block();
        let mut r = 0;
        while r < self.geom.residues {
            let width = b * self.pass_width(r);
            self.forward_pass(f, &mut big[b * r..b * r + width], r, w.as_deref_mut())?;
            r += self.geom.d;
        }
        Ok(())
    }

    /// Inverse of [`forward`](Self::forward); `big` is destroyed.
    pub fn backward(
        &self,
        big: &mut [Complex<T>],
        f: &mut [Complex<T>],
        mut w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let b = self.residue_block();
        let mut r = 0;
        while r < self.geom.residues {
            let width = b * self.pass_width(r);
            self.backward_pass(&mut big[b * r..b * r + width], f, r, w.as_deref_mut())?;
            r += self.geom.d;
        }
        Ok(())
    }

    /// One pass of up to `D` residues starting at class `r0`. `w` of
    /// [`work_size_w`](Self::work_size_w) values keeps the caller's `fout`
    /// untouched until the final subtransform; `None` works in place.
    pub fn forward_pass(
        &self,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        match (&self.kernel, self.geom.c == 1) {
            (Kernel::Explicit, true) => self.forward_explicit(f, fout),
            (Kernel::Explicit, false) => self.forward_explicit_many(f, fout),
            (Kernel::Single { zeta_qm }, true) => self.forward1(zeta_qm, f, fout, r0, w),
            (Kernel::Single { zeta_qm }, false) => self.forward1_many(zeta_qm, f, fout, r0, w),
            (Kernel::Two { zeta_q, zeta_qm, .. }, true) => {
                self.forward2(zeta_q, zeta_qm, f, fout, r0, w)
            }
            (Kernel::Two { zeta_q, zeta_qm, .. }, false) => {
                self.forward2_many(zeta_q, zeta_qm, f, fout, r0, w)
            }
            (
                Kernel::Inner {
                    zeta_qm,
                    zeta_qp,
                    fft_p,
                    ..
                },
                true,
            ) => self.forward_inner(zeta_qm, zeta_qp, fft_p, f, fout, r0, w),
            (
                Kernel::Inner {
                    zeta_qm,
                    zeta_qp,
                    fft_p,
                    ..
                },
                false,
            ) => self.forward_inner_many(zeta_qm, zeta_qp, fft_p, f, fout, r0, w),
        }
    }

    /// Adjoint of one forward pass; the first residue class assigns `f`,
    /// later ones accumulate. `fin` is destroyed.
    pub fn backward_pass(
        &self,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        match (&self.kernel, self.geom.c == 1) {
            (Kernel::Explicit, true) => self.backward_explicit(fin, f),
            (Kernel::Explicit, false) => self.backward_explicit_many(fin, f),
            (Kernel::Single { zeta_qm }, true) => self.backward1(zeta_qm, fin, f, r0, w),
            (Kernel::Single { zeta_qm }, false) => self.backward1_many(zeta_qm, fin, f, r0, w),
            (
                Kernel::Two {
                    zeta_qm, zeta_qm2, ..
                },
                true,
            ) => self.backward2(zeta_qm, zeta_qm2, fin, f, r0, w),
            (
                Kernel::Two {
                    zeta_qm, zeta_qm2, ..
                },
                false,
            ) => self.backward2_many(zeta_qm, zeta_qm2, fin, f, r0, w),
            (
                Kernel::Inner {
                    zeta_qm,
                    zeta_qp,
                    ifft_p,
                    ..
                },
                true,
            ) => self.backward_inner(zeta_qm, zeta_qp, ifft_p, fin, f, r0, w),
            (
                Kernel::Inner {
                    zeta_qm,
                    zeta_qp,
                    ifft_p,
                    ..
                },
                false,
            ) => self.backward_inner_many(zeta_qm, zeta_qp, ifft_p, fin, f, r0, w),
        }
    }

    fn forward_explicit(&self, f: &[Complex<T>], fout: &mut [Complex<T>]) -> Result<(), PadConvError> {
        let Geometry { l, m, .. } = self.geom;
        let zero = Complex::new(T::zero(), T::zero());
        fout[..l].copy_from_slice(&f[..l]);
        for v in &mut fout[l..m] {
            *v = zero;
        }
        self.fft_m.execute(fout, 1)
    }

    fn forward_explicit_many(
        &self,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, .. } = self.geom;
        let zero = Complex::new(T::zero(), T::zero());
        fout[..c * l].copy_from_slice(&f[..c * l]);
        for v in &mut fout[c * l..c * m] {
            *v = zero;
        }
        self.fft_m.execute(fout, c)
    }

    fn backward_explicit(
        &self,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let l = self.geom.l;
        self.ifft_m.execute(fin, 1)?;
        f[..l].copy_from_slice(&fin[..l]);
        Ok(())
    }

    fn backward_explicit_many(
        &self,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, .. } = self.geom;
        self.ifft_m.execute(fin, c)?;
        f[..c * l].copy_from_slice(&fin[..c * l]);
        Ok(())
    }

    // p=1 && C=1
    fn forward1(
        &self,
        zeta_qm: &ZetaTable<T>,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, .. } = self.geom;
        let d0 = self.pass_width(r0);
        let fill = |w: &mut [Complex<T>], zero_pad: bool| {
            if zero_pad && l < m {
                let zero = Complex::new(T::zero(), T::zero());
                for d in 0..d0 {
                    for v in &mut w[d * m + l..(d + 1) * m] {
                        *v = zero;
                    }
                }
            }
            let first = (r0 == 0) as usize;
            if first == 1 {
                w[..l].copy_from_slice(&f[..l]);
            }
            for d in first..d0 {
                let r = r0 + d;
                let row = &mut w[d * m..d * m + l];
                let zr = zeta_qm.row(r);
                row[0] = f[0];
                for s in 1..l {
                    row[s] = zr[s] * f[s];
                }
            }
        };
        match w {
            Some(w) => {
                fill(w, false);
                self.fft_m.execute_to(w, fout, d0)
            }
            None => {
                fill(fout, true);
                self.fft_m.execute(fout, d0)
            }
        }
    }

    fn backward1(
        &self,
        zeta_qm: &ZetaTable<T>,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, .. } = self.geom;
        let d0 = self.pass_width(r0);
        let wb: &[Complex<T>] = match w {
            Some(w) => {
                self.ifft_m.execute_to(fin, w, d0)?;
                w
            }
            None => {
                self.ifft_m.execute(fin, d0)?;
                fin
            }
        };
        let first = (r0 == 0) as usize;
        if first == 1 {
            f[..l].copy_from_slice(&wb[..l]);
        }
        for d in first..d0 {
            let r = r0 + d;
            let row = &wb[d * m..d * m + l];
            let zr = zeta_qm.row(r);
            f[0] = f[0] + row[0];
            for s in 1..l {
                f[s] = f[s] + zr[s].conj() * row[s];
            }
        }
        Ok(())
    }

    // p=1 && C>1 (one residue per pass)
    fn forward1_many(
        &self,
        zeta_qm: &ZetaTable<T>,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, .. } = self.geom;
        let fill = |w: &mut [Complex<T>], zero_pad: bool| {
            if zero_pad && l < m {
                let zero = Complex::new(T::zero(), T::zero());
                for v in &mut w[c * l..c * m] {
                    *v = zero;
                }
            }
            if r == 0 {
                w[..c * l].copy_from_slice(&f[..c * l]);
            } else {
                w[..c].copy_from_slice(&f[..c]);
                let zr = zeta_qm.row(r);
                for s in 1..l {
                    let zs = zr[s];
                    for ci in 0..c {
                        w[c * s + ci] = zs * f[c * s + ci];
                    }
                }
            }
        };
        match w {
            Some(w) => {
                fill(w, false);
                self.fft_m.execute_to(w, fout, c)
            }
            None => {
                fill(fout, true);
                self.fft_m.execute(fout, c)
            }
        }
    }

    fn backward1_many(
        &self,
        zeta_qm: &ZetaTable<T>,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, .. } = self.geom;
        let wb: &[Complex<T>] = match w {
            Some(w) => {
                self.ifft_m.execute_to(fin, w, c)?;
                w
            }
            None => {
                self.ifft_m.execute(fin, c)?;
                fin
            }
        };
        if r == 0 {
            f[..c * l].copy_from_slice(&wb[..c * l]);
        } else {
            for ci in 0..c {
                f[ci] = f[ci] + wb[ci];
            }
            let zr = zeta_qm.row(r);
            for s in 1..l {
                let zs = zr[s].conj();
                for ci in 0..c {
                    f[c * s + ci] = f[c * s + ci] + zs * wb[c * s + ci];
                }
            }
        }
        Ok(())
    }

    // p=2 && C=1
    fn forward2(
        &self,
        zeta_q: &[Complex<T>],
        zeta_qm: &ZetaTable<T>,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, .. } = self.geom;
        let d0 = self.pass_width(r0);
        let lm = l - m;
        let fill = |w: &mut [Complex<T>]| {
            let first = (r0 == 0) as usize;
            if first == 1 {
                for s in 0..lm {
                    w[s] = f[s] + f[m + s];
                }
                w[lm..m].copy_from_slice(&f[lm..m]);
            }
            for d in first..d0 {
                let r = r0 + d;
                let row = &mut w[d * m..(d + 1) * m];
                let zq = zeta_q[r];
                let zr = zeta_qm.row(r);
                row[0] = f[0] + zq * f[m];
                for s in 1..lm {
                    row[s] = zr[s] * (f[s] + zq * f[m + s]);
                }
                for s in lm..m {
                    row[s] = zr[s] * f[s];
                }
            }
        };
        match w {
            Some(w) => {
                fill(w);
                self.fft_m.execute_to(w, fout, d0)
            }
            None => {
                fill(fout);
                self.fft_m.execute(fout, d0)
            }
        }
    }

    fn backward2(
        &self,
        zeta_qm: &ZetaTable<T>,
        zeta_qm2: &ZetaTable<T>,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, .. } = self.geom;
        let d0 = self.pass_width(r0);
        let wb: &[Complex<T>] = match w {
            Some(w) => {
                self.ifft_m.execute_to(fin, w, d0)?;
                w
            }
            None => {
                self.ifft_m.execute(fin, d0)?;
                fin
            }
        };
        let first = (r0 == 0) as usize;
        if first == 1 {
            f[..m].copy_from_slice(&wb[..m]);
            for s in m..l {
                // the second block reuses the same inverse row: W - m
                f[s] = wb[s - m];
            }
        }
        for d in first..d0 {
            let r = r0 + d;
            let row = &wb[d * m..(d + 1) * m];
            let zr = zeta_qm.row(r);
            let zr2 = zeta_qm2.row(r);
            f[0] = f[0] + row[0];
            for s in 1..m {
                f[s] = f[s] + zr[s].conj() * row[s];
            }
            for s in m..l {
                f[s] = f[s] + zr2[s - m].conj() * row[s - m];
            }
        }
        Ok(())
    }

    // p=2 && C>1
    fn forward2_many(
        &self,
        zeta_q: &[Complex<T>],
        zeta_qm: &ZetaTable<T>,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, .. } = self.geom;
        let lm = l - m;
        let cm = c * m;
        let fill = |w: &mut [Complex<T>]| {
            if r == 0 {
                for s in 0..lm {
                    let cs = c * s;
                    for ci in 0..c {
                        w[cs + ci] = f[cs + ci] + f[cm + cs + ci];
                    }
                }
                w[c * lm..cm].copy_from_slice(&f[c * lm..cm]);
            } else {
                let zq = zeta_q[r];
                let zr = zeta_qm.row(r);
                for ci in 0..c {
                    w[ci] = f[ci] + zq * f[cm + ci];
                }
                for s in 1..lm {
                    let cs = c * s;
                    let zs = zr[s];
                    for ci in 0..c {
                        w[cs + ci] = zs * (f[cs + ci] + zq * f[cm + cs + ci]);
                    }
                }
                for s in lm..m {
                    let cs = c * s;
                    let zs = zr[s];
                    for ci in 0..c {
                        w[cs + ci] = zs * f[cs + ci];
                    }
                }
            }
        };
        match w {
            Some(w) => {
                fill(w);
                self.fft_m.execute_to(w, fout, c)
            }
            None => {
                fill(fout);
                self.fft_m.execute(fout, c)
            }
        }
    }

    fn backward2_many(
        &self,
        zeta_qm: &ZetaTable<T>,
        zeta_qm2: &ZetaTable<T>,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, .. } = self.geom;
        let cm = c * m;
        let wb: &[Complex<T>] = match w {
            Some(w) => {
                self.ifft_m.execute_to(fin, w, c)?;
                w
            }
            None => {
                self.ifft_m.execute(fin, c)?;
                fin
            }
        };
        if r == 0 {
            f[..cm].copy_from_slice(&wb[..cm]);
            for s in m..l {
                let cs = c * s;
                for ci in 0..c {
                    f[cs + ci] = wb[cs - cm + ci];
                }
            }
        } else {
            let zr = zeta_qm.row(r);
            let zr2 = zeta_qm2.row(r);
            for ci in 0..c {
                f[ci] = f[ci] + wb[ci];
            }
            for s in 1..m {
                let cs = c * s;
                let zs = zr[s].conj();
                for ci in 0..c {
                    f[cs + ci] = f[cs + ci] + zs * wb[cs + ci];
                }
            }
            for s in m..l {
                let cs = c * s;
                let zs = zr2[s - m].conj();
                for ci in 0..c {
                    f[cs + ci] = f[cs + ci] + zs * wb[cs - cm + ci];
                }
            }
        }
        Ok(())
    }

    // p>2 && C=1
    #[allow(clippy::too_many_arguments)]
    fn forward_inner(
        &self,
        zeta_qm: &ZetaTable<T>,
        zeta_qp: &ZetaTable<T>,
        fft_p: &Mfft1d<T>,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, p, n, .. } = self.geom;
        let d0 = self.pass_width(r0);
        let pm1 = p - 1;
        let stop = l - m * pm1;
        let b = m * p;
        let zero = Complex::new(T::zero(), T::zero());
        let fill = |w: &mut [Complex<T>]| -> Result<(), PadConvError> {
            let first = (r0 == 0) as usize;
            if first == 1 {
                let tile = &mut w[..b];
                tile[..m * pm1].copy_from_slice(&f[..m * pm1]);
                let mt = m * pm1;
                tile[mt..mt + stop].copy_from_slice(&f[mt..mt + stop]);
                for v in &mut tile[mt + stop..mt + m] {
                    *v = zero;
                }
                fft_p.execute(tile, m)?;
                for t in 1..p {
                    let zr = zeta_qm.row(n * t);
                    let row = &mut tile[m * t..m * (t + 1)];
                    for s in 1..m {
                        row[s] = row[s] * zr[s];
                    }
                }
            }
            for d in first..d0 {
                let r = r0 + d;
                let tile = &mut w[b * d..b * (d + 1)];
                tile[..m].copy_from_slice(&f[..m]);
                let zqp = zeta_qp.row(r);
                for t in 1..pm1 {
                    let z = zqp[t - 1];
                    let mt = m * t;
                    for s in 0..m {
                        tile[mt + s] = z * f[mt + s];
                    }
                }
                let z = zqp[pm1 - 1];
                let mt = m * pm1;
                for s in 0..stop {
                    tile[mt + s] = z * f[mt + s];
                }
                for v in &mut tile[mt + stop..mt + m] {
                    *v = zero;
                }
                fft_p.execute(tile, m)?;
                for t in 0..p {
                    let rr = n * t + r;
                    let zr = zeta_qm.row(rr);
                    let row = &mut tile[m * t..m * (t + 1)];
                    for s in 1..m {
                        row[s] = row[s] * zr[s];
                    }
                }
            }
            Ok(())
        };
        match w {
            Some(w) => {
                fill(w)?;
                self.fft_m.execute_to(w, fout, p * d0)
            }
            None => {
                fill(fout)?;
                self.fft_m.execute(fout, p * d0)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn backward_inner(
        &self,
        zeta_qm: &ZetaTable<T>,
        zeta_qp: &ZetaTable<T>,
        ifft_p: &Mfft1d<T>,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, p, n, .. } = self.geom;
        let d0 = self.pass_width(r0);
        let pm1 = p - 1;
        let stop = l - m * pm1;
        let b = m * p;
        let wb: &mut [Complex<T>] = match w {
            Some(w) => {
                self.ifft_m.execute_to(fin, w, p * d0)?;
                w
            }
            None => {
                self.ifft_m.execute(fin, p * d0)?;
                fin
            }
        };
        let first = (r0 == 0) as usize;
        if first == 1 {
            let tile = &mut wb[..b];
            for t in 1..p {
                let zr = zeta_qm.row(n * t);
                let row = &mut tile[m * t..m * (t + 1)];
                for s in 1..m {
                    row[s] = row[s] * zr[s].conj();
                }
            }
            ifft_p.execute(tile, m)?;
            f[..m * pm1].copy_from_slice(&tile[..m * pm1]);
            let mt = m * pm1;
            f[mt..mt + stop].copy_from_slice(&tile[mt..mt + stop]);
        }
        for d in first..d0 {
            let r = r0 + d;
            let tile = &mut wb[b * d..b * (d + 1)];
            for t in 0..p {
                let rr = n * t + r;
                let zr = zeta_qm.row(rr);
                let row = &mut tile[m * t..m * (t + 1)];
                for s in 1..m {
                    row[s] = row[s] * zr[s].conj();
                }
            }
            ifft_p.execute(tile, m)?;
            for s in 0..m {
                f[s] = f[s] + tile[s];
            }
            let zqp = zeta_qp.row(r);
            for t in 1..pm1 {
                let z = zqp[t - 1].conj();
                let mt = m * t;
                for s in 0..m {
                    f[mt + s] = f[mt + s] + z * tile[mt + s];
                }
            }
            let z = zqp[pm1 - 1].conj();
            let mt = m * pm1;
            for s in 0..stop {
                f[mt + s] = f[mt + s] + z * tile[mt + s];
            }
        }
        Ok(())
    }

    // p>2 && C>1
    #[allow(clippy::too_many_arguments)]
    fn forward_inner_many(
        &self,
        zeta_qm: &ZetaTable<T>,
        zeta_qp: &ZetaTable<T>,
        fft_p: &Mfft1d<T>,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, p, n, .. } = self.geom;
        let pm1 = p - 1;
        let stop = l - m * pm1;
        let cm = c * m;
        let zero = Complex::new(T::zero(), T::zero());
        let fill = |w: &mut [Complex<T>]| -> Result<(), PadConvError> {
            if r == 0 {
                w[..cm * pm1 + c * stop].copy_from_slice(&f[..cm * pm1 + c * stop]);
                for v in &mut w[cm * pm1 + c * stop..cm * p] {
                    *v = zero;
                }
                fft_p.execute(w, cm)?;
                for t in 1..p {
                    let zr = zeta_qm.row(n * t);
                    let row = &mut w[cm * t..cm * (t + 1)];
                    for s in 1..m {
                        let zs = zr[s];
                        let cs = c * s;
                        for ci in 0..c {
                            row[cs + ci] = row[cs + ci] * zs;
                        }
                    }
                }
            } else {
                w[..cm].copy_from_slice(&f[..cm]);
                let zqp = zeta_qp.row(r);
                for t in 1..pm1 {
                    let z = zqp[t - 1];
                    let base = cm * t;
                    for i in 0..cm {
                        w[base + i] = z * f[base + i];
                    }
                }
                let z = zqp[pm1 - 1];
                let base = cm * pm1;
                for i in 0..c * stop {
                    w[base + i] = z * f[base + i];
                }
                for v in &mut w[base + c * stop..base + cm] {
                    *v = zero;
                }
                fft_p.execute(w, cm)?;
                for t in 0..p {
                    let rr = n * t + r;
                    let zr = zeta_qm.row(rr);
                    let row = &mut w[cm * t..cm * (t + 1)];
                    for s in 1..m {
                        let zs = zr[s];
                        let cs = c * s;
                        for ci in 0..c {
                            row[cs + ci] = row[cs + ci] * zs;
                        }
                    }
                }
            }
            Ok(())
        };
        match w {
            Some(w) => {
                fill(w)?;
                for t in 0..p {
                    let base = cm * t;
                    self.fft_m
                        .execute_to(&w[base..base + cm], &mut fout[base..base + cm], c)?;
                }
                Ok(())
            }
            None => {
                fill(fout)?;
                for t in 0..p {
                    let base = cm * t;
                    self.fft_m.execute(&mut fout[base..base + cm], c)?;
                }
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn backward_inner_many(
        &self,
        zeta_qm: &ZetaTable<T>,
        zeta_qp: &ZetaTable<T>,
        ifft_p: &Mfft1d<T>,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, p, n, .. } = self.geom;
        let pm1 = p - 1;
        let stop = l - m * pm1;
        let cm = c * m;
        let wb: &mut [Complex<T>] = match w {
            Some(w) => {
                for t in 0..p {
                    let base = cm * t;
                    self.ifft_m
                        .execute_to(&fin[base..base + cm], &mut w[base..base + cm], c)?;
                }
                w
            }
            None => {
                for t in 0..p {
                    let base = cm * t;
                    self.ifft_m.execute(&mut fin[base..base + cm], c)?;
                }
                fin
            }
        };
        let twiddle = |wb: &mut [Complex<T>], t: usize, rr: usize| {
            let zr = zeta_qm.row(rr);
            let row = &mut wb[cm * t..cm * (t + 1)];
            for s in 1..m {
                let zs = zr[s].conj();
                let cs = c * s;
                for ci in 0..c {
                    row[cs + ci] = row[cs + ci] * zs;
                }
            }
        };
        if r == 0 {
            for t in 1..p {
                twiddle(wb, t, n * t);
            }
            ifft_p.execute(wb, cm)?;
            f[..cm * pm1 + c * stop].copy_from_slice(&wb[..cm * pm1 + c * stop]);
        } else {
            for t in 0..p {
                twiddle(wb, t, n * t + r);
            }
            ifft_p.execute(wb, cm)?;
            for i in 0..cm {
                f[i] = f[i] + wb[i];
            }
            let zqp = zeta_qp.row(r);
            for t in 1..pm1 {
                let z = zqp[t - 1].conj();
                let base = cm * t;
                for i in 0..cm {
                    f[base + i] = f[base + i] + z * wb[base + i];
                }
            }
            let z = zqp[pm1 - 1].conj();
            let base = cm * pm1;
            for i in 0..c * stop {
                f[base + i] = f[base + i] + z * wb[base + i];
            }
        }
        Ok(())
    }
}

impl Geometry {
    pub(crate) fn common(
        l: usize,
        m_min: usize,
        c: usize,
        m: usize,
        q: usize,
        d: usize,
        options: Options,
    ) -> Result<Geometry, PadConvError> {
        if l == 0 || c == 0 || m == 0 || q == 0 {
            return Err(PadConvError::ZeroSizedTransform);
        }
        if m_min < l {
            return Err(PadConvError::PaddedShorterThanData(m_min, l));
        }
        if q == 1 {
            if m < m_min {
                return Err(PadConvError::InvalidResidueSplit(m, q, m_min));
            }
            return Ok(Geometry {
                l,
                m_min: m,
                c,
                m,
                p: 1,
                q: 1,
                n: 1,
                residues: 1,
                d: 1,
                inplace: options.inplace_option.unwrap_or(c > 1),
            });
        }
        if m * q < m_min {
            return Err(PadConvError::InvalidResidueSplit(m, q, m_min));
        }
        let p0 = div_ceil(l, m);
        let (p, n, residues) = if p0 <= 2 {
            (1, q, q)
        } else {
            if q % p0 != 0 {
                return Err(PadConvError::Unsupported(format!(
                    "inner split needs p={p0} to divide q={q}"
                )));
            }
            (p0, q / p0, q / p0)
        };
        let d = if c > 1 { 1 } else { d.max(1).min(residues) };
        Ok(Geometry {
            l,
            m_min,
            c,
            m,
            p,
            q,
            n,
            residues,
            d,
            inplace: options.inplace_option.unwrap_or(c > 1),
        })
    }

    pub fn size(&self) -> usize {
        if self.q == 1 {
            self.m
        } else {
            self.m * self.q
        }
    }

    pub fn work_size(&self) -> usize {
        self.c
            * (if self.q == 1 {
                self.m
            } else {
                self.m * self.p * self.d
            })
    }

    pub fn work_size_w(&self) -> usize {
        if self.q == 1 || self.inplace {
            0
        } else {
            self.work_size()
        }
    }

    pub fn work_size_v(&self, a: usize, b: usize) -> usize {
        if self.q == 1 || self.d >= self.residues || self.loop2(a, b) {
            0
        } else {
            self.c * self.l
        }
    }

    pub fn loop2(&self, a: usize, b: usize) -> bool {
        self.d < self.residues && 2 * self.d >= self.residues && a > b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn naive_dft(input: &[Complex<f64>]) -> Vec<Complex<f64>> {
        let n = input.len();
        (0..n)
            .map(|k| {
                let mut sum = Complex::new(0.0, 0.0);
                for (x, v) in input.iter().enumerate() {
                    let angle = -2.0 * std::f64::consts::PI * ((k * x) % n) as f64 / n as f64;
                    sum += v * Complex::new(angle.cos(), angle.sin());
                }
                sum
            })
            .collect()
    }

    fn random_signal(len: usize) -> Vec<Complex<f64>> {
        let mut rng = rand::rng();
        (0..len)
            .map(|_| Complex::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5))
            .collect()
    }

    fn padded(f: &[Complex<f64>], n: usize) -> Vec<Complex<f64>> {
        let mut v = f.to_vec();
        v.resize(n, Complex::new(0.0, 0.0));
        v
    }

    /// Forward output against the explicit padded DFT under the residue
    /// permutation, for a single copy.
    fn check_forward_permutation(fft: &PadFft<f64>, f: &[Complex<f64>]) {
        let g = *fft.geometry();
        let mut big = vec![Complex::new(0.0, 0.0); fft.spectrum_size()];
        let mut w = vec![Complex::new(0.0, 0.0); fft.work_size_w()];
        let wopt = if w.is_empty() { None } else { Some(&mut w[..]) };
        fft.forward(f, &mut big, wopt).unwrap();
        let explicit = naive_dft(&padded(f, fft.size()));
        for r in 0..g.residues {
            for t in 0..g.p {
                for s in 0..g.m {
                    let hybrid = big[g.m * (g.p * r + t) + s];
                    let want = explicit[g.n * (g.p * s + t) + r];
                    assert!(
                        (hybrid - want).norm() < 1e-9 * (1.0 + want.norm()),
                        "L={} m={} q={} r={r} t={t} s={s}: {hybrid} != {want}",
                        g.l,
                        g.m,
                        g.q
                    );
                }
            }
        }
    }

    fn check_roundtrip(fft: &PadFft<f64>, f: &[Complex<f64>]) {
        let n = fft.size() as f64;
        let mut big = vec![Complex::new(0.0, 0.0); fft.spectrum_size()];
        let mut w = vec![Complex::new(0.0, 0.0); fft.work_size_w()];
        let mut back = vec![Complex::new(0.0, 0.0); fft.input_size()];
        let wopt = if w.is_empty() { None } else { Some(&mut w[..]) };
        fft.forward(f, &mut big, wopt).unwrap();
        let wopt = if w.is_empty() { None } else { Some(&mut w[..]) };
        fft.backward(&mut big, &mut back, wopt).unwrap();
        let mut err = 0.0;
        let mut norm = 0.0;
        for (got, want) in back.iter().zip(f.iter()) {
            err += (got / n - want).norm_sqr();
            norm += want.norm_sqr();
        }
        assert!(
            (err / norm).sqrt() < 1e-12,
            "roundtrip L={} m={} q={} D={} rel err {}",
            fft.geometry().l,
            fft.geometry().m,
            fft.geometry().q,
            fft.geometry().d,
            (err / norm).sqrt()
        );
    }

    #[test]
    fn length_four_dft_matches_reference_vector() {
        let f: Vec<Complex<f64>> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        let fft = PadFft::<f64>::with_split(4, 4, 1, 4, 1, 1, Options::default()).unwrap();
        let mut big = vec![Complex::new(0.0, 0.0); 4];
        fft.forward(&f, &mut big, None).unwrap();
        let want = [
            Complex::new(10.0, 0.0),
            Complex::new(-2.0, 2.0),
            Complex::new(-2.0, 0.0),
            Complex::new(-2.0, -2.0),
        ];
        for (got, want) in big.iter().zip(want.iter()) {
            assert!((got - want).norm() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn single_block_kernel_agrees_with_explicit() {
        // p=1: L <= m.
        for (l, m, q, d) in [(3, 4, 2, 1), (4, 4, 3, 1), (5, 6, 4, 2), (7, 8, 5, 3)] {
            let fft = PadFft::<f64>::with_split(l, m * q, 1, m, q, d, Options::default()).unwrap();
            let f = random_signal(l);
            check_forward_permutation(&fft, &f);
            check_roundtrip(&fft, &f);
        }
    }

    #[test]
    fn two_block_kernel_agrees_with_explicit() {
        // p=2: m < L <= 2m, even and odd q.
        for (l, m, q, d) in [
            (5, 4, 2, 1),
            (6, 4, 3, 1),
            (7, 4, 3, 3),
            (8, 5, 4, 2),
            (12, 8, 5, 4),
        ] {
            let fft = PadFft::<f64>::with_split(l, m * q, 1, m, q, d, Options::default()).unwrap();
            let f = random_signal(l);
            check_forward_permutation(&fft, &f);
            check_roundtrip(&fft, &f);
        }
    }

    #[test]
    fn inner_kernel_agrees_with_explicit() {
        // p>2 tiles with q a multiple of p.
        for (l, m, q, d) in [
            (9, 3, 6, 1),
            (10, 3, 8, 2),
            (11, 3, 8, 1),
            (20, 5, 8, 2),
            (13, 4, 12, 3),
        ] {
            let fft = PadFft::<f64>::with_split(l, m * q, 1, m, q, d, Options::default()).unwrap();
            let f = random_signal(l);
            check_forward_permutation(&fft, &f);
            check_roundtrip(&fft, &f);
        }
    }

    #[test]
    fn in_place_passes_match_work_buffer_passes() {
        for (l, m, q, d) in [(5, 8, 3, 2), (7, 4, 3, 1), (10, 3, 8, 2)] {
            let f = random_signal(l);
            let out_of_place =
                PadFft::<f64>::with_split(l, m * q, 1, m, q, d, Options::default()).unwrap();
            let inplace = PadFft::<f64>::with_split(
                l,
                m * q,
                1,
                m,
                q,
                d,
                Options {
                    inplace_option: Some(true),
                    ..Options::default()
                },
            )
            .unwrap();
            let mut big0 = vec![Complex::new(0.0, 0.0); out_of_place.spectrum_size()];
            let mut w = vec![Complex::new(0.0, 0.0); out_of_place.work_size_w()];
            out_of_place.forward(&f, &mut big0, Some(&mut w[..])).unwrap();
            let mut big1 = vec![Complex::new(0.0, 0.0); inplace.spectrum_size()];
            inplace.forward(&f, &mut big1, None).unwrap();
            for (a, b) in big0.iter().zip(big1.iter()) {
                assert!((a - b).norm() < 1e-12, "{a} != {b}");
            }
        }
    }

    #[test]
    fn linearity() {
        let (l, m, q) = (10, 4, 6);
        let fft = PadFft::<f64>::with_split(l, m * q, 1, m, q, 2, Options::default()).unwrap();
        let f = random_signal(l);
        let g = random_signal(l);
        let alpha = Complex::new(0.7, -1.3);
        let beta = Complex::new(-0.2, 0.4);
        let combined: Vec<Complex<f64>> = f
            .iter()
            .zip(g.iter())
            .map(|(a, b)| alpha * a + beta * b)
            .collect();
        let run = |x: &[Complex<f64>]| {
            let mut big = vec![Complex::new(0.0, 0.0); fft.spectrum_size()];
            let mut w = vec![Complex::new(0.0, 0.0); fft.work_size_w()];
            fft.forward(x, &mut big, Some(&mut w[..])).unwrap();
            big
        };
        let ff = run(&f);
        let fg = run(&g);
        let fc = run(&combined);
        for i in 0..fc.len() {
            let want = alpha * ff[i] + beta * fg[i];
            assert!((fc[i] - want).norm() < 1e-9, "bin {i}");
        }
    }

    #[test]
    fn many_copies_force_single_residue_passes() {
        // L=16, M=32, C=3: D collapses to 1 and the roundtrip holds.
        let (l, c) = (16, 3);
        for (m, q) in [(16, 2), (8, 4), (4, 8)] {
            let fft = PadFft::<f64>::with_split(l, 32, c, m, q, 4, Options::default()).unwrap();
            assert_eq!(fft.geometry().d, 1);
            let f = random_signal(c * l);
            let n = fft.size() as f64;
            let mut big = vec![Complex::new(0.0, 0.0); fft.spectrum_size()];
            let mut back = vec![Complex::new(0.0, 0.0); fft.input_size()];
            fft.forward(&f, &mut big, None).unwrap();
            fft.backward(&mut big, &mut back, None).unwrap();
            for (got, want) in back.iter().zip(f.iter()) {
                assert!((got / n - want).norm() < 1e-9, "m {m} q {q}: {got} != {want}");
            }
        }
    }

    #[test]
    fn many_kernels_match_single_batch_per_channel() {
        // Includes the inner-many backward conjugate regression: each channel
        // of a C=3 transform must reproduce the C=1 result exactly.
        for (l, m, q) in [(5, 8, 3), (7, 4, 3), (10, 3, 8), (13, 4, 12)] {
            let c = 3;
            let single = PadFft::<f64>::with_split(l, m * q, 1, m, q, 1, Options::default()).unwrap();
            let many = PadFft::<f64>::with_split(l, m * q, c, m, q, 1, Options::default()).unwrap();
            let channels: Vec<Vec<Complex<f64>>> = (0..c).map(|_| random_signal(l)).collect();
            let mut interleaved = vec![Complex::new(0.0, 0.0); c * l];
            for s in 0..l {
                for (ci, ch) in channels.iter().enumerate() {
                    interleaved[c * s + ci] = ch[s];
                }
            }
            let mut big_many = vec![Complex::new(0.0, 0.0); many.spectrum_size()];
            many.forward(&interleaved, &mut big_many, None).unwrap();
            for (ci, ch) in channels.iter().enumerate() {
                let mut big = vec![Complex::new(0.0, 0.0); single.spectrum_size()];
                let mut w = vec![Complex::new(0.0, 0.0); single.work_size_w()];
                single.forward(ch, &mut big, Some(&mut w[..])).unwrap();
                for j in 0..single.spectrum_size() {
                    assert!(
                        (big[j] - big_many[c * j + ci]).norm() < 1e-9,
                        "forward L={l} m={m} q={q} channel {ci} slot {j}"
                    );
                }
            }
            let mut back_many = vec![Complex::new(0.0, 0.0); many.input_size()];
            many.backward(&mut big_many, &mut back_many, None).unwrap();
            for (ci, ch) in channels.iter().enumerate() {
                let mut big = vec![Complex::new(0.0, 0.0); single.spectrum_size()];
                let mut w = vec![Complex::new(0.0, 0.0); single.work_size_w()];
                single.forward(ch, &mut big, Some(&mut w[..])).unwrap();
                let mut back = vec![Complex::new(0.0, 0.0); single.input_size()];
                let mut w2 = vec![Complex::new(0.0, 0.0); single.work_size_w()];
                single
                    .backward(&mut big, &mut back, if w2.is_empty() { None } else { Some(&mut w2[..]) })
                    .unwrap();
                for s in 0..l {
                    assert!(
                        (back[s] - back_many[c * s + ci]).norm() < 1e-9,
                        "backward L={l} m={m} q={q} channel {ci} sample {s}"
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_bad_geometry() {
        assert!(PadFft::<f64>::with_split(8, 4, 1, 4, 2, 1, Options::default()).is_err());
        assert!(PadFft::<f64>::with_split(9, 12, 1, 3, 5, 1, Options::default()).is_err());
        assert!(PadFft::<f64>::with_split(0, 4, 1, 4, 1, 1, Options::default()).is_err());
    }
}
