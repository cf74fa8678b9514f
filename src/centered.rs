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
//! Padded FFT with the time-domain origin at `floor(L/2)`: index `s` of the
//! input holds the logical sample `s - floor(L/2)` with periodic wraparound.

use crate::err::PadConvError;
use crate::padfft::{Geometry, Options, PadFft};
use crate::planner::Application;
use crate::twiddle::zeta_shift;
use num_complex::Complex;
use num_traits::{AsPrimitive, Float};
use rustfft::{FftDirection, FftNum};

pub struct PadFftCentered<T> {
    base: PadFft<T>,
    /// Shift phases for the general path; the p=2 kernels fold the shift
    /// into the block combine and leave this empty.
    shift: Option<Vec<Complex<T>>>,
}

impl<T: FftNum + Float> PadFftCentered<T>
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
        options: Options,
    ) -> Result<PadFftCentered<T>, PadConvError> {
        Self::wrap(PadFft::with_split(l, m_min, c, m, q, d, options)?)
    }

    /// Planner entry point. Candidates are timed as plain padded FFTs; the
    /// shift costs the same for every split.
    pub fn new<A: Application<T, PadFft<T>>>(
        l: usize,
        m_min: usize,
        c: usize,
        app: &mut A,
        explicit: bool,
        fixed: bool,
        options: Options,
    ) -> Result<PadFftCentered<T>, PadConvError> {
        Self::wrap(PadFft::new(l, m_min, c, app, explicit, fixed, options)?)
    }

    fn wrap(base: PadFft<T>) -> Result<PadFftCentered<T>, PadConvError> {
        let shift = if base.is_two_block() {
            None
        } else {
            Some(zeta_shift(
                base.geometry().l,
                base.size(),
                FftDirection::Forward,
            )?)
        };
        Ok(PadFftCentered { base, shift })
    }

    pub fn geometry(&self) -> &Geometry {
        self.base.geometry()
    }

    pub fn size(&self) -> usize {
        self.base.size()
    }

    pub fn input_size(&self) -> usize {
        self.base.input_size()
    }

    pub fn spectrum_size(&self) -> usize {
        self.base.spectrum_size()
    }

    pub fn work_size(&self) -> usize {
        self.base.work_size()
    }

    pub fn work_size_w(&self) -> usize {
        self.base.work_size_w()
    }

    pub fn work_size_v(&self, a: usize, b: usize) -> usize {
        self.base.work_size_v(a, b)
    }

    pub fn loop2(&self, a: usize, b: usize) -> bool {
        self.base.loop2(a, b)
    }

    pub fn residue_block(&self) -> usize {
        self.base.residue_block()
    }

    pub fn pad(&self, w: &mut [Complex<T>]) {
        self.base.pad(w)
    }

    fn pass_width(&self, r0: usize) -> usize {
        let g = self.geometry();
        (g.residues - r0).min(g.d)
    }

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
        let g = *self.geometry();
        let mut r = 0;
        while r < g.residues {
            let width = b * self.pass_width(r);
            self.forward_pass(f, &mut big[b * r..b * r + width], r, w.as_deref_mut())?;
            r += g.d;
        }
        Ok(())
    }

    pub fn backward(
        &self,
        big: &mut [Complex<T>],
        f: &mut [Complex<T>],
        mut w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let b = self.residue_block();
        let g = *self.geometry();
        let mut r = 0;
        while r < g.residues {
            let width = b * self.pass_width(r);
            self.backward_pass(&mut big[b * r..b * r + width], f, r, w.as_deref_mut())?;
            r += g.d;
        }
        Ok(())
    }

    pub fn forward_pass(
        &self,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        match &self.shift {
            None => {
                if self.geometry().c == 1 {
                    self.forward2_centered(f, fout, r0, w)
                } else {
                    self.forward2_centered_many(f, fout, r0, w)
                }
            }
            Some(shift) => {
                self.base.forward_pass(f, fout, r0, w)?;
                self.forward_shift(shift, fout, r0);
                Ok(())
            }
        }
    }

    pub fn backward_pass(
        &self,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        match &self.shift {
            None => {
                if self.geometry().c == 1 {
                    self.backward2_centered(fin, f, r0, w)
                } else {
                    self.backward2_centered_many(fin, f, r0, w)
                }
            }
            Some(shift) => {
                self.backward_shift(shift, fin, r0);
                self.base.backward_pass(fin, f, r0, w)
            }
        }
    }

    /// Undo the origin shift on one pass of forward output, addressing each
    /// element by its explicit index `j = q s + n t + r`.
    fn forward_shift(&self, shift: &[Complex<T>], fout: &mut [Complex<T>], r0: usize) {
        let Geometry { c, m, p, q, n, .. } = *self.geometry();
        let d0 = self.pass_width(r0);
        let b = c * m * p;
        for d in 0..d0 {
            let r = r0 + d;
            let tile = &mut fout[b * d..b * (d + 1)];
            for t in 0..p {
                let rr = n * t + r;
                for s in 0..m {
                    let zeta = shift[q * s + rr].conj();
                    let base = c * (m * t + s);
                    for ci in 0..c {
                        tile[base + ci] = tile[base + ci] * zeta;
                    }
                }
            }
        }
    }

    fn backward_shift(&self, shift: &[Complex<T>], fin: &mut [Complex<T>], r0: usize) {
        let Geometry { c, m, p, q, n, .. } = *self.geometry();
        let d0 = self.pass_width(r0);
        let b = c * m * p;
        for d in 0..d0 {
            let r = r0 + d;
            let tile = &mut fin[b * d..b * (d + 1)];
            for t in 0..p {
                let rr = n * t + r;
                for s in 0..m {
                    let zeta = shift[q * s + rr];
                    let base = c * (m * t + s);
                    for ci in 0..c {
                        tile[base + ci] = tile[base + ci] * zeta;
                    }
                }
            }
        }
    }

    // p=2 fast path: the shift is folded into the block combine.
    fn forward2_centered(
        &self,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, .. } = *self.geometry();
        let (zeta_q, zeta_qm) = self.base.two_tables().ok_or_else(|| {
            PadConvError::Unsupported("centered fast path without p=2 tables".into())
        })?;
        let d0 = self.pass_width(r0);
        let h = l / 2;
        let mh = m - h;
        let lh = l - h;
        let fill = |w: &mut [Complex<T>]| {
            let first = (r0 == 0) as usize;
            if first == 1 {
                for s in 0..mh {
                    w[s] = f[h + s];
                }
                for s in mh..lh {
                    w[s] = f[s - mh] + f[h + s];
                }
                for s in lh..m {
                    w[s] = f[s - mh];
                }
            }
            for d in first..d0 {
                let r = r0 + d;
                let row = &mut w[d * m..(d + 1) * m];
                let zq = zeta_q[r].conj();
                let zr = zeta_qm.row(r);
                for s in 0..mh {
                    row[s] = zr[s] * f[h + s];
                }
                for s in mh..lh {
                    row[s] = zr[s] * (zq * f[s - mh] + f[h + s]);
                }
                for s in lh..m {
                    row[s] = zr[s] * zq * f[s - mh];
                }
            }
        };
        match w {
            Some(w) => {
                fill(w);
                self.base.fft_m().execute_to(w, fout, d0)
            }
            None => {
                fill(fout);
                self.base.fft_m().execute(fout, d0)
            }
        }
    }

    fn backward2_centered(
        &self,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r0: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, m, .. } = *self.geometry();
        let (zeta_q, zeta_qm) = self.base.two_tables().ok_or_else(|| {
            PadConvError::Unsupported("centered fast path without p=2 tables".into())
        })?;
        let d0 = self.pass_width(r0);
        let h = l / 2;
        let mh = m - h;
        let lh = l - h;
        let wb: &[Complex<T>] = match w {
            Some(w) => {
                self.base.ifft_m().execute_to(fin, w, d0)?;
                w
            }
            None => {
                self.base.ifft_m().execute(fin, d0)?;
                fin
            }
        };
        let first = (r0 == 0) as usize;
        if first == 1 {
            for s in mh..m {
                f[s - mh] = wb[s];
            }
            for s in 0..lh {
                f[h + s] = wb[s];
            }
        }
        for d in first..d0 {
            let r = r0 + d;
            let row = &wb[d * m..(d + 1) * m];
            let zq = zeta_q[r];
            let zr = zeta_qm.row(r);
            for s in mh..m {
                f[s - mh] = f[s - mh] + zr[s].conj() * zq * row[s];
            }
            for s in 0..lh {
                f[h + s] = f[h + s] + zr[s].conj() * row[s];
            }
        }
        Ok(())
    }

    fn forward2_centered_many(
        &self,
        f: &[Complex<T>],
        fout: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, .. } = *self.geometry();
        let (zeta_q, zeta_qm) = self.base.two_tables().ok_or_else(|| {
            PadConvError::Unsupported("centered fast path without p=2 tables".into())
        })?;
        let h = l / 2;
        let mh = m - h;
        let lh = l - h;
        let fill = |w: &mut [Complex<T>]| {
            if r == 0 {
                for s in 0..mh {
                    let cs = c * s;
                    for ci in 0..c {
                        w[cs + ci] = f[c * (h + s) + ci];
                    }
                }
                for s in mh..lh {
                    let cs = c * s;
                    for ci in 0..c {
                        w[cs + ci] = f[c * (s - mh) + ci] + f[c * (h + s) + ci];
                    }
                }
                for s in lh..m {
                    let cs = c * s;
                    for ci in 0..c {
                        w[cs + ci] = f[c * (s - mh) + ci];
                    }
                }
            } else {
                let zq = zeta_q[r].conj();
                let zr = zeta_qm.row(r);
                for s in 0..mh {
                    let cs = c * s;
                    let zs = zr[s];
                    for ci in 0..c {
                        w[cs + ci] = zs * f[c * (h + s) + ci];
                    }
                }
                for s in mh..lh {
                    let cs = c * s;
                    let zs = zr[s];
                    let zsq = zs * zq;
                    for ci in 0..c {
                        w[cs + ci] = zsq * f[c * (s - mh) + ci] + zs * f[c * (h + s) + ci];
                    }
                }
                for s in lh..m {
                    let cs = c * s;
                    let zs = zr[s] * zq;
                    for ci in 0..c {
                        w[cs + ci] = zs * f[c * (s - mh) + ci];
                    }
                }
            }
        };
        match w {
            Some(w) => {
                fill(w);
                self.base.fft_m().execute_to(w, fout, c)
            }
            None => {
                fill(fout);
                self.base.fft_m().execute(fout, c)
            }
        }
    }

    fn backward2_centered_many(
        &self,
        fin: &mut [Complex<T>],
        f: &mut [Complex<T>],
        r: usize,
        w: Option<&mut [Complex<T>]>,
    ) -> Result<(), PadConvError> {
        let Geometry { l, c, m, .. } = *self.geometry();
        let (zeta_q, zeta_qm) = self.base.two_tables().ok_or_else(|| {
            PadConvError::Unsupported("centered fast path without p=2 tables".into())
        })?;
        let h = l / 2;
        let mh = m - h;
        let lh = l - h;
        let wb: &[Complex<T>] = match w {
            Some(w) => {
                self.base.ifft_m().execute_to(fin, w, c)?;
                w
            }
            None => {
                self.base.ifft_m().execute(fin, c)?;
                fin
            }
        };
        if r == 0 {
            for s in mh..m {
                let cs = c * s;
                for ci in 0..c {
                    f[c * (s - mh) + ci] = wb[cs + ci];
                }
            }
            for s in 0..lh {
                let cs = c * s;
                for ci in 0..c {
                    f[c * (h + s) + ci] = wb[cs + ci];
                }
            }
        } else {
            let zq = zeta_q[r];
            let zr = zeta_qm.row(r);
            for s in mh..m {
                let cs = c * s;
                let zs = zr[s].conj() * zq;
                for ci in 0..c {
                    f[c * (s - mh) + ci] = f[c * (s - mh) + ci] + zs * wb[cs + ci];
                }
            }
            for s in 0..lh {
                let cs = c * s;
                let zs = zr[s].conj();
                for ci in 0..c {
                    f[c * (h + s) + ci] = f[c * (h + s) + ci] + zs * wb[cs + ci];
                }
            }
        }
        Ok(())
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

    /// Reference: place `f[s]` at padded position `s - floor(L/2) mod N`.
    fn centered_padded(f: &[Complex<f64>], n: usize) -> Vec<Complex<f64>> {
        let h = f.len() / 2;
        let mut v = vec![Complex::new(0.0, 0.0); n];
        for (s, &x) in f.iter().enumerate() {
            v[(s + n - h) % n] = x;
        }
        v
    }

    fn check_centered(fft: &PadFftCentered<f64>, f: &[Complex<f64>]) {
        let g = *fft.geometry();
        let mut big = vec![Complex::new(0.0, 0.0); fft.spectrum_size()];
        let mut w = vec![Complex::new(0.0, 0.0); fft.work_size_w()];
        let wopt = if w.is_empty() { None } else { Some(&mut w[..]) };
        fft.forward(f, &mut big, wopt).unwrap();
        let explicit = naive_dft(&centered_padded(f, fft.size()));
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
        // Round trip through the inverse.
        let mut back = vec![Complex::new(0.0, 0.0); fft.input_size()];
        let wopt = if w.is_empty() { None } else { Some(&mut w[..]) };
        fft.backward(&mut big, &mut back, wopt).unwrap();
        let n = fft.size() as f64;
        for (s, (got, want)) in back.iter().zip(f.iter()).enumerate() {
            assert!(
                (got / n - want).norm() < 1e-9,
                "roundtrip L={} m={} q={} sample {s}",
                g.l,
                g.m,
                g.q
            );
        }
    }

    #[test]
    fn fast_path_matches_shifted_explicit_dft() {
        // p=2 geometries, odd and even q, with and without remainder passes.
        for (l, m, q, d) in [(5, 4, 2, 1), (6, 4, 3, 1), (7, 4, 3, 2), (12, 8, 5, 4)] {
            let fft =
                PadFftCentered::<f64>::with_split(l, m * q, 1, m, q, d, Options::default()).unwrap();
            let f = random_signal(l);
            check_centered(&fft, &f);
        }
    }

    #[test]
    fn general_path_matches_shifted_explicit_dft() {
        // p=1 and p>2 go through the shift tables, as does q=1 explicit.
        for (l, m, q, d) in [(3, 4, 2, 1), (5, 6, 4, 2), (10, 3, 8, 2), (13, 4, 12, 3)] {
            let fft =
                PadFftCentered::<f64>::with_split(l, m * q, 1, m, q, d, Options::default()).unwrap();
            let f = random_signal(l);
            check_centered(&fft, &f);
        }
        let explicit =
            PadFftCentered::<f64>::with_split(6, 8, 1, 8, 1, 1, Options::default()).unwrap();
        let f = random_signal(6);
        check_centered(&explicit, &f);
    }

    #[test]
    fn many_matches_single_per_channel() {
        for (l, m, q) in [(7, 4, 3), (5, 8, 3)] {
            let c = 2;
            let single =
                PadFftCentered::<f64>::with_split(l, m * q, 1, m, q, 1, Options::default()).unwrap();
            let many =
                PadFftCentered::<f64>::with_split(l, m * q, c, m, q, 1, Options::default()).unwrap();
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
                        "L={l} m={m} q={q} channel {ci} slot {j}"
                    );
                }
            }
        }
    }
}
