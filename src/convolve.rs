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
//! Dealiased convolution drivers: `A` forwards, a pointwise multiplier, `B`
//! backwards per residue pass, with work-buffer reuse when the pass count
//! allows interleaving the two loops.

use crate::err::PadConvError;
use crate::hermitian::PadFftHermitian;
use crate::padfft::{Options, PadFft};
use num_complex::Complex;
use num_traits::{AsPrimitive, Float};
use rustfft::FftNum;

/// Pointwise multiplier over `A` spectra of equal length; the product must
/// land in the first buffer. The second argument is the thread budget.
pub type Multiplier<T> = fn(&mut [&mut [Complex<T>]], usize);

/// Reference binary multiplier: `F[0][i] *= F[1][i]`.
pub fn multbinary<T: FftNum>(bufs: &mut [&mut [Complex<T>]], _threads: usize) {
    let (dst, rest) = bufs.split_at_mut(1);
    for (d, s) in dst[0].iter_mut().zip(rest[0].iter()) {
        *d = *d * *s;
    }
}

/// Pointwise multiplier over real work data (the Hermitian path).
pub type RealMultiplier<T> = fn(&mut [&mut [T]], usize);

pub fn realmultbinary<T: Float>(bufs: &mut [&mut [T]], _threads: usize) {
    let (dst, rest) = bufs.split_at_mut(1);
    for (d, s) in dst[0].iter_mut().zip(rest[0].iter()) {
        *d = *d * *s;
    }
}

/// 1-D dealiased convolution of `A` inputs into `B` outputs over a shared
/// padded FFT. The transform is borrowed, the work buffers are owned.
pub struct Convolution<'f, T> {
    fft: &'f PadFft<T>,
    a: usize,
    b: usize,
    threads: usize,
    big: Vec<Vec<Complex<T>>>,
    v: Vec<Vec<Complex<T>>>,
    w: Vec<Complex<T>>,
    scale: T,
    loop2: bool,
    /// With spare forward slots the backward scratch is `big[B]` and the pad
    /// region of `w` survives every pass untouched.
    w0_from_big: bool,
}

impl<'f, T: FftNum + Float> Convolution<'f, T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(
        fft: &'f PadFft<T>,
        a: usize,
        b: usize,
        options: Options,
    ) -> Result<Convolution<'f, T>, PadConvError> {
        if a == 0 || b == 0 {
            return Err(PadConvError::Unsupported(format!(
                "convolution needs at least one input and one output, got A={a}, B={b}"
            )));
        }
        let zero = Complex::new(T::zero(), T::zero());
        let slots = a.max(b);
        let mut big = Vec::with_capacity(slots);
        for _ in 0..slots {
            big.push(vec![zero; fft.work_size()]);
        }
        let mut w = vec![zero; fft.work_size_w()];
        if !w.is_empty() {
            fft.pad(&mut w);
        }
        let loop2 = fft.loop2(a, b);
        let extra = loop2 as usize;
        let w0_from_big = fft.geometry().q > 1 && a > b + extra;
        let scale = (1.0f64 / fft.size() as f64).as_();
        Ok(Convolution {
            fft,
            a,
            b,
            threads: options.threads,
            big,
            v: Vec::new(),
            w,
            scale,
            loop2,
            w0_from_big,
        })
    }

    pub fn fft(&self) -> &PadFft<T> {
        self.fft
    }

    pub fn inputs(&self) -> usize {
        self.a
    }

    pub fn outputs(&self) -> usize {
        self.b
    }

    /// Convolve `A` inputs into `B` distinct outputs and normalise.
    pub fn convolve(
        &mut self,
        f: &[&[Complex<T>]],
        h: &mut [&mut [Complex<T>]],
        mult: Multiplier<T>,
    ) -> Result<(), PadConvError> {
        self.convolve_raw_out(f, h, mult)?;
        let len = self.fft.input_size();
        for hb in h[..self.b].iter_mut() {
            for v in hb[..len].iter_mut() {
                *v = *v * self.scale;
            }
        }
        Ok(())
    }

    /// Convolve in place: the first `B` buffers are replaced by the outputs.
    pub fn convolve_in_place(
        &mut self,
        fh: &mut [&mut [Complex<T>]],
        mult: Multiplier<T>,
    ) -> Result<(), PadConvError> {
        self.convolve_raw_in(fh, mult)?;
        let len = self.fft.input_size();
        for hb in fh[..self.b].iter_mut() {
            for v in hb[..len].iter_mut() {
                *v = *v * self.scale;
            }
        }
        Ok(())
    }

    fn multiply(&mut self, mult: Multiplier<T>, rotated: bool) {
        let mut refs: Vec<&mut [Complex<T>]> = self.big[..self.a]
            .iter_mut()
            .map(|v| v.as_mut_slice())
            .collect();
        if rotated {
            refs.rotate_right(1);
        }
        mult(&mut refs, self.threads);
    }

    /// Backward one pass with the right scratch: a spare `big` slot, the
    /// shared `w` buffer (re-padded by the caller), or in place.
    fn backward_slot(
        &mut self,
        src: usize,
        h: &mut [Complex<T>],
        r: usize,
    ) -> Result<(), PadConvError> {
        if self.w0_from_big {
            let scratch = self.b;
            debug_assert_ne!(src, scratch);
            let (lo, hi) = self.big.split_at_mut(src.max(scratch));
            let (fin, w) = if src < scratch {
                (&mut lo[src], &mut hi[0])
            } else {
                (&mut hi[0], &mut lo[scratch])
            };
            self.fft.backward_pass(fin, h, r, Some(w))
        } else if self.w.is_empty() {
            self.fft.backward_pass(&mut self.big[src], h, r, None)
        } else {
            self.fft.backward_pass(&mut self.big[src], h, r, Some(&mut self.w))
        }
    }

    fn forward_slot(
        &mut self,
        f: &[Complex<T>],
        dst: usize,
        r: usize,
    ) -> Result<(), PadConvError> {
        let w = if self.w.is_empty() {
            None
        } else {
            Some(&mut self.w[..])
        };
        self.fft.forward_pass(f, &mut self.big[dst], r, w)
    }

    fn repad(&mut self) {
        if !self.w.is_empty() && !self.w0_from_big {
            self.fft.pad(&mut self.w);
        }
    }

    pub(crate) fn convolve_raw_out(
        &mut self,
        f: &[&[Complex<T>]],
        h: &mut [&mut [Complex<T>]],
        mult: Multiplier<T>,
    ) -> Result<(), PadConvError> {
        let g = *self.fft.geometry();
        if g.q == 1 {
            for ai in 0..self.a {
                self.forward_slot(f[ai], ai, 0)?;
            }
            self.multiply(mult, false);
            for bi in 0..self.b {
                self.fft.backward_pass(&mut self.big[bi], &mut h[bi][..], 0, None)?;
            }
            return Ok(());
        }
        if self.loop2 {
            return self.loop2_pass(|i| f[i], h, mult);
        }
        let mut r = 0;
        while r < g.residues {
            for ai in 0..self.a {
                self.forward_slot(f[ai], ai, r)?;
            }
            self.multiply(mult, false);
            for bi in 0..self.b {
                self.backward_slot(bi, &mut h[bi][..], r)?;
            }
            self.repad();
            r += g.d;
        }
        Ok(())
    }

    pub(crate) fn convolve_raw_in(
        &mut self,
        fh: &mut [&mut [Complex<T>]],
        mult: Multiplier<T>,
    ) -> Result<(), PadConvError> {
        let g = *self.fft.geometry();
        if g.q == 1 {
            for ai in 0..self.a {
                self.forward_slot(&fh[ai][..], ai, 0)?;
            }
            self.multiply(mult, false);
            for bi in 0..self.b {
                self.fft.backward_pass(&mut self.big[bi], &mut fh[bi][..], 0, None)?;
            }
            return Ok(());
        }
        if self.loop2 {
            // The interleaved order reads each input's second pass before its
            // first output lands, so aliasing is safe without V.
            return self.loop2_in(fh, mult);
        }
        let multi_pass = g.d < g.residues;
        if multi_pass && self.v.is_empty() {
            let zero = Complex::new(T::zero(), T::zero());
            for _ in 0..self.b {
                self.v.push(vec![zero; self.fft.input_size()]);
            }
        }
        let mut r = 0;
        while r < g.residues {
            for ai in 0..self.a {
                let w = if self.w.is_empty() {
                    None
                } else {
                    Some(&mut self.w[..])
                };
                self.fft.forward_pass(&fh[ai][..], &mut self.big[ai], r, w)?;
            }
            self.multiply(mult, false);
            for bi in 0..self.b {
                if multi_pass {
                    let mut v = std::mem::take(&mut self.v[bi]);
                    self.backward_slot(bi, &mut v, r)?;
                    self.v[bi] = v;
                } else {
                    self.backward_slot(bi, &mut fh[bi][..], r)?;
                }
            }
            self.repad();
            r += g.d;
        }
        if multi_pass {
            let len = self.fft.input_size();
            for bi in 0..self.b {
                fh[bi][..len].copy_from_slice(&self.v[bi][..len]);
            }
        }
        Ok(())
    }

    /// Two-loop path: stage residue `D` forwards into the rotated slot
    /// assignment while draining residue 0 backwards, halving peak memory.
    fn loop2_pass<'x>(
        &mut self,
        f: impl Fn(usize) -> &'x [Complex<T>],
        h: &mut [&mut [Complex<T>]],
        mult: Multiplier<T>,
    ) -> Result<(), PadConvError>
    where
        T: 'x,
    {
        let d = self.fft.geometry().d;
        let a = self.a;
        let fp = move |i: usize| (i + a - 1) % a;
        for ai in 0..self.a {
            self.forward_slot(f(ai), ai, 0)?;
        }
        self.multiply(mult, false);
        for bi in 0..self.b {
            self.forward_slot(f(bi), fp(bi), d)?;
            self.backward_slot(bi, &mut h[bi][..], 0)?;
            self.repad();
        }
        for ai in self.b..self.a {
            self.forward_slot(f(ai), fp(ai), d)?;
        }
        self.multiply(mult, true);
        for bi in 0..self.b {
            let src = fp(bi);
            let scratch = fp(self.b);
            debug_assert_ne!(src, scratch);
            let (lo, hi) = self.big.split_at_mut(src.max(scratch));
            let (fin, w) = if src < scratch {
                (&mut lo[src], &mut hi[0])
            } else {
                (&mut hi[0], &mut lo[scratch])
            };
            self.fft.backward_pass(fin, &mut h[bi][..], d, Some(w))?;
        }
        Ok(())
    }

    fn loop2_in(
        &mut self,
        fh: &mut [&mut [Complex<T>]],
        mult: Multiplier<T>,
    ) -> Result<(), PadConvError> {
        let d = self.fft.geometry().d;
        let a = self.a;
        let fp = move |i: usize| (i + a - 1) % a;
        for ai in 0..self.a {
            self.forward_slot(&fh[ai][..], ai, 0)?;
        }
        self.multiply(mult, false);
        for bi in 0..self.b {
            self.forward_slot(&fh[bi][..], fp(bi), d)?;
            self.backward_slot(bi, &mut fh[bi][..], 0)?;
            self.repad();
        }
        for ai in self.b..self.a {
            self.forward_slot(&fh[ai][..], fp(ai), d)?;
        }
        self.multiply(mult, true);
        for bi in 0..self.b {
            let src = fp(bi);
            let scratch = fp(self.b);
            debug_assert_ne!(src, scratch);
            let (lo, hi) = self.big.split_at_mut(src.max(scratch));
            let (fin, w) = if src < scratch {
                (&mut lo[src], &mut hi[0])
            } else {
                (&mut hi[0], &mut lo[scratch])
            };
            self.fft.backward_pass(fin, &mut fh[bi][..], d, Some(w))?;
        }
        Ok(())
    }
}

/// Hermitian 1-D convolution: coefficients in, coefficients out, with the
/// pointwise product taken on the synthesised real data.
pub struct ConvolutionHermitian<'f, T> {
    fft: &'f PadFftHermitian<T>,
    a: usize,
    b: usize,
    threads: usize,
    big: Vec<Vec<T>>,
    v: Vec<Vec<Complex<T>>>,
    w: Vec<Complex<T>>,
    scale: T,
}

impl<'f, T: FftNum + Float> ConvolutionHermitian<'f, T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(
        fft: &'f PadFftHermitian<T>,
        a: usize,
        b: usize,
        options: Options,
    ) -> Result<ConvolutionHermitian<'f, T>, PadConvError> {
        if a == 0 || b == 0 {
            return Err(PadConvError::Unsupported(format!(
                "convolution needs at least one input and one output, got A={a}, B={b}"
            )));
        }
        let slots = a.max(b);
        let mut big = Vec::with_capacity(slots);
        for _ in 0..slots {
            big.push(vec![T::zero(); fft.work_size_real()]);
        }
        let w = vec![Complex::new(T::zero(), T::zero()); fft.work_size_coeff()];
        let scale = (1.0f64 / fft.size() as f64).as_();
        Ok(ConvolutionHermitian {
            fft,
            a,
            b,
            threads: options.threads,
            big,
            v: Vec::new(),
            w,
            scale,
        })
    }

    pub fn fft(&self) -> &PadFftHermitian<T> {
        self.fft
    }

    pub fn inputs(&self) -> usize {
        self.a
    }

    pub fn outputs(&self) -> usize {
        self.b
    }

    pub fn convolve(
        &mut self,
        f: &[&[Complex<T>]],
        h: &mut [&mut [Complex<T>]],
        mult: RealMultiplier<T>,
    ) -> Result<(), PadConvError> {
        let residues = self.fft.residues();
        let d = self.fft.per_pass();
        let mut r = 0;
        while r < residues {
            for ai in 0..self.a {
                self.fft
                    .forward_pass(f[ai], &mut self.big[ai], r, &mut self.w)?;
            }
            self.multiply(mult);
            for bi in 0..self.b {
                self.fft
                    .backward_pass(&self.big[bi], &mut h[bi][..], r, &mut self.w)?;
            }
            r += d;
        }
        let len = self.fft.input_size();
        for hb in h[..self.b].iter_mut() {
            for v in hb[..len].iter_mut() {
                *v = *v * self.scale;
            }
        }
        Ok(())
    }

    /// In-place variant used by the 2-D driver; accumulates into `V` when
    /// more than one pass would clobber live input.
    pub fn convolve_in_place(
        &mut self,
        fh: &mut [&mut [Complex<T>]],
        mult: RealMultiplier<T>,
    ) -> Result<(), PadConvError> {
        self.convolve_raw_in(fh, mult)?;
        let len = self.fft.input_size();
        for hb in fh[..self.b].iter_mut() {
            for v in hb[..len].iter_mut() {
                *v = *v * self.scale;
            }
        }
        Ok(())
    }

    pub(crate) fn convolve_raw_in(
        &mut self,
        fh: &mut [&mut [Complex<T>]],
        mult: RealMultiplier<T>,
    ) -> Result<(), PadConvError> {
        let residues = self.fft.residues();
        let d = self.fft.per_pass();
        let multi_pass = d < residues;
        if multi_pass && self.v.is_empty() {
            let zero = Complex::new(T::zero(), T::zero());
            for _ in 0..self.b {
                self.v.push(vec![zero; self.fft.input_size()]);
            }
        }
        let mut r = 0;
        while r < residues {
            for ai in 0..self.a {
                self.fft
                    .forward_pass(&fh[ai][..], &mut self.big[ai], r, &mut self.w)?;
            }
            self.multiply(mult);
            for bi in 0..self.b {
                if multi_pass {
                    let mut v = std::mem::take(&mut self.v[bi]);
                    self.fft.backward_pass(&self.big[bi], &mut v, r, &mut self.w)?;
                    self.v[bi] = v;
                } else {
                    self.fft
                        .backward_pass(&self.big[bi], &mut fh[bi][..], r, &mut self.w)?;
                }
            }
            r += d;
        }
        if multi_pass {
            let len = self.fft.input_size();
            for bi in 0..self.b {
                fh[bi][..len].copy_from_slice(&self.v[bi][..len]);
            }
        }
        Ok(())
    }

    fn multiply(&mut self, mult: RealMultiplier<T>) {
        let mut refs: Vec<&mut [T]> = self.big[..self.a]
            .iter_mut()
            .map(|v| v.as_mut_slice())
            .collect();
        mult(&mut refs, self.threads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::padfft::Options;
    use rand::Rng;

    fn random_signal(len: usize) -> Vec<Complex<f64>> {
        let mut rng = rand::rng();
        (0..len)
            .map(|_| Complex::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5))
            .collect()
    }

    /// Cyclic convolution of the zero-extended length-`n` sequences,
    /// truncated to `l` outputs.
    fn naive_convolution(f: &[Complex<f64>], g: &[Complex<f64>], n: usize, l: usize) -> Vec<Complex<f64>> {
        let mut out = vec![Complex::new(0.0, 0.0); n];
        for (i, a) in f.iter().enumerate() {
            for (j, b) in g.iter().enumerate() {
                out[(i + j) % n] += a * b;
            }
        }
        out.truncate(l);
        out
    }

    fn run_convolution(
        fft: &PadFft<f64>,
        f: &[Complex<f64>],
        g: &[Complex<f64>],
    ) -> Vec<Complex<f64>> {
        let mut conv = Convolution::new(fft, 2, 1, Options::default()).unwrap();
        let mut h = vec![Complex::new(0.0, 0.0); fft.input_size()];
        {
            let inputs: [&[Complex<f64>]; 2] = [f, g];
            let mut outputs: [&mut [Complex<f64>]; 1] = [&mut h];
            conv.convolve(&inputs, &mut outputs, multbinary).unwrap();
        }
        h
    }

    #[test]
    fn ones_convolve_to_triangle() {
        // L=3, M=6: [1,1,1] * [1,1,1] = [1,2,3,2,1] truncated to [1,2,3].
        let f = vec![Complex::new(1.0, 0.0); 3];
        let fft = PadFft::<f64>::with_split(3, 6, 1, 3, 2, 1, Options::default()).unwrap();
        let h = run_convolution(&fft, &f, &f);
        let want = [1.0, 2.0, 3.0];
        for (got, want) in h.iter().zip(want.iter()) {
            assert!((got.re - want).abs() < 1e-12 && got.im.abs() < 1e-12, "{got}");
        }
    }

    #[test]
    fn agrees_with_naive_cyclic_convolution() {
        for (l, m, q, d) in [
            (4, 8, 1, 1),  // explicit
            (5, 8, 2, 1),  // p=1
            (6, 4, 3, 1),  // p=2
            (6, 4, 3, 3),  // p=2, one pass
            (13, 4, 8, 2), // inner
        ] {
            let m_min = 2 * l - 1;
            assert!(m * q >= m_min, "bad test geometry");
            let fft = PadFft::<f64>::with_split(l, m_min, 1, m, q, d, Options::default()).unwrap();
            let f = random_signal(l);
            let g = random_signal(l);
            let h = run_convolution(&fft, &f, &g);
            let want = naive_convolution(&f, &g, fft.size(), l);
            for (i, (got, want)) in h.iter().zip(want.iter()).enumerate() {
                assert!(
                    (got - want).norm() < 1e-9,
                    "L={l} m={m} q={q} D={d} out {i}: {got} != {want}"
                );
            }
        }
    }

    #[test]
    fn two_loop_matches_single_loop() {
        // q=3 with D=2 triggers the two-loop path (D < Q <= 2D, A > B);
        // D=3 does the whole thing in one pass.
        let (l, m, q) = (6, 4, 3);
        let f = random_signal(l);
        let g = random_signal(l);
        let two = PadFft::<f64>::with_split(l, 11, 1, m, q, 2, Options::default()).unwrap();
        assert!(two.loop2(2, 1));
        let single = PadFft::<f64>::with_split(l, 11, 1, m, q, 3, Options::default()).unwrap();
        assert!(!single.loop2(2, 1));
        let h2 = run_convolution(&two, &f, &g);
        let h1 = run_convolution(&single, &f, &g);
        let mut err = 0.0;
        let mut norm = 0.0;
        for (x, y) in h2.iter().zip(h1.iter()) {
            err += (x - y).norm_sqr();
            norm += y.norm_sqr();
        }
        assert!((err / norm).sqrt() < 1e-14, "rel {}", (err / norm).sqrt());
    }

    #[test]
    fn in_place_with_auxiliary_buffer_matches_out_of_place() {
        // D=1 over Q=4 passes forces the V accumulation path in place.
        let (l, m, q, d) = (6, 4, 4, 1);
        let fft = PadFft::<f64>::with_split(l, 11, 1, m, q, d, Options::default()).unwrap();
        assert!(fft.work_size_v(2, 1) > 0);
        let f = random_signal(l);
        let g = random_signal(l);
        let want = run_convolution(&fft, &f, &g);
        let mut conv = Convolution::new(&fft, 2, 1, Options::default()).unwrap();
        let mut f0 = f.clone();
        let mut f1 = g.clone();
        {
            let mut bufs: [&mut [Complex<f64>]; 2] = [&mut f0, &mut f1];
            conv.convolve_in_place(&mut bufs, multbinary).unwrap();
        }
        for (got, want) in f0.iter().zip(want.iter()) {
            assert!((got - want).norm() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn in_place_two_loop_matches_out_of_place() {
        let (l, m, q, d) = (6, 4, 3, 2);
        let fft = PadFft::<f64>::with_split(l, 11, 1, m, q, d, Options::default()).unwrap();
        assert!(fft.loop2(2, 1));
        let f = random_signal(l);
        let g = random_signal(l);
        let want = run_convolution(&fft, &f, &g);
        let mut conv = Convolution::new(&fft, 2, 1, Options::default()).unwrap();
        let mut f0 = f.clone();
        let mut f1 = g.clone();
        {
            let mut bufs: [&mut [Complex<f64>]; 2] = [&mut f0, &mut f1];
            conv.convolve_in_place(&mut bufs, multbinary).unwrap();
        }
        for (got, want) in f0.iter().zip(want.iter()) {
            assert!((got - want).norm() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn batched_channels_convolve_independently() {
        let (l, c, m, q) = (5, 2, 4, 3);
        let fft = PadFft::<f64>::with_split(l, 9, c, m, q, 1, Options::default()).unwrap();
        let single = PadFft::<f64>::with_split(l, 9, 1, m, q, 1, Options::default()).unwrap();
        let ch: Vec<Vec<Complex<f64>>> = (0..2 * c).map(|_| random_signal(l)).collect();
        let mut f = vec![Complex::new(0.0, 0.0); c * l];
        let mut g = vec![Complex::new(0.0, 0.0); c * l];
        for s in 0..l {
            for ci in 0..c {
                f[c * s + ci] = ch[ci][s];
                g[c * s + ci] = ch[c + ci][s];
            }
        }
        let mut conv = Convolution::new(&fft, 2, 1, Options::default()).unwrap();
        let mut h = vec![Complex::new(0.0, 0.0); fft.input_size()];
        {
            let inputs: [&[Complex<f64>]; 2] = [&f, &g];
            let mut outputs: [&mut [Complex<f64>]; 1] = [&mut h];
            conv.convolve(&inputs, &mut outputs, multbinary).unwrap();
        }
        for ci in 0..c {
            let want = run_convolution(&single, &ch[ci], &ch[c + ci]);
            for s in 0..l {
                assert!(
                    (h[c * s + ci] - want[s]).norm() < 1e-9,
                    "channel {ci} out {s}"
                );
            }
        }
    }

    /// Cyclic convolution of the Hermitian extensions, read back on [0, h].
    fn naive_hermitian_convolution(
        f: &[Complex<f64>],
        g: &[Complex<f64>],
        half: usize,
        n: usize,
    ) -> Vec<Complex<f64>> {
        let extend = |x: &[Complex<f64>]| {
            let mut v = vec![Complex::new(0.0, 0.0); n];
            v[0] = x[0];
            for j in 1..=half {
                v[j] = x[j];
                v[n - j] = x[j].conj();
            }
            v
        };
        let fe = extend(f);
        let ge = extend(g);
        let mut out = vec![Complex::new(0.0, 0.0); n];
        for (i, a) in fe.iter().enumerate() {
            for (j, b) in ge.iter().enumerate() {
                out[(i + j) % n] += a * b;
            }
        }
        out.truncate(half + 1);
        out
    }

    #[test]
    fn hermitian_convolution_agrees_with_naive() {
        for (l, m, q, d) in [(7, 4, 4, 1), (7, 4, 4, 2), (11, 6, 4, 4), (7, 16, 1, 1)] {
            let m_min = 2 * l - 1;
            assert!(m * q >= m_min, "bad test geometry");
            let fft =
                PadFftHermitian::<f64>::with_split(l, m_min, 1, m, q, d, Options::default())
                    .unwrap();
            let half = l / 2;
            let mut rng = rand::rng();
            let mut make = || {
                let mut v = vec![Complex::new(0.0, 0.0); fft.input_size()];
                v[0] = Complex::new(rng.random::<f64>() - 0.5, 0.0);
                for s in 1..=half {
                    v[s] = Complex::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5);
                }
                v
            };
            let f = make();
            let g = make();
            let mut conv = ConvolutionHermitian::new(&fft, 2, 1, Options::default()).unwrap();
            let mut h = vec![Complex::new(0.0, 0.0); fft.input_size()];
            {
                let inputs: [&[Complex<f64>]; 2] = [&f, &g];
                let mut outputs: [&mut [Complex<f64>]; 1] = [&mut h];
                conv.convolve(&inputs, &mut outputs, realmultbinary).unwrap();
            }
            let want = naive_hermitian_convolution(&f, &g, half, fft.size());
            for s in 0..=half {
                assert!(
                    (h[s] - want[s]).norm() < 1e-9,
                    "L={l} m={m} q={q} D={d} coeff {s}: {} != {}",
                    h[s],
                    want[s]
                );
            }
        }
    }
}
