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
//! Auto-tuning: walk the `(m, q, D)` space, time every viable split through a
//! pluggable application, keep the fastest.

use crate::err::PadConvError;
use crate::padfft::{Options, PadFft};
use log::{debug, trace};
use num_complex::Complex;
use num_integer::div_ceil;
use num_traits::{AsPrimitive, Float};
use rustfft::FftNum;
use std::time::Instant;

/// Smallest integer >= `m` whose prime factors are all in {2, 3, 5, 7}.
pub fn nextfftsize(m: usize) -> usize {
    fn smooth(mut n: usize) -> bool {
        for f in [2usize, 3, 5, 7] {
            while n % f == 0 {
                n /= f;
            }
        }
        n == 1
    }
    let mut i = m.max(1);
    while !smooth(i) {
        i += 1;
    }
    i
}

/// Running mean / standard deviation, cleared whenever the sample count is
/// re-based.
pub(crate) struct Stats {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl Stats {
    pub fn new() -> Stats {
        Stats {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn add(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn stdev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let var = (self.sum_sq - self.sum * self.sum / self.count as f64) / (self.count - 1) as f64;
        var.max(0.0).sqrt()
    }
}

/// Minimum timing window; samples shorter than this double the iteration
/// count instead of being trusted.
const MIN_WINDOW: f64 = 1e-4;
const EPS: f64 = 0.1;

/// Mean seconds per sweep, measured adaptively: `timer(k)` runs `k` sweeps
/// and returns the elapsed seconds.
pub(crate) fn meantime(mut timer: impl FnMut(usize) -> f64) -> f64 {
    let mut s = Stats::new();
    let mut k = 1usize;
    loop {
        let t = timer(k);
        if !t.is_finite() {
            return f64::INFINITY;
        }
        s.add(t / k as f64);
        if (k as f64) * s.mean() < MIN_WINDOW {
            if k >= 1 << 20 {
                return s.mean().max(f64::MIN_POSITIVE);
            }
            k *= 2;
            s.clear();
            continue;
        }
        if s.count() >= 4 && s.stdev() < EPS * s.mean() {
            return s.mean();
        }
        if s.count() >= 64 {
            return s.mean();
        }
    }
}

/// A timing workload driven against candidate transforms during planning.
pub trait Application<T, F> {
    fn init(&mut self, fft: &F) -> Result<(), PadConvError>;
    /// Seconds elapsed for `k` sweeps.
    fn time(&mut self, fft: &F, k: usize) -> f64;
    fn clear(&mut self);
}

/// The winning split.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Opt {
    pub m: usize,
    pub q: usize,
    pub d: usize,
}

struct Best {
    t: f64,
    n: usize,
    opt: Opt,
}

impl Opt {
    /// Walk candidate splits for padding `l` values to at least `m_min` and
    /// keep the fastest according to `timer`, which may reject a candidate by
    /// returning `None`. Ties go to the smaller padded size, then smaller D.
    pub fn scan(
        l: usize,
        m_min: usize,
        c: usize,
        explicit: bool,
        fixed: bool,
        options: &Options,
        mut timer: impl FnMut(usize, usize, usize) -> Option<f64>,
    ) -> Result<Opt, PadConvError> {
        if l == 0 || c == 0 {
            return Err(PadConvError::ZeroSizedTransform);
        }
        if m_min < l {
            return Err(PadConvError::PaddedShorterThanData(m_min, l));
        }
        if explicit {
            debug!("explicit padding enforced: m={m_min} q=1");
            return Ok(Opt {
                m: m_min,
                q: 1,
                d: 1,
            });
        }
        let mut best: Option<Best> = None;
        if options.m_option > 0 {
            Self::check(l, m_min, c, options.m_option, options, &mut best, &mut timer);
        } else {
            let mut stop = if fixed { m_min } else { l.min(m_min) };
            for _ in 0..options.surplus_fft_sizes {
                stop = nextfftsize(stop + 1);
            }
            let mut m = 1;
            loop {
                m = nextfftsize(m + 1);
                if m > stop {
                    break;
                }
                Self::check(l, m_min, c, m, options, &mut best, &mut timer);
            }
        }
        let best = best.ok_or_else(|| {
            PadConvError::Unsupported(format!("no viable split for L={l}, M={m_min}, C={c}"))
        })?;
        let p = div_ceil(l, best.opt.m);
        debug!(
            "optimal split: m={} p={p} q={} D={} padded to {} ({:.3e} s)",
            best.opt.m, best.opt.q, best.opt.d, best.n, best.t
        );
        Ok(best.opt)
    }

    #[allow(clippy::too_many_arguments)]
    fn check(
        l: usize,
        m_min: usize,
        c: usize,
        m: usize,
        options: &Options,
        best: &mut Option<Best>,
        timer: &mut impl FnMut(usize, usize, usize) -> Option<f64>,
    ) {
        let p = div_ceil(l, m);
        let q0 = div_ceil(m_min, m);
        let q = if p > 2 { p * div_ceil(q0, p) } else { q0 };
        let residues = if q == 1 {
            1
        } else if p <= 2 {
            q
        } else {
            q / p
        };
        let mut candidates: Vec<usize> = if options.d_option > 0 {
            vec![options.d_option.min(residues)]
        } else if c > 1 || q == 1 {
            vec![1]
        } else {
            let mut v = Vec::new();
            let mut d = 1;
            while d < residues {
                v.push(d);
                d *= 2;
            }
            v.push(residues);
            v
        };
        candidates.dedup();
        for d in candidates {
            let Some(t) = timer(m, q, d) else { continue };
            trace!("candidate m={m} p={p} q={q} D={d}: {t:.3e} s");
            let n = m * q;
            let replace = match best {
                None => true,
                Some(b) => {
                    t < b.t || (t == b.t && (n < b.n || (n == b.n && d < b.opt.d)))
                }
            };
            if replace {
                *best = Some(Best {
                    t,
                    n,
                    opt: Opt { m, q, d },
                });
            }
        }
    }
}

/// The stock timing workload: `A` forwards and `B` backwards per sweep over
/// every residue pass, on zero-filled buffers it owns.
pub struct ForwardBackward<T> {
    a: usize,
    b: usize,
    f: Vec<Vec<Complex<T>>>,
    big: Vec<Vec<Complex<T>>>,
    h: Vec<Vec<Complex<T>>>,
    w: Vec<Complex<T>>,
}

impl<T: FftNum + Float> ForwardBackward<T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(a: usize, b: usize) -> ForwardBackward<T> {
        ForwardBackward {
            a,
            b,
            f: Vec::new(),
            big: Vec::new(),
            h: Vec::new(),
            w: Vec::new(),
        }
    }
}

impl<T: FftNum + Float> Default for ForwardBackward<T>
where
    f64: AsPrimitive<T>,
{
    fn default() -> Self {
        ForwardBackward::new(2, 1)
    }
}

impl<T: FftNum + Float> Application<T, PadFft<T>> for ForwardBackward<T>
where
    f64: AsPrimitive<T>,
{
    fn init(&mut self, fft: &PadFft<T>) -> Result<(), PadConvError> {
        self.clear();
        let zero = Complex::new(T::zero(), T::zero());
        let e = self.a.max(self.b);
        for _ in 0..self.a {
            self.f.push(vec![zero; fft.input_size()]);
        }
        for _ in 0..e {
            self.big.push(vec![zero; fft.work_size()]);
        }
        for _ in 0..self.b {
            self.h.push(vec![zero; fft.input_size()]);
        }
        self.w = vec![zero; fft.work_size_w()];
        if !self.w.is_empty() {
            fft.pad(&mut self.w);
        }
        Ok(())
    }

    fn time(&mut self, fft: &PadFft<T>, k: usize) -> f64 {
        let g = *fft.geometry();
        let start = Instant::now();
        for _ in 0..k {
            let mut r = 0;
            while r < g.residues {
                for ai in 0..self.a {
                    let w = if self.w.is_empty() {
                        None
                    } else {
                        Some(&mut self.w[..])
                    };
                    if fft
                        .forward_pass(&self.f[ai], &mut self.big[ai], r, w)
                        .is_err()
                    {
                        return f64::INFINITY;
                    }
                }
                for bi in 0..self.b {
                    let w = if self.w.is_empty() {
                        None
                    } else {
                        Some(&mut self.w[..])
                    };
                    if fft
                        .backward_pass(&mut self.big[bi], &mut self.h[bi], r, w)
                        .is_err()
                    {
                        return f64::INFINITY;
                    }
                }
                r += g.d;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nextfftsize_walks_seven_smooth_numbers() {
        assert_eq!(nextfftsize(1), 1);
        assert_eq!(nextfftsize(11), 12);
        assert_eq!(nextfftsize(13), 14);
        assert_eq!(nextfftsize(17), 18);
        assert_eq!(nextfftsize(211), 216);
        assert_eq!(nextfftsize(250), 250); // 2 * 5^3
    }

    #[test]
    fn stats_mean_and_stdev() {
        let mut s = Stats::new();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            s.add(x);
        }
        assert!((s.mean() - 5.0).abs() < 1e-12);
        assert!((s.stdev() - 2.138089935299395).abs() < 1e-9);
    }

    #[test]
    fn scan_prefers_small_hybrid_split() {
        // L=5, M=8 with a cost model proportional to the padded size: the
        // hybrid m=4, q=2 split wins over explicit m=8, q=1 on the N tie
        // because it is found first and never beaten.
        let opt = Opt::scan(
            5,
            8,
            1,
            false,
            false,
            &Options::default(),
            |m, q, _d| Some((m * q) as f64),
        )
        .unwrap();
        assert_eq!((opt.m, opt.q), (4, 2));
        assert_eq!(opt.d, 1);
    }

    #[test]
    fn scan_explicit_pins_m() {
        let opt = Opt::scan(5, 8, 1, true, true, &Options::default(), |_, _, _| {
            panic!("explicit scan must not time candidates")
        })
        .unwrap();
        assert_eq!((opt.m, opt.q, opt.d), (8, 1, 1));
    }

    #[test]
    fn scan_honours_forced_m_and_d() {
        let options = Options {
            m_option: 4,
            d_option: 2,
            ..Options::default()
        };
        let opt = Opt::scan(5, 8, 1, false, false, &options, |m, q, d| {
            assert_eq!(m, 4);
            assert_eq!(d, 2);
            Some((m * q) as f64)
        })
        .unwrap();
        assert_eq!((opt.m, opt.q, opt.d), (4, 2, 2));
    }

    #[test]
    fn scan_forces_single_residue_for_batches() {
        Opt::scan(6, 12, 3, false, false, &Options::default(), |_m, _q, d| {
            assert_eq!(d, 1);
            Some(1.0)
        })
        .unwrap();
    }

    #[test]
    fn planned_transform_roundtrips() {
        let mut fb = ForwardBackward::<f64>::new(2, 1);
        let fft = PadFft::<f64>::new(5, 8, 1, &mut fb, false, false, Options::default()).unwrap();
        let g = *fft.geometry();
        assert!(g.size() >= 8);
        let f: Vec<Complex<f64>> = (0..5).map(|j| Complex::new(j as f64, 1.0)).collect();
        let mut big = vec![Complex::new(0.0, 0.0); fft.spectrum_size()];
        let mut back = vec![Complex::new(0.0, 0.0); fft.input_size()];
        let mut w = vec![Complex::new(0.0, 0.0); fft.work_size_w()];
        let wopt = if w.is_empty() { None } else { Some(&mut w[..]) };
        fft.forward(&f, &mut big, wopt).unwrap();
        let wopt = if w.is_empty() { None } else { Some(&mut w[..]) };
        fft.backward(&mut big, &mut back, wopt).unwrap();
        let n = fft.size() as f64;
        for (got, want) in back.iter().zip(f.iter()) {
            assert!((got / n - want).norm() < 1e-9, "{got} != {want}");
        }
    }
}
