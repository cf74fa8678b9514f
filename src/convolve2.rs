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
//! 2-D dealiased convolutions: an outer x-pass whose batch dimension carries
//! whole y-lines, wrapping nested 1-D y-convolutions over each transformed
//! x-site.

use crate::centered::PadFftCentered;
use crate::convolve::{Convolution, ConvolutionHermitian, Multiplier, RealMultiplier};
use crate::err::PadConvError;
use crate::padfft::PadFft;
use num_complex::Complex;
use num_traits::{AsPrimitive, Float};
use rustfft::FftNum;

/// 2-D complex convolution. Borrows the x-transform and the inner
/// y-convolution; owns only the x work buffers.
pub struct Convolution2<'x, 'y, 'f, T> {
    fftx: &'x PadFft<T>,
    convy: &'y mut Convolution<'f, T>,
    big: Vec<Vec<Complex<T>>>,
    scale: T,
}

impl<'x, 'y, 'f, T: FftNum + Float> Convolution2<'x, 'y, 'f, T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(
        fftx: &'x PadFft<T>,
        convy: &'y mut Convolution<'f, T>,
    ) -> Result<Convolution2<'x, 'y, 'f, T>, PadConvError> {
        let ly = convy.fft().input_size();
        if fftx.geometry().c != ly {
            return Err(PadConvError::Unsupported(format!(
                "x transform must batch {ly} values per site, got C={}",
                fftx.geometry().c
            )));
        }
        let zero = Complex::new(T::zero(), T::zero());
        let slots = convy.inputs().max(convy.outputs());
        let mut big = Vec::with_capacity(slots);
        for _ in 0..slots {
            big.push(vec![zero; fftx.work_size()]);
        }
        let scale = (1.0f64 / (fftx.size() * convy.fft().size()) as f64).as_();
        Ok(Convolution2 {
            fftx,
            convy,
            big,
            scale,
        })
    }

    /// Convolve `A` inputs of `Lx * Ly` values (x-major) into `B` outputs.
    pub fn convolve(
        &mut self,
        f: &[&[Complex<T>]],
        h: &mut [&mut [Complex<T>]],
        mult: Multiplier<T>,
    ) -> Result<(), PadConvError> {
        let gx = *self.fftx.geometry();
        let ly = gx.c;
        let sx = self.fftx.residue_block() / ly;
        let a = self.convy.inputs();
        let b = self.convy.outputs();
        let mut rx = 0;
        while rx < gx.residues {
            for ai in 0..a {
                self.fftx.forward_pass(f[ai], &mut self.big[ai], rx, None)?;
            }
            for i in 0..sx {
                let mut slabs: Vec<&mut [Complex<T>]> = self.big[..a]
                    .iter_mut()
                    .map(|v| &mut v[i * ly..(i + 1) * ly])
                    .collect();
                self.convy.convolve_raw_in(&mut slabs, mult)?;
            }
            for bi in 0..b {
                self.fftx.backward_pass(&mut self.big[bi], &mut h[bi][..], rx, None)?;
            }
            rx += gx.d;
        }
        let len = self.fftx.input_size();
        for hb in h[..b].iter_mut() {
            for v in hb[..len].iter_mut() {
                *v = *v * self.scale;
            }
        }
        Ok(())
    }
}

/// 2-D convolution of data that is centered along x and Hermitian along y:
/// a complex centered x-pass around nested Hermitian y-convolutions.
pub struct ConvolutionHermitian2<'x, 'y, 'f, T> {
    fftx: &'x PadFftCentered<T>,
    convy: &'y mut ConvolutionHermitian<'f, T>,
    big: Vec<Vec<Complex<T>>>,
    scale: T,
}

impl<'x, 'y, 'f, T: FftNum + Float> ConvolutionHermitian2<'x, 'y, 'f, T>
where
    f64: AsPrimitive<T>,
{
    pub fn new(
        fftx: &'x PadFftCentered<T>,
        convy: &'y mut ConvolutionHermitian<'f, T>,
    ) -> Result<ConvolutionHermitian2<'x, 'y, 'f, T>, PadConvError> {
        let ly = convy.fft().input_size();
        if fftx.geometry().c != ly {
            return Err(PadConvError::Unsupported(format!(
                "x transform must batch {ly} coefficients per site, got C={}",
                fftx.geometry().c
            )));
        }
        let zero = Complex::new(T::zero(), T::zero());
        let slots = convy.inputs().max(convy.outputs());
        let mut big = Vec::with_capacity(slots);
        for _ in 0..slots {
            big.push(vec![zero; fftx.work_size()]);
        }
        let scale = (1.0f64 / (fftx.size() * convy.fft().size()) as f64).as_();
        Ok(ConvolutionHermitian2 {
            fftx,
            convy,
            big,
            scale,
        })
    }

    pub fn convolve(
        &mut self,
        f: &[&[Complex<T>]],
        h: &mut [&mut [Complex<T>]],
        mult: RealMultiplier<T>,
    ) -> Result<(), PadConvError> {
        let gx = *self.fftx.geometry();
        let ly = gx.c;
        let sx = self.fftx.residue_block() / ly;
        let a = self.convy.inputs();
        let b = self.convy.outputs();
        let mut rx = 0;
        while rx < gx.residues {
            for ai in 0..a {
                self.fftx.forward_pass(f[ai], &mut self.big[ai], rx, None)?;
            }
            for i in 0..sx {
                let mut slabs: Vec<&mut [Complex<T>]> = self.big[..a]
                    .iter_mut()
                    .map(|v| &mut v[i * ly..(i + 1) * ly])
                    .collect();
                self.convy.convolve_raw_in(&mut slabs, mult)?;
            }
            for bi in 0..b {
                self.fftx.backward_pass(&mut self.big[bi], &mut h[bi][..], rx, None)?;
            }
            rx += gx.d;
        }
        let len = self.fftx.input_size();
        for hb in h[..b].iter_mut() {
            for v in hb[..len].iter_mut() {
                *v = *v * self.scale;
            }
        }
        Ok(())
    }
}
