//! FFT-based resampler matching MNE's `resample(..., method='fft')`.
//!
//! Algorithm (from `mne/cuda.py _fft_resample`):
//!   1. Pad with reflect-limited samples on each side (auto npad: next power of 2).
//!   2. rfft(padded)  →  complex half-spectrum.
//!   3. If downsampling: double the Nyquist bin (use_len = new_len).
//!      If upsampling:   halve  the Nyquist bin (use_len = old_len).
//!   4. Scale all bins by `new_len_padded / old_len_padded`.
//!   5. irfft(spectrum, n=new_len_padded): zero-padding or truncation of
//!      the spectrum.
//!   6. Strip the resampled padding edges.
use std::sync::Arc;

use anyhow::{bail, Result};
use ndarray::{Array2, Array3, ArrayView1, Axis};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Compute the auto npad as MNE does: pad to the next power of 2.
///
/// ```text
/// min_add = min(n // 8, 100) * 2
/// total   = 2^ceil(log2(n + min_add)) - n
/// npads   = [total // 2, total - total // 2]
/// ```
pub fn auto_npad(n: usize) -> (usize, usize) {
    let min_add = (n / 8).min(100) * 2;
    let sum = n + min_add;
    let next_pow2 = 1usize << ((sum as f64).log2().ceil() as u32);
    let total = next_pow2 - n;
    (total / 2, total - total / 2)
}

/// Output length for `n` samples: `round(n * dst / src)`.
pub fn final_length(n: usize, src_sfreq: f64, dst_sfreq: f64) -> usize {
    (n as f64 * dst_sfreq / src_sfreq).round() as usize
}

/// Plans and padding for resampling signals of one fixed length.
///
/// Every epoch of a collection has the same length, so the FFT plans are
/// built once and reused across epochs and channels.
pub struct Resampler {
    ratio: f64,
    n_in: usize,
    pad_l: usize,
    pad_r: usize,
    new_len_padded: usize,
    final_len: usize,
    fwd: Arc<dyn Fft<f64>>,
    inv: Arc<dyn Fft<f64>>,
}

impl Resampler {
    pub fn new(n_in: usize, src_sfreq: f64, dst_sfreq: f64) -> Result<Self> {
        if !(src_sfreq > 0.0 && dst_sfreq > 0.0) {
            bail!("sampling rates must be positive (got {src_sfreq} → {dst_sfreq})");
        }
        if n_in == 0 {
            bail!("cannot resample an empty signal");
        }
        let ratio = dst_sfreq / src_sfreq;
        let (npad_l, npad_r) = auto_npad(n_in);
        // Reflection cannot reach further than the signal itself.
        let pad_l = npad_l.min(n_in - 1);
        let pad_r = npad_r.min(n_in - 1);
        let old_len = n_in + pad_l + pad_r;
        let new_len_padded = (ratio * old_len as f64).round() as usize;
        if new_len_padded == 0 {
            bail!("resampling {n_in} samples by {ratio} leaves nothing");
        }
        let mut planner: FftPlanner<f64> = FftPlanner::new();
        Ok(Self {
            ratio,
            n_in,
            pad_l,
            pad_r,
            new_len_padded,
            final_len: final_length(n_in, src_sfreq, dst_sfreq),
            fwd: planner.plan_fft_forward(old_len),
            inv: planner.plan_fft_inverse(new_len_padded),
        })
    }

    pub fn output_len(&self) -> usize {
        self.final_len
    }

    /// Resample one signal of the planned length.
    pub fn process(&self, x: ArrayView1<'_, f64>) -> Result<Vec<f64>> {
        let n_in = x.len();
        if n_in != self.n_in {
            bail!("resampler planned for {} samples, got {n_in}", self.n_in);
        }
        let old_len = n_in + self.pad_l + self.pad_r;
        let new_len = self.new_len_padded;

        // --- 1. Reflect-limited padding (matches MNE's _smart_pad) ----------
        let mut buf: Vec<Complex<f64>> = Vec::with_capacity(old_len);
        for i in (1..=self.pad_l).rev() {
            buf.push(Complex { re: 2.0 * x[0] - x[i], im: 0.0 });
        }
        buf.extend(x.iter().map(|&v| Complex { re: v, im: 0.0 }));
        let last = x[n_in - 1];
        for i in 1..=self.pad_r {
            buf.push(Complex { re: 2.0 * last - x[n_in - 1 - i], im: 0.0 });
        }

        // --- 2. rfft of padded signal (first half of a full FFT) -------------
        self.fwd.process(&mut buf);
        let rfft_len = old_len / 2 + 1;
        buf.truncate(rfft_len);

        // --- 3. Nyquist bin --------------------------------------------------
        let shorter = new_len < old_len;
        let use_len = if shorter { new_len } else { old_len };
        if use_len % 2 == 0 {
            let nyq = use_len / 2;
            if nyq < buf.len() {
                buf[nyq] *= if shorter { 2.0 } else { 0.5 };
            }
        }

        // --- 4. Scale ----------------------------------------------------------
        let scale = new_len as f64 / old_len as f64;

        // --- 5. irfft(x_fft, n=new_len) ----------------------------------------
        let new_rfft_len = new_len / 2 + 1;
        let mut spectrum = vec![Complex::<f64>::default(); new_len];
        let n_copy = buf.len().min(new_rfft_len);
        for (dst, src) in spectrum[..n_copy].iter_mut().zip(&buf) {
            *dst = *src * scale;
        }
        // irfft ignores the imaginary part of the DC and (even-length) Nyquist bins.
        spectrum[0].im = 0.0;
        if new_len % 2 == 0 && new_len / 2 < n_copy {
            spectrum[new_len / 2].im = 0.0;
        }
        // Hermitian completion.
        for i in 1..new_rfft_len {
            let idx = new_len - i;
            if idx >= new_rfft_len {
                spectrum[idx] = spectrum[i].conj();
            }
        }
        self.inv.process(&mut spectrum);
        let inv_scale = 1.0 / new_len as f64;

        // --- 6. Strip padding ----------------------------------------------------
        let to_remove_l = (self.ratio * self.pad_l as f64).round() as usize;
        let mut out: Vec<f64> = spectrum
            .iter()
            .skip(to_remove_l)
            .take(self.final_len)
            .map(|c| c.re * inv_scale)
            .collect();
        out.resize(self.final_len, 0.0);
        Ok(out)
    }
}

/// Resample `data` ([C, T]) from `src_sfreq` to `dst_sfreq`.
pub fn resample(data: &Array2<f64>, src_sfreq: f64, dst_sfreq: f64) -> Result<Array2<f64>> {
    if (src_sfreq - dst_sfreq).abs() < 1e-9 {
        return Ok(data.clone());
    }
    let r = Resampler::new(data.ncols(), src_sfreq, dst_sfreq)?;
    let mut out = Array2::<f64>::zeros((data.nrows(), r.output_len()));
    for (src, mut dst) in data.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
        dst.assign(&ArrayView1::from(&r.process(src)?));
    }
    Ok(out)
}

/// Resample every epoch of `data` ([E, C, T]) along time.
pub fn resample_epochs(data: &Array3<f64>, src_sfreq: f64, dst_sfreq: f64) -> Result<Array3<f64>> {
    if (src_sfreq - dst_sfreq).abs() < 1e-9 {
        return Ok(data.clone());
    }
    let (n_e, n_c, n_t) = data.dim();
    let r = Resampler::new(n_t, src_sfreq, dst_sfreq)?;
    let mut out = Array3::<f64>::zeros((n_e, n_c, r.output_len()));
    for e in 0..n_e {
        for c in 0..n_c {
            let y = r.process(data.slice(ndarray::s![e, c, ..]))?;
            out.slice_mut(ndarray::s![e, c, ..]).assign(&ArrayView1::from(&y));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_noop_passthrough() {
        let data = Array2::from_shape_fn((2, 512), |(_, t)| t as f64 / 512.0);
        let out = resample(&data, 256.0, 256.0).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn resample_half_rate_length() {
        let data = Array2::zeros((1, 1024));
        let out = resample(&data, 512.0, 256.0).unwrap();
        assert_eq!(out.ncols(), 512);
    }

    #[test]
    fn resample_preserves_dc() {
        let data = Array2::from_elem((1, 1024), 3.14);
        let out = resample(&data, 512.0, 256.0).unwrap();
        for &v in out.iter() {
            approx::assert_abs_diff_eq!(v, 3.14, epsilon = 1e-9);
        }
    }

    #[test]
    fn slow_sine_survives_downsampling() {
        // 5 Hz at 1000 Hz → 250 Hz.
        let x = Array2::from_shape_fn((1, 701), |(_, t)| {
            (2.0 * std::f64::consts::PI * 5.0 * t as f64 / 1000.0).sin()
        });
        let y = resample(&x, 1000.0, 250.0).unwrap();
        assert_eq!(y.ncols(), 175);
        for k in 20..155 {
            let expect = (2.0 * std::f64::consts::PI * 5.0 * k as f64 / 250.0).sin();
            approx::assert_abs_diff_eq!(y[[0, k]], expect, epsilon = 1e-2);
        }
    }

    #[test]
    fn epochs_keep_shape_except_time() {
        let data = Array3::from_shape_fn((3, 2, 351), |(e, c, _)| (e + c) as f64);
        let out = resample_epochs(&data, 500.0, 250.0).unwrap();
        assert_eq!(out.dim(), (3, 2, 176));
        approx::assert_abs_diff_eq!(out[[2, 1, 80]], 3.0, epsilon = 1e-9);
    }

    #[test]
    fn final_length_rounds() {
        assert_eq!(final_length(351, 500.0, 250.0), 176);
        assert_eq!(final_length(701, 1000.0, 250.0), 175);
        assert_eq!(final_length(176, 250.0, 250.0), 176);
    }

    #[test]
    fn auto_npad_correct() {
        // 512 Hz, 30s = 15360 samples → npads = [512, 512]
        assert_eq!(auto_npad(15360), (512, 512));
        // 1024 Hz, 30s = 30720 → npads = [1024, 1024]
        assert_eq!(auto_npad(30720), (1024, 1024));
    }
}
