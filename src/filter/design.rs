//! FIR band-pass design matching MNE / `scipy.signal.firwin`.
//!
//! For a band-pass `[l_freq, h_freq]` at sampling rate `sfreq`:
//!   • lower transition  = min(max(0.25 * l_freq, 2.0), l_freq)
//!   • upper transition  = min(max(0.25 * h_freq, 2.0), nyq - h_freq)
//!   • filter length N   = ceil(3.3 / min(transitions) * sfreq), rounded to odd
//!   • response          = Σ ± lowpass(edge), one Hamming-windowed sinc per
//!                         gain step, each sized for its own transition
use std::f64::consts::PI;

use anyhow::{bail, Result};

/// Hamming main-lobe length factor (`_length_factors['hamming']`).
const HAMMING_LENGTH_FACTOR: f64 = 3.3;

/// MNE's automatic lower transition bandwidth.
///
/// Rule: `min(max(0.25 * l_freq, 2.0), l_freq)`
pub fn auto_l_trans_bandwidth(l_freq: f64) -> f64 {
    (0.25 * l_freq).max(2.0).min(l_freq)
}

/// MNE's automatic upper transition bandwidth.
///
/// Rule: `min(max(0.25 * h_freq, 2.0), sfreq / 2 - h_freq)`
pub fn auto_h_trans_bandwidth(h_freq: f64, sfreq: f64) -> f64 {
    (0.25 * h_freq).max(2.0).min(sfreq / 2.0 - h_freq)
}

/// Compute the number of FIR taps for a given transition bandwidth.
/// Returns an odd integer (required for zero-phase linear-phase FIR).
///
/// Formula: `ceil(3.3 / trans_bw * sfreq)` rounded up to odd.
pub fn auto_filter_length(trans_bw: f64, sfreq: f64) -> usize {
    let n_raw = (HAMMING_LENGTH_FACTOR / trans_bw * sfreq).ceil() as usize;
    if n_raw % 2 == 0 { n_raw + 1 } else { n_raw }
}

/// A validated band-pass specification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPass {
    pub l_freq: f64,
    pub h_freq: f64,
    pub l_trans: f64,
    pub h_trans: f64,
    pub sfreq: f64,
}

impl BandPass {
    /// Band-pass with MNE's automatic transition bandwidths.
    ///
    /// Fails unless `0 < l_freq < h_freq < sfreq / 2`.
    pub fn new(l_freq: f64, h_freq: f64, sfreq: f64) -> Result<Self> {
        let nyq = sfreq / 2.0;
        if !(sfreq > 0.0 && sfreq.is_finite()) {
            bail!("invalid sampling rate {sfreq}");
        }
        if !(l_freq > 0.0) {
            bail!("l_freq must be positive, got {l_freq}");
        }
        if !(h_freq < nyq) {
            bail!("h_freq ({h_freq}) must be less than the Nyquist frequency ({nyq})");
        }
        if !(l_freq < h_freq) {
            bail!("l_freq ({l_freq}) must be less than h_freq ({h_freq})");
        }
        Ok(Self {
            l_freq,
            h_freq,
            l_trans: auto_l_trans_bandwidth(l_freq),
            h_trans: auto_h_trans_bandwidth(h_freq, sfreq),
            sfreq,
        })
    }

    /// Total number of taps.
    pub fn filter_length(&self) -> usize {
        auto_filter_length(self.l_trans.min(self.h_trans), self.sfreq)
    }

    /// Lower stop-band edge (`l_freq - l_trans`, may be 0).
    pub fn l_stop(&self) -> f64 {
        self.l_freq - self.l_trans
    }

    /// Upper stop-band edge (`h_freq + h_trans`, at most Nyquist).
    pub fn h_stop(&self) -> f64 {
        self.h_freq + self.h_trans
    }

    /// Impulse response `h[N]`.
    ///
    /// Matches `mne.filter.create_filter(data, sfreq, l_freq, h_freq,
    ///   filter_length='auto', fir_window='hamming', fir_design='firwin',
    ///   phase='zero')`.
    pub fn design(&self) -> Result<Vec<f64>> {
        let nyq = self.sfreq / 2.0;
        let freq = [0.0, self.l_stop(), self.l_freq, self.h_freq, self.h_stop(), nyq];
        let gain = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        firwin_design(self.filter_length(), &freq, &gain, self.sfreq)
    }
}

/// Design a zero-phase band-pass FIR filter. See [`BandPass::design`].
pub fn design_bandpass(l_freq: f64, h_freq: f64, sfreq: f64) -> Result<Vec<f64>> {
    BandPass::new(l_freq, h_freq, sfreq)?.design()
}

/// Piecewise-constant 0/1 response from a sum of lowpass filters.
///
/// Walks the breakpoints from Nyquist down.  Each gain step contributes a
/// lowpass at the step's centre, sized for the step's width and centred in
/// the `n`-tap output; a step down in gain (going down in frequency) is
/// subtracted, a step up is added.
pub fn firwin_design(n: usize, freq: &[f64], gain: &[f64], sfreq: f64) -> Result<Vec<f64>> {
    if n % 2 == 0 {
        bail!("firwin design needs an odd number of taps, got {n}");
    }
    if freq.len() != gain.len() || freq.len() < 2 {
        bail!("freq and gain must have the same length (≥ 2)");
    }
    let mut h = vec![0.0; n];
    let (mut prev_freq, mut prev_gain) = (freq[freq.len() - 1], gain[gain.len() - 1]);
    if prev_gain == 1.0 {
        h[n / 2] = 1.0;
    }
    for (&this_freq, &this_gain) in freq.iter().zip(gain).rev().skip(1) {
        if this_gain != prev_gain {
            let width = prev_freq - this_freq;
            let mut this_n = (HAMMING_LENGTH_FACTOR * sfreq / width).round() as usize;
            this_n += 1 - this_n % 2;
            if this_n > n {
                bail!(
                    "transition at {this_freq}-{prev_freq} Hz needs {this_n} taps, \
                     more than the filter length {n}"
                );
            }
            let lp = firwin(this_n, (prev_freq + this_freq) / 2.0, sfreq);
            let offset = (n - this_n) / 2;
            let sign = if this_gain == 0.0 { -1.0 } else { 1.0 };
            for (dst, v) in h[offset..offset + this_n].iter_mut().zip(&lp) {
                *dst += sign * v;
            }
        }
        prev_freq = this_freq;
        prev_gain = this_gain;
    }
    Ok(h)
}

/// Design a lowpass FIR filter using a Hamming-windowed sinc.
///
/// `cutoff_hz` is the -6 dB point; taps are scaled to unit DC gain.
pub fn firwin(n: usize, cutoff_hz: f64, sfreq: f64) -> Vec<f64> {
    debug_assert!(n % 2 == 1, "firwin requires odd N for linear-phase filter");
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz / (sfreq / 2.0); // normalised [0, 1]

    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            // f(x) = sin(π·fc·x) / (π·x);  lim_{x→0} f(x) = fc  (L'Hôpital)
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    h
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}
