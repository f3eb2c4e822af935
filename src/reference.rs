//! Average reference: subtract the mean across EEG channels at each time point.
//!
//! Matches `raw.set_eeg_reference('average', projection=False)`: the mean is
//! taken over the **good** EEG channels and removed from **every** EEG channel
//! (bad ones included).  Non-EEG channels are untouched and no reference
//! channel is added.
//!
//! `data`: [C, T]  →  `data[c, t] -= mean(data[good, t])` for `c` in `eeg`
use ndarray::{Array2, Axis};

use crate::raw::RawRecording;

/// Re-reference the rows `apply_to` of `data` to the mean of the rows `ref_from`.
///
/// Does nothing when `ref_from` is empty.
pub fn average_reference_inplace(data: &mut Array2<f64>, ref_from: &[usize], apply_to: &[usize]) {
    if ref_from.is_empty() {
        return;
    }
    let Some(means) = data.select(Axis(0), ref_from).mean_axis(Axis(0)) else {
        return;
    };
    for &c in apply_to {
        let mut row = data.row_mut(c);
        row -= &means;
    }
}

/// Average-reference the EEG channels of a recording in place.
pub fn set_average_reference(raw: &mut RawRecording) {
    let good = raw.good_eeg_picks();
    let eeg = raw.eeg_picks();
    average_reference_inplace(&mut raw.data, &good, &eeg);
}
