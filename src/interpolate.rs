//! Spherical-spline interpolation of bad EEG channels.
//!
//! Follows Perrin et al. (1989) as implemented by MNE's
//! `_make_interpolation_matrix`:
//!
//! ```text
//! g(x)  = Σ_{n=1..7} (2n+1) / (n⁴ (n+1)⁴ 4π) · Pₙ(x)        x = cos angle
//! C     = ┌ G_from + αI   1 ┐        α = 1e-5
//!         └ 1ᵀ             0 ┘
//! W     = [G_to_from  1] · pinv(C)[:, :n_from]
//! bad   = W · good
//! ```
//!
//! Positions are projected onto the unit sphere around an origin fitted to
//! the EEG electrode positions.
use anyhow::{bail, Context, Result};
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array2, Axis};

use crate::raw::{ChannelKind, RawRecording};

const N_LEGENDRE_TERMS: usize = 7;
const STIFFNESS: i32 = 4;
const ALPHA: f64 = 1e-5;

/// Spline kernel `g(cos θ)`.
pub fn calc_g(cosang: f64) -> f64 {
    let x = cosang.clamp(-1.0, 1.0);
    let (mut p_prev, mut p) = (1.0, x); // P₀, P₁
    let mut g = 0.0;
    for n in 1..=N_LEGENDRE_TERMS {
        let nf = n as f64;
        let factor = (2.0 * nf + 1.0)
            / (nf.powi(STIFFNESS) * (nf + 1.0).powi(STIFFNESS) * 4.0 * std::f64::consts::PI);
        g += factor * p;
        let p_next = ((2.0 * nf + 1.0) * x * p - nf * p_prev) / (nf + 1.0);
        p_prev = p;
        p = p_next;
    }
    g
}

/// Least-squares sphere fit; returns `(centre, radius)`.
///
/// Solves `x² + y² + z² = 2a·x + 2b·y + 2c·z + d` for `(a, b, c, d)`.
pub fn fit_sphere(points: &[[f64; 3]]) -> Result<([f64; 3], f64)> {
    if points.len() < 4 {
        bail!("need at least 4 points to fit a sphere, got {}", points.len());
    }
    let a = DMatrix::from_fn(points.len(), 4, |i, j| match j {
        3 => 1.0,
        _ => 2.0 * points[i][j],
    });
    let b = DVector::from_fn(points.len(), |i, _| {
        points[i].iter().map(|v| v * v).sum::<f64>()
    });
    let sol = a
        .svd(true, true)
        .solve(&b, 1e-12)
        .map_err(|e| anyhow::anyhow!("sphere fit failed: {e}"))?;
    let centre = [sol[0], sol[1], sol[2]];
    let r2 = sol[3] + centre.iter().map(|v| v * v).sum::<f64>();
    if !(r2 > 0.0) {
        bail!("degenerate sphere fit (r² = {r2})");
    }
    Ok((centre, r2.sqrt()))
}

fn unit_vectors(points: &[[f64; 3]], origin: [f64; 3]) -> Result<Vec<[f64; 3]>> {
    points
        .iter()
        .map(|p| {
            let v = [p[0] - origin[0], p[1] - origin[1], p[2] - origin[2]];
            let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            if norm == 0.0 {
                bail!("electrode position coincides with the sphere origin");
            }
            Ok([v[0] / norm, v[1] / norm, v[2] / norm])
        })
        .collect()
}

#[inline]
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Interpolation weights `[n_to, n_from]` mapping good-channel values to
/// the channels at `pos_to`.
pub fn make_interpolation_matrix(
    pos_from: &[[f64; 3]],
    pos_to: &[[f64; 3]],
    origin: [f64; 3],
) -> Result<Array2<f64>> {
    let from = unit_vectors(pos_from, origin)?;
    let to = unit_vectors(pos_to, origin)?;
    let n_from = from.len();
    if n_from == 0 {
        bail!("no source channels to interpolate from");
    }

    let c = DMatrix::from_fn(n_from + 1, n_from + 1, |i, j| {
        if i < n_from && j < n_from {
            calc_g(dot(&from[i], &from[j])) + if i == j { ALPHA } else { 0.0 }
        } else if i == n_from && j == n_from {
            0.0
        } else {
            1.0
        }
    });
    let c_inv = c
        .pseudo_inverse(1e-15)
        .map_err(|e| anyhow::anyhow!("pseudo-inverse failed: {e}"))?;
    let g_to = DMatrix::from_fn(to.len(), n_from + 1, |i, j| {
        if j < n_from { calc_g(dot(&to[i], &from[j])) } else { 1.0 }
    });
    let w = g_to * c_inv.columns(0, n_from);
    Ok(Array2::from_shape_fn((to.len(), n_from), |(i, j)| w[(i, j)]))
}

/// Interpolate the bad EEG channels of `raw` from its good EEG channels.
///
/// Channels named in `exclude` are neither used as sources nor
/// interpolated, whether or not they are bad.  Afterwards `bads` keeps only
/// the bad channels that were excluded (MNE's `reset_bads=True`).  Returns
/// the names of the channels that were interpolated.
pub fn interpolate_bads(raw: &mut RawRecording, exclude: &[String]) -> Result<Vec<String>> {
    let excluded = |name: &str| exclude.iter().any(|e| e == name);
    let eeg = raw.eeg_picks();
    let bads: Vec<usize> = eeg
        .iter()
        .copied()
        .filter(|&i| raw.is_bad(&raw.channels[i].name) && !excluded(&raw.channels[i].name))
        .collect();
    let mut goods: Vec<usize> = eeg
        .iter()
        .copied()
        .filter(|&i| !raw.is_bad(&raw.channels[i].name) && !excluded(&raw.channels[i].name))
        .collect();

    let interpolated: Vec<String> = bads.iter().map(|&i| raw.channels[i].name.clone()).collect();
    if !bads.is_empty() {
        goods.retain(|&i| {
            let has = raw.channels[i].pos.is_some();
            if !has {
                warn!("{} has no position and is not used for interpolation", raw.channels[i].name);
            }
            has
        });
        let pos_to = bads
            .iter()
            .map(|&i| {
                raw.channels[i]
                    .pos
                    .with_context(|| format!("bad channel {} has no position", raw.channels[i].name))
            })
            .collect::<Result<Vec<_>>>()?;
        let pos_from: Vec<[f64; 3]> = goods.iter().filter_map(|&i| raw.channels[i].pos).collect();

        let all_eeg: Vec<[f64; 3]> = raw
            .channels
            .iter()
            .filter(|c| c.kind == ChannelKind::Eeg)
            .filter_map(|c| c.pos)
            .collect();
        let (origin, radius) = fit_sphere(&all_eeg).context("fitting head sphere")?;
        info!(
            "Computing interpolation matrix from {} sensor positions (origin {:.1}, {:.1}, {:.1} mm, radius {:.1} mm)",
            pos_from.len(),
            origin[0] * 1e3,
            origin[1] * 1e3,
            origin[2] * 1e3,
            radius * 1e3
        );

        let w = make_interpolation_matrix(&pos_from, &pos_to, origin)?;
        let good_data = raw.data.select(Axis(0), &goods);
        let filled = w.dot(&good_data);
        for (k, &i) in bads.iter().enumerate() {
            raw.data.row_mut(i).assign(&filled.row(k));
        }
        info!("Interpolated {} channel(s): {}", bads.len(), interpolated.join(", "));
    }

    raw.bads.retain(|b| excluded(b));
    Ok(interpolated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::montage::Montage;
    use crate::raw::Channel;
    use approx::assert_abs_diff_eq;

    #[test]
    fn g_matches_closed_form_at_poles() {
        // Pₙ(1) = 1, Pₙ(-1) = (-1)ⁿ
        let factor = |n: f64| (2.0 * n + 1.0) / (n.powi(4) * (n + 1.0).powi(4) * 4.0 * std::f64::consts::PI);
        let up: f64 = (1..=7).map(|n| factor(n as f64)).sum();
        let down: f64 = (1..=7).map(|n| factor(n as f64) * if n % 2 == 0 { 1.0 } else { -1.0 }).sum();
        assert_abs_diff_eq!(calc_g(1.0), up, epsilon = 1e-15);
        assert_abs_diff_eq!(calc_g(-1.0), down, epsilon = 1e-15);
        // Clamped outside [-1, 1].
        assert_abs_diff_eq!(calc_g(1.5), up, epsilon = 1e-15);
    }

    #[test]
    fn sphere_fit_recovers_centre() {
        let m = Montage::standard_1020();
        let pts: Vec<[f64; 3]> = ["Fp1", "Fp2", "Cz", "T7", "T8", "O1", "O2", "Pz"]
            .iter()
            .map(|n| {
                let p = m.position(n).unwrap();
                [p[0] + 0.01, p[1] - 0.02, p[2] + 0.04]
            })
            .collect();
        let (c, r) = fit_sphere(&pts).unwrap();
        assert_abs_diff_eq!(c[0], 0.01, epsilon = 1e-9);
        assert_abs_diff_eq!(c[1], -0.02, epsilon = 1e-9);
        assert_abs_diff_eq!(c[2], 0.04, epsilon = 1e-9);
        assert_abs_diff_eq!(r, crate::montage::HEAD_RADIUS, epsilon = 1e-9);
    }

    #[test]
    fn weights_reproduce_a_constant_field() {
        let m = Montage::standard_1020();
        let from: Vec<[f64; 3]> = ["Fz", "F3", "F4", "Cz", "C4", "Pz", "P3", "P4"]
            .iter()
            .map(|n| m.position(n).unwrap())
            .collect();
        let to = vec![m.position("C3").unwrap()];
        let w = make_interpolation_matrix(&from, &to, [0.0; 3]).unwrap();
        // Row sums are 1 (the border row of C enforces it).
        assert_abs_diff_eq!(w.row(0).sum(), 1.0, epsilon = 1e-6);
    }

    fn grid_recording(names: &[&str], bads: &[&str]) -> RawRecording {
        let m = Montage::standard_1020();
        let chs: Vec<Channel> = names
            .iter()
            .map(|n| Channel { name: n.to_string(), kind: ChannelKind::Eeg, pos: m.position(n) })
            .collect();
        // Smooth spatial field: value = y-coordinate × 1e-3, plus a time ramp.
        let data = Array2::from_shape_fn((names.len(), 16), |(c, t)| {
            chs[c].pos.unwrap()[1] * 1e-3 + t as f64 * 1e-7
        });
        let mut raw = RawRecording::new(data, 100.0, chs, vec![]).unwrap();
        raw.set_bads(&bads.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap();
        raw
    }

    // Front/back and left/right symmetric apart from the excluded Fp pair.
    const NAMES: [&str; 13] =
        ["Fp1", "Fp2", "F3", "F4", "C3", "C4", "P3", "P4", "Fz", "Cz", "Pz", "T7", "T8"];

    #[test]
    fn excluded_channel_is_never_a_source() {
        let exclude = vec!["Fp1".to_string(), "Fp2".to_string()];
        let mut a = grid_recording(&NAMES, &["C3"]);
        let mut b = grid_recording(&NAMES, &["C3"]);
        // Wreck Fp1 in one copy only.
        b.data.row_mut(0).fill(1.0);
        interpolate_bads(&mut a, &exclude).unwrap();
        interpolate_bads(&mut b, &exclude).unwrap();
        let c3 = 4;
        for t in 0..16 {
            assert_abs_diff_eq!(a.data[[c3, t]], b.data[[c3, t]], epsilon = 1e-15);
        }
        assert!(a.bads.is_empty());
    }

    #[test]
    fn excluded_bad_channel_is_left_alone_and_stays_bad() {
        let exclude = vec!["Fp1".to_string(), "Fp2".to_string()];
        let mut raw = grid_recording(&NAMES, &["Fp1"]);
        let before = raw.data.clone();
        let done = interpolate_bads(&mut raw, &exclude).unwrap();
        assert!(done.is_empty());
        assert_eq!(raw.data, before);
        assert_eq!(raw.bads, ["Fp1"]);
    }

    #[test]
    fn antisymmetric_field_interpolates_to_its_midline_value() {
        // The field is odd in y and C4 sits at y = 0, so only the time ramp
        // survives.
        let exclude = vec!["Fp1".to_string(), "Fp2".to_string()];
        let mut raw = grid_recording(&NAMES, &["C4"]);
        raw.data.row_mut(5).fill(0.0);
        interpolate_bads(&mut raw, &exclude).unwrap();
        for t in 0..16 {
            assert_abs_diff_eq!(raw.data[[5, t]], t as f64 * 1e-7, epsilon = 1e-10);
        }
    }

    #[test]
    fn bad_without_position_is_an_error() {
        let mut raw = grid_recording(&NAMES, &["C3"]);
        raw.channels[4].pos = None;
        assert!(interpolate_bads(&mut raw, &[]).is_err());
    }
}
