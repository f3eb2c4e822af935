//! Standard electrode layout.
//!
//! `standard_1020` positions are generated from the idealised spherical
//! 10-10 system rather than read from a digitisation file:
//!
//! * Rows (`Fp`, `AF`, `F`, `FC`/`FT`, `C`/`T`, `CP`/`TP`, `P`, `PO`, `O`, `I`)
//!   sit at 18° steps along the nasion–inion arc, `Cz` at the vertex.
//! * Along each row, electrodes `z, 1/2, 3/4, 5/6, 7/8` are spaced evenly
//!   (in an azimuthal-equidistant projection around `Cz`) between the
//!   midline and the 72° circumference ring; `9/10` continue one step past
//!   it.  `Fp1/2` and `O1/2` lie on the ring.
//! * Odd numbers are left (−x), even numbers right (+x).
//!
//! Head frame: x → right ear, y → nasion, z → vertex; radius 95 mm.
use log::warn;

use crate::raw::{ChannelKind, RawRecording};

/// Head radius in metres.
pub const HEAD_RADIUS: f64 = 0.095;

/// Every label in the `standard_1020` layout.
pub const STANDARD_1020: &[&str] = &[
    "Fp1", "Fpz", "Fp2",
    "AF9", "AF7", "AF5", "AF3", "AF1", "AFz", "AF2", "AF4", "AF6", "AF8", "AF10",
    "F9", "F7", "F5", "F3", "F1", "Fz", "F2", "F4", "F6", "F8", "F10",
    "FT9", "FT7", "FC5", "FC3", "FC1", "FCz", "FC2", "FC4", "FC6", "FT8", "FT10",
    "T9", "T7", "C5", "C3", "C1", "Cz", "C2", "C4", "C6", "T8", "T10",
    "TP9", "TP7", "CP5", "CP3", "CP1", "CPz", "CP2", "CP4", "CP6", "TP8", "TP10",
    "P9", "P7", "P5", "P3", "P1", "Pz", "P2", "P4", "P6", "P8", "P10",
    "PO9", "PO7", "PO5", "PO3", "PO1", "POz", "PO2", "PO4", "PO6", "PO8", "PO10",
    "O1", "Oz", "O2", "O9", "Iz", "O10",
    "T3", "T5", "T4", "T6", "M1", "M2", "A1", "A2",
];

/// A named set of electrode positions.
#[derive(Debug, Clone)]
pub struct Montage {
    positions: Vec<(String, [f64; 3])>,
}

impl Montage {
    /// The `standard_1020` layout.
    pub fn standard_1020() -> Self {
        let positions = STANDARD_1020
            .iter()
            .filter_map(|&name| ten_ten_position(name).map(|p| (name.to_string(), p)))
            .collect();
        Self { positions }
    }

    /// Look up by name, ignoring ASCII case.
    pub fn position(&self, name: &str) -> Option<[f64; 3]> {
        self.positions
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Assign positions to the EEG channels of `raw`.
    ///
    /// EEG channels the layout does not know are left without a position and
    /// reported with a warning.  Returns the names of those channels.
    pub fn apply(&self, raw: &mut RawRecording) -> Vec<String> {
        let mut missing = Vec::new();
        for ch in raw.channels.iter_mut().filter(|c| c.kind == ChannelKind::Eeg) {
            ch.pos = self.position(&ch.name);
            if ch.pos.is_none() {
                missing.push(ch.name.clone());
            }
        }
        if !missing.is_empty() {
            warn!(
                "DigMontage is missing {} EEG channel position(s): {}",
                missing.len(),
                missing.join(", ")
            );
        }
        missing
    }
}

/// Idealised 10-10 position of `name`, or `None` for unknown labels.
fn ten_ten_position(name: &str) -> Option<[f64; 3]> {
    // Legacy 10-20 names and mastoids.
    let name = match name {
        "T3" => "T7",
        "T4" => "T8",
        "T5" => "P7",
        "T6" => "P8",
        _ => name,
    };
    match name {
        "M1" | "A1" => return Some(spherical(108.0, -100.0)),
        "M2" | "A2" => return Some(spherical(108.0, 100.0)),
        _ => {}
    }

    // Longest row prefix first.
    const ROWS: [(&str, f64); 13] = [
        ("Fp", 72.0), ("AF", 54.0), ("FC", 18.0), ("FT", 18.0), ("CP", -18.0),
        ("TP", -18.0), ("PO", -54.0), ("F", 36.0), ("C", 0.0), ("T", 0.0),
        ("P", -36.0), ("O", -72.0), ("I", -90.0),
    ];
    let (prefix, row) = ROWS.iter().find(|(p, _)| name.starts_with(p))?;
    let col = &name[prefix.len()..];

    let (side, step) = if col.eq_ignore_ascii_case("z") {
        (0.0, 0.0)
    } else {
        let n: u32 = col.parse().ok().filter(|&n| (1..=10).contains(&n))?;
        let side = if n % 2 == 1 { -1.0 } else { 1.0 };
        (side, f64::from((n + 1) / 2))
    };
    // Fp1/2 and O1/2 sit directly on the 72° ring.
    let frac = match *prefix {
        "Fp" | "O" if step > 0.0 => 1.0 + (step - 1.0) / 4.0,
        _ => step / 4.0,
    };

    // Midline point and ring point of this row, in projected degrees.
    let mid = (0.0, *row);
    let az = (90.0 - row).to_radians();
    let edge = (72.0 * az.sin(), 72.0 * az.cos());
    let x = side * frac * edge.0;
    let y = mid.1 + frac * (edge.1 - mid.1);

    let polar = x.hypot(y);
    let azimuth = x.atan2(y).to_degrees();
    Some(spherical(polar, azimuth))
}

/// Cartesian position from polar angle (from vertex) and azimuth (from
/// nasion towards the right ear), both in degrees.
fn spherical(polar_deg: f64, azimuth_deg: f64) -> [f64; 3] {
    let (t, p) = (polar_deg.to_radians(), azimuth_deg.to_radians());
    [
        HEAD_RADIUS * t.sin() * p.sin(),
        HEAD_RADIUS * t.sin() * p.cos(),
        HEAD_RADIUS * t.cos(),
    ]
}
