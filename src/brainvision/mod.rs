//! BrainVision recording reader (`.vhdr` + `.vmrk` + binary `.eeg`).
//!
//! # Quick start
//! ```no_run
//! use faceword_prep::brainvision::read_raw_brainvision;
//!
//! let raw = read_raw_brainvision("data/FaceWord_Group1.vhdr").unwrap();
//! println!("{} channels @ {} Hz", raw.n_channels(), raw.sfreq);
//! ```
//!
//! All samples are loaded into memory and scaled to volts:
//! ```text
//! volts[ch, t] = raw_value[ch, t] × resolution[ch] × unit_scale[ch]
//! ```
pub mod header;
pub mod markers;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use ndarray::Array2;

pub use header::{BinaryFormat, ChannelEntry, Orientation, VhdrHeader};
pub use markers::parse_markers;

use crate::raw::{Channel, ChannelKind, RawRecording};

/// Channel names BrainVision amplifiers use for ocular electrodes.
const DEFAULT_EOG: [&str; 3] = ["HEOGL", "HEOGR", "VEOGb"];

/// Read a BrainVision recording, preloading all samples.
pub fn read_raw_brainvision<P: AsRef<Path>>(vhdr: P) -> Result<RawRecording> {
    let vhdr = vhdr.as_ref();
    let header_text = read_text(vhdr)?;
    let header = VhdrHeader::parse(&header_text)
        .with_context(|| format!("parse {}", vhdr.display()))?;
    let dir = vhdr.parent().unwrap_or_else(|| Path::new("."));

    let data_path = dir.join(&header.data_file);
    let data = read_binary(&data_path, &header)
        .with_context(|| format!("read {}", data_path.display()))?;

    let annotations = match &header.marker_file {
        Some(m) => {
            let path = dir.join(m);
            parse_markers(&read_text(&path)?)
                .with_context(|| format!("parse {}", path.display()))?
        }
        None => Vec::new(),
    };

    let channels = header
        .channels
        .iter()
        .map(|e| {
            let kind = if e.volts_per_unit().is_none() {
                ChannelKind::Misc
            } else if DEFAULT_EOG.contains(&e.name.as_str()) {
                ChannelKind::Eog
            } else {
                ChannelKind::Eeg
            };
            Channel { name: e.name.clone(), kind, pos: None }
        })
        .collect();

    debug!(
        "{}: {} ch × {} samples @ {} Hz, {} markers",
        vhdr.display(),
        data.nrows(),
        data.ncols(),
        header.sfreq(),
        annotations.len()
    );
    RawRecording::new(data, header.sfreq(), channels, annotations)
}

/// Read a text file as UTF-8, falling back to Latin-1 for ANSI codepages.
fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("open {}", path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    })
}

/// Read the binary data file into `[n_chan, n_times]` volts.
fn read_binary(path: &Path, header: &VhdrHeader) -> Result<Array2<f64>> {
    let n_chan = header.channels.len();
    let width = header.binary_format.width();
    let file = File::open(path)?;
    let n_bytes = file.metadata()?.len() as usize;
    if n_chan == 0 {
        bail!("header declares no channels");
    }
    if n_bytes % (width * n_chan) != 0 {
        bail!(
            "data size {n_bytes} is not a multiple of {n_chan} channels × {width} bytes"
        );
    }
    let n_times = n_bytes / (width * n_chan);

    let scales: Vec<f64> = header
        .channels
        .iter()
        .map(|c| c.resolution * c.volts_per_unit().unwrap_or(1.0))
        .collect();

    let mut reader = BufReader::new(file);
    let mut out = Array2::<f64>::zeros((n_chan, n_times));
    match header.orientation {
        Orientation::Multiplexed => {
            for t in 0..n_times {
                for c in 0..n_chan {
                    out[[c, t]] = read_sample(&mut reader, header.binary_format)? * scales[c];
                }
            }
        }
        Orientation::Vectorized => {
            for c in 0..n_chan {
                for t in 0..n_times {
                    out[[c, t]] = read_sample(&mut reader, header.binary_format)? * scales[c];
                }
            }
        }
    }
    Ok(out)
}

#[inline]
fn read_sample<R: Read>(reader: &mut R, format: BinaryFormat) -> Result<f64> {
    Ok(match format {
        BinaryFormat::Int16 => reader.read_i16::<LittleEndian>()? as f64,
        BinaryFormat::UInt16 => reader.read_u16::<LittleEndian>()? as f64,
        BinaryFormat::Int32 => reader.read_i32::<LittleEndian>()? as f64,
        BinaryFormat::Float32 => reader.read_f32::<LittleEndian>()? as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn write_fixture(dir: &Path, orientation: &str) -> std::path::PathBuf {
        let vhdr = dir.join("rec.vhdr");
        let mut h = File::create(&vhdr).unwrap();
        write!(
            h,
            "Brain Vision Data Exchange Header File Version 1.0\n\
             [Common Infos]\nDataFile=rec.eeg\nMarkerFile=rec.vmrk\n\
             DataFormat=BINARY\nDataOrientation={orientation}\nNumberOfChannels=2\n\
             SamplingInterval=4000\n[Binary Infos]\nBinaryFormat=INT_16\n\
             [Channel Infos]\nCh1=Cz,,0.5,µV\nCh2=HEOGL,,1,mV\n"
        )
        .unwrap();

        let mut m = File::create(dir.join("rec.vmrk")).unwrap();
        write!(
            m,
            "Brain Vision Data Exchange Marker File, Version 1.0\n\
             [Marker Infos]\nMk1=Stimulus,S 11,3,1,0\n"
        )
        .unwrap();

        // channel 0: 0, 2, 4, 6; channel 1: 1, 3, 5, 7 (raw units)
        let mut d = File::create(dir.join("rec.eeg")).unwrap();
        let values: Vec<i16> = if orientation == "MULTIPLEXED" {
            (0..8).collect()
        } else {
            vec![0, 2, 4, 6, 1, 3, 5, 7]
        };
        for v in values {
            d.write_i16::<LittleEndian>(v).unwrap();
        }
        vhdr
    }

    #[test]
    fn reads_multiplexed_int16() {
        let dir = tempfile::tempdir().unwrap();
        let raw = read_raw_brainvision(write_fixture(dir.path(), "MULTIPLEXED")).unwrap();
        assert_eq!(raw.data.dim(), (2, 4));
        approx::assert_abs_diff_eq!(raw.sfreq, 250.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(raw.data[[0, 2]], 4.0 * 0.5e-6, epsilon = 1e-15);
        approx::assert_abs_diff_eq!(raw.data[[1, 3]], 7.0 * 1e-3, epsilon = 1e-12);
        assert_eq!(raw.channels[1].kind, ChannelKind::Eog);
        assert_eq!(raw.annotations[0].onset, 2);
        assert_eq!(raw.annotations[0].description, "Stimulus/S 11");
    }

    #[test]
    fn vectorized_matches_multiplexed() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let mux = read_raw_brainvision(write_fixture(a.path(), "MULTIPLEXED")).unwrap();
        let vec = read_raw_brainvision(write_fixture(b.path(), "VECTORIZED")).unwrap();
        assert_eq!(mux.data, vec.data);
    }

    #[test]
    fn missing_data_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let vhdr = write_fixture(dir.path(), "MULTIPLEXED");
        std::fs::remove_file(dir.path().join("rec.eeg")).unwrap();
        assert!(read_raw_brainvision(vhdr).is_err());
    }
}
