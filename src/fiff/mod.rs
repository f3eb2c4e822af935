//! FIFF epochs files.
//!
//! Writes and reads `*-epo.fif` files in the layout
//! [MNE-Python](https://mne.tools) uses for `Epochs`, so the output of this
//! crate opens with `mne.read_epochs`.
//!
//! # Quick start
//! ```no_run
//! use faceword_prep::fiff::read_epochs;
//!
//! let epochs = read_epochs("data/preprocessed/Group1-epo.fif").unwrap();
//! println!("{} epochs @ {} Hz", epochs.len(), epochs.sfreq);
//! ```
pub mod constants;
pub mod epochs;
pub mod info;
pub mod tag;
pub mod tree;
pub mod write;

pub use epochs::{read_epochs, read_epochs_from, write_epochs};
pub use info::{read_meas_info, ChannelInfo, MeasInfo};
pub use tag::{
    read_directory, read_f32, read_f32_matrix, read_i32, read_i32_array, read_raw_bytes,
    read_string, read_tag_header, TagHeader,
};
pub use tree::{read_tree, scan_directory, try_load_directory, Node};
pub use write::FifWriter;
