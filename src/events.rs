//! Marker annotations → event table.
//!
//! BrainVision marker descriptions are mapped to integer codes the way
//! `mne.events_from_annotations` does for BrainVision recordings:
//!
//! | description          | code       |
//! |----------------------|------------|
//! | `Stimulus/S<n>`      | `n`        |
//! | `Response/R<n>`      | `1000 + n` |
//! | `Optic/O<n>`         | `2000 + n` |
//! | `New Segment/`       | `99999`    |
//! | `SyncStatus/Sync On` | `99998`    |
//!
//! Any other description is skipped.
use log::debug;

use crate::raw::Annotation;

/// One marker occurrence: sample index and integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Event {
    pub sample: usize,
    pub code: i32,
}

/// Integer code for a BrainVision marker description, if it has one.
pub fn brainvision_code(description: &str) -> Option<i32> {
    match description {
        "New Segment/" => return Some(99999),
        "SyncStatus/Sync On" => return Some(99998),
        _ => {}
    }
    let (kind, rest) = description.split_once('/')?;
    let (prefix, offset) = match kind {
        "Stimulus" => ('S', 0),
        "Response" => ('R', 1000),
        "Optic" => ('O', 2000),
        _ => return None,
    };
    let n: i32 = rest.strip_prefix(prefix)?.trim().parse().ok()?;
    Some(n + offset)
}

/// Build the event table from annotations, sorted by sample.
///
/// Annotations sharing a sample keep their marker-file order.
pub fn events_from_annotations(annotations: &[Annotation]) -> Vec<Event> {
    let mut skipped = 0usize;
    let mut events: Vec<Event> = annotations
        .iter()
        .filter_map(|a| {
            let code = brainvision_code(&a.description);
            if code.is_none() {
                skipped += 1;
                debug!("no event code for annotation {:?}", a.description);
            }
            code.map(|code| Event { sample: a.onset, code })
        })
        .collect();
    events.sort_by_key(|e| e.sample);
    debug!(
        "{} events from {} annotations ({skipped} skipped)",
        events.len(),
        annotations.len()
    );
    events
}
