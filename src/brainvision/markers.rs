//! `.vmrk` marker file parsing.
//!
//! ```text
//! [Marker Infos]
//! ; Mk<n>=<Type>,<Description>,<Position>,<Size>,<Channel>[,<Date>]
//! Mk1=New Segment,,1,1,0,20230301101500000000
//! Mk2=Stimulus,S 11,5012,1,0
//! ```
//!
//! Positions are 1-based sample numbers; they become 0-based annotation
//! onsets with description `"<Type>/<Description>"`.
use anyhow::{anyhow, bail, Context, Result};

use super::header::parse_sections;
use crate::raw::Annotation;

/// Parse marker text into annotations, in file order.
pub fn parse_markers(text: &str) -> Result<Vec<Annotation>> {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or_default().trim_start_matches('\u{feff}');
    if !(first.starts_with("Brain Vision") || first.starts_with("BrainVision")) {
        bail!("not a BrainVision marker file (first line {first:?})");
    }
    let sections = parse_sections(lines);
    let Some(entries) = sections.get("Marker Infos") else {
        return Ok(Vec::new());
    };

    let mut numbered = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let Some(n) = key.strip_prefix("Mk").and_then(|n| n.parse::<usize>().ok()) else {
            continue;
        };
        let annot = parse_entry(value).with_context(|| format!("marker {key}"))?;
        numbered.push((n, annot));
    }
    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, a)| a).collect())
}

fn parse_entry(value: &str) -> Result<Annotation> {
    let fields: Vec<&str> = value.split(',').collect();
    if fields.len() < 3 {
        bail!("expected at least type, description and position in {value:?}");
    }
    let kind = fields[0].replace("\\1", ",");
    let desc = fields[1].replace("\\1", ",");
    let position: usize = fields[2]
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid position {:?}", fields[2]))?;
    if position == 0 {
        bail!("marker position must be 1-based, got 0");
    }
    let duration = fields
        .get(3)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::parse::<usize>)
        .transpose()
        .map_err(|_| anyhow!("invalid size {:?}", fields[3]))?
        .unwrap_or(1);
    Ok(Annotation {
        onset: position - 1,
        duration,
        description: format!("{kind}/{desc}"),
    })
}
