//! Pairing of boundary-hour snapshots into enriched trajectory records.

use tracing::{debug, warn};

use crate::models::{CoordKey, LabelMapping, PlaceLabel, RawSnapshot, TrajectoryRecord};

/// Pair the hour-00 and hour-23 snapshots index by index.
///
/// The pairing is positional: index `i` of the start snapshot is assumed to
/// be the same physical balloon as index `i` of the end snapshot. When the
/// snapshots disagree on length, indices beyond the shorter one are dropped
/// silently. A key missing from the mapping labels the endpoint `Unknown`
/// rather than failing the assembly.
pub fn assemble(
    start: &RawSnapshot,
    end: &RawSnapshot,
    labels: &LabelMapping,
) -> Vec<TrajectoryRecord> {
    let count = start.len().min(end.len());
    if start.len() != end.len() {
        warn!(
            start = start.len(),
            end = end.len(),
            paired = count,
            "snapshot lengths differ, dropping unpaired tail"
        );
    }

    let records = (0..count)
        .map(|i| {
            let s = start.0[i];
            let e = end.0[i];
            TrajectoryRecord {
                start: s,
                end: e,
                start_place: label_for(labels, s[0], s[1]),
                end_place: label_for(labels, e[0], e[1]),
            }
        })
        .collect::<Vec<_>>();

    debug!(records = records.len(), "assembled trajectory records");
    records
}

fn label_for(labels: &LabelMapping, lat: f64, lon: f64) -> PlaceLabel {
    labels
        .get(&CoordKey::from_degrees(lat, lon))
        .cloned()
        .unwrap_or(PlaceLabel::Unknown)
}
