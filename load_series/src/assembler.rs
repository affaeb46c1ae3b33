//! Series assembler: many extracts into one ordered, deduplicated series

use crate::error::{Result, SeriesError};
use crate::records::{RawObservation, SeriesPoint};
use tracing::debug;

/// Chronological series built from every selected extract
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSeries {
    pub points: Vec<SeriesPoint>,
    /// Observations dropped because an earlier one had the same timestamp
    pub duplicates_removed: usize,
}

/// Merge observation batches into one strictly increasing series
///
/// Batches are taken in file-processing order. The sort is stable, so for
/// equal timestamps the observation met first survives. Fails with
/// [`SeriesError::EmptyInput`] when there is nothing to assemble.
pub fn assemble<'a, I>(batches: I) -> Result<AssembledSeries>
where
    I: IntoIterator<Item = &'a [RawObservation]>,
{
    let mut files = 0;
    let mut points: Vec<SeriesPoint> = Vec::new();
    for batch in batches {
        files += 1;
        points.extend(batch.iter().map(RawObservation::to_point));
    }

    if points.is_empty() {
        return Err(SeriesError::EmptyInput { files });
    }

    points.sort_by_key(|p| p.timestamp);

    let before = points.len();
    points.dedup_by_key(|p| p.timestamp);
    let duplicates_removed = before - points.len();

    debug_assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    debug!(
        files,
        points = points.len(),
        duplicates_removed,
        "assembled series"
    );

    Ok(AssembledSeries {
        points,
        duplicates_removed,
    })
}
