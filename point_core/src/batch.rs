//! Batch segmentation.
//!
//! Points of a mini-batch are stored back to back, tagged with the index of
//! the cloud they came from. All per-cloud algorithms work on the contiguous
//! segments produced here.

use core::ops::Range;

use crate::error::PointCoreError;

/// A contiguous run of points belonging to one cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Batch index shared by every point of the run.
    pub batch: i64,
    /// Point indices of the run.
    pub range: Range<usize>,
}

impl Segment {
    /// Number of points in the segment.
    #[inline]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the segment holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Split a batch-index vector into per-cloud segments.
///
/// Batch indices must be non-decreasing. Gaps between indices are allowed
/// (a cloud may be absent), the returned segments are in batch order.
pub fn batch_segments(batch: &[i64]) -> Result<Vec<Segment>, PointCoreError> {
    let mut segments: Vec<Segment> = Vec::new();

    for (i, &b) in batch.iter().enumerate() {
        match segments.last_mut() {
            Some(last) if last.batch == b => last.range.end = i + 1,
            Some(last) if last.batch > b => {
                return Err(PointCoreError::UnsortedBatch { index: i });
            }
            _ => segments.push(Segment {
                batch: b,
                range: i..i + 1,
            }),
        }
    }

    Ok(segments)
}

/// Check that positions and batch indices describe the same points.
pub(crate) fn check_lengths(positions: usize, batch: usize) -> Result<(), PointCoreError> {
    if positions != batch {
        return Err(PointCoreError::LengthMismatch { positions, batch });
    }
    Ok(())
}

/// Find the segment holding `batch`, if any.
pub(crate) fn find_segment(segments: &[Segment], batch: i64) -> Option<&Segment> {
    segments
        .binary_search_by(|s| s.batch.cmp(&batch))
        .ok()
        .map(|i| &segments[i])
}
