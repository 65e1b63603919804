//! Neighborhood queries between a source point set and a query point set.
//!
//! Both queries are restricted to points of the same cloud and return
//! neighbors nearest-first, ties going to the lowest source index.

use crate::batch::{batch_segments, check_lengths, find_segment};
use crate::error::PointCoreError;
use crate::types::Point3;

/// Neighbor lists for a set of query points, stored in compressed rows.
///
/// Row `q` lists source indices around query `q`. Read as a message graph,
/// every entry is a directed edge `source -> query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    offsets: Vec<usize>,
    sources: Vec<usize>,
}

impl Neighborhood {
    /// Build a neighborhood from per-query neighbor lists.
    pub fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = Vec<usize>>,
    {
        let mut offsets = vec![0];
        let mut sources = Vec::new();
        for list in lists {
            sources.extend(list);
            offsets.push(sources.len());
        }
        Self { offsets, sources }
    }

    /// Number of query points.
    #[inline]
    pub fn num_queries(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of `source -> query` edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }

    /// Source indices around query `q`, nearest first.
    #[inline]
    pub fn neighbors(&self, q: usize) -> &[usize] {
        &self.sources[self.offsets[q]..self.offsets[q + 1]]
    }

    /// Largest neighbor count over all queries.
    pub fn max_degree(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// Iterate the edges as `(source, query)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.num_queries())
            .flat_map(move |q| self.neighbors(q).iter().map(move |&s| (s, q)))
    }
}

/// Find source points within `radius` of each query point.
///
/// A source point qualifies when its squared distance is strictly below
/// `radius²`. At most `max_num_neighbors` are kept per query, nearest first.
///
/// # Arguments
/// * `source` / `source_batch` - Points searched, grouped by cloud
/// * `query` / `query_batch` - Centers of the neighborhoods, grouped by cloud
/// * `radius` - Search radius, must be positive
/// * `max_num_neighbors` - Cap on neighbors per query, must be at least 1
pub fn radius_neighbors(
    source: &[Point3],
    source_batch: &[i64],
    query: &[Point3],
    query_batch: &[i64],
    radius: f32,
    max_num_neighbors: usize,
) -> Result<Neighborhood, PointCoreError> {
    if !(radius > 0.0) {
        return Err(PointCoreError::InvalidRadius { radius });
    }
    if max_num_neighbors == 0 {
        return Err(PointCoreError::InvalidNeighborCount);
    }
    check_lengths(source.len(), source_batch.len())?;
    check_lengths(query.len(), query_batch.len())?;

    let segments = batch_segments(source_batch)?;
    batch_segments(query_batch)?;
    let r2 = radius * radius;

    let lists = query.iter().zip(query_batch).map(|(&center, &b)| {
        let Some(segment) = find_segment(&segments, b) else {
            return Vec::new();
        };

        let mut candidates: Vec<(f32, usize)> = segment
            .range
            .clone()
            .map(|i| (source[i].distance_squared(center), i))
            .filter(|&(d, _)| d < r2)
            .collect();
        sort_nearest(&mut candidates);
        candidates.truncate(max_num_neighbors);
        candidates.into_iter().map(|(_, i)| i).collect()
    });

    Ok(Neighborhood::from_lists(lists))
}

/// Find the `k` nearest source points of each query point.
///
/// Returns, per query, up to `k` `(source index, squared distance)` pairs,
/// nearest first. Clouds with fewer than `k` source points yield shorter
/// lists; a query whose cloud has no source points is an error.
pub fn knn(
    source: &[Point3],
    source_batch: &[i64],
    query: &[Point3],
    query_batch: &[i64],
    k: usize,
) -> Result<Vec<Vec<(usize, f32)>>, PointCoreError> {
    if k == 0 {
        return Err(PointCoreError::InvalidNeighborCount);
    }
    check_lengths(source.len(), source_batch.len())?;
    check_lengths(query.len(), query_batch.len())?;

    let segments = batch_segments(source_batch)?;
    batch_segments(query_batch)?;

    query
        .iter()
        .zip(query_batch)
        .map(|(&center, &b)| {
            let segment = find_segment(&segments, b)
                .ok_or(PointCoreError::EmptyCloud { batch: b })?;

            let mut candidates: Vec<(f32, usize)> = segment
                .range
                .clone()
                .map(|i| (source[i].distance_squared(center), i))
                .collect();
            sort_nearest(&mut candidates);
            candidates.truncate(k);
            Ok(candidates.into_iter().map(|(d, i)| (i, d)).collect())
        })
        .collect()
}

fn sort_nearest(candidates: &mut [(f32, usize)]) {
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
}
