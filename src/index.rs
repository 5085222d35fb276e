use std::cmp::Ordering;

use tracing::debug;

use crate::error::{QaError, QaResult};

/// A single search hit: squared L2 distance and the row it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub row: usize,
}

/// Exact nearest-neighbour index over a fixed set of vectors.
///
/// Rows are stored flat and row-major. The index is immutable once built; row
/// `i` always refers to the `i`-th vector handed to [`VectorIndex::build`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Bulk-build from one vector per row. All rows must share a dimension.
    pub fn build(vectors: &[Vec<f32>]) -> QaResult<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(QaError::Retrieval("vectors must not be empty".to_string()));
        }

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for (row, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(QaError::Retrieval(format!(
                    "row {} has dimension {}, expected {}",
                    row,
                    vector.len(),
                    dimension
                )));
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the `k` nearest rows, nearest first. Every row is scanned.
    ///
    /// `k` larger than the index is clamped; the achieved count is the length of
    /// the result. Equal distances keep row order.
    pub fn query(&self, vector: &[f32], k: usize) -> QaResult<Vec<Neighbor>> {
        let n = self.len();
        if k == 0 || n == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension {
            return Err(QaError::Retrieval(format!(
                "query has dimension {}, index has {}",
                vector.len(),
                self.dimension
            )));
        }

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, stored)| Neighbor {
                distance: squared_l2(vector, stored),
                row,
            })
            .collect();
        hits.sort_by(|a, b| match a.distance.total_cmp(&b.distance) {
            Ordering::Equal => a.row.cmp(&b.row),
            other => other,
        });

        let achieved = k.min(n);
        if achieved < k {
            debug!(requested = k, achieved, "k clamped to index size");
        }
        hits.truncate(achieved);
        Ok(hits)
    }
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0;
    let n = a.len();
    let mut i = 0;

    // Unrolling 4
    while i + 3 < n {
        let d0 = a[i] - b[i];
        let d1 = a[i + 1] - b[i + 1];
        let d2 = a[i + 2] - b[i + 2];
        let d3 = a[i + 3] - b[i + 3];
        sum += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
        i += 4;
    }

    while i < n {
        let d = a[i] - b[i];
        sum += d * d;
        i += 1;
    }

    sum
}
