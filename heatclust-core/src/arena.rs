//! Columnar point storage.
//!
//! A `PointArena` owns every point of an ingestion batch (or of a merge that
//! dissolved several batches). Clusters refer to points by `PointId` instead
//! of holding them, so a point is never shared between two owners and
//! membership tests are index comparisons.

use crate::point::{DeltaPoint, Point};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a point inside a [`PointArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointId(pub usize);

impl PointId {
    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Points and their timestamps stored in parallel vectors.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointArena {
    /// Columnar storage for the points.
    pub points: Vec<Point>,
    /// Columnar storage for observation timestamps.
    pub timestamps: Vec<i64>,
}

impl PointArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty arena with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            timestamps: Vec::with_capacity(capacity),
        }
    }

    /// Builds an arena from a batch of delta observations.
    #[must_use]
    pub fn from_deltas(deltas: &[DeltaPoint]) -> Self {
        let mut arena = Self::with_capacity(deltas.len());
        for delta in deltas {
            arena.push(delta.point.clone(), delta.timestamp);
        }
        arena
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the arena holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pushes a point and returns its id.
    pub fn push(&mut self, point: Point, timestamp: i64) -> PointId {
        let id = PointId(self.points.len());
        self.points.push(point);
        self.timestamps.push(timestamp);
        id
    }

    /// Appends every point of `other` and returns the offset at which the
    /// appended points start. `PointId(i)` of `other` becomes
    /// `PointId(offset + i)` here.
    pub fn append(&mut self, other: &PointArena) -> usize {
        let offset = self.len();
        self.points.extend_from_slice(&other.points);
        self.timestamps.extend_from_slice(&other.timestamps);
        offset
    }

    /// Returns the point for `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this arena.
    #[inline]
    #[must_use]
    pub fn point(&self, id: PointId) -> &Point {
        &self.points[id.0]
    }

    /// Returns the timestamp for `id`.
    ///
    /// # Panics
    /// Panics if `id` does not belong to this arena.
    #[inline]
    #[must_use]
    pub fn timestamp(&self, id: PointId) -> i64 {
        self.timestamps[id.0]
    }

    /// Iterates over every point id in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = PointId> {
        (0..self.len()).map(PointId)
    }

    /// Iterates over `(id, point, timestamp)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &Point, i64)> + '_ {
        self.points
            .iter()
            .zip(&self.timestamps)
            .enumerate()
            .map(|(i, (point, ts))| (PointId(i), point, *ts))
    }

    /// Dimension of the stored points, `None` when empty.
    #[must_use]
    pub fn dimensions(&self) -> Option<usize> {
        self.points.first().map(Point::dimensions)
    }
}
