//! Vector-space primitives: coordinates, points and point distance measures.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single scalar coordinate of a point.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate(pub f64);

impl Coordinate {
    /// Creates a new coordinate.
    #[inline]
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Returns the raw scalar value.
    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns `|self - other|^exponent`.
    #[inline]
    #[must_use]
    pub fn powered_distance_to(&self, other: &Self, exponent: f64) -> f64 {
        (self.0 - other.0).abs().powf(exponent)
    }

    /// Returns `|self - other|`.
    #[inline]
    #[must_use]
    pub fn absolute_distance_to(&self, other: &Self) -> f64 {
        (self.0 - other.0).abs()
    }

    /// Adds a scalar to this coordinate.
    #[inline]
    pub fn add_value(&mut self, value: f64) {
        self.0 += value;
    }

    /// Divides the coordinate by `denominator`. A zero denominator is a no-op.
    #[inline]
    pub fn normalize(&mut self, denominator: f64) {
        if denominator != 0.0 {
            self.0 /= denominator;
        }
    }
}

impl From<f64> for Coordinate {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A fixed-dimension vector of coordinates.
///
/// The dimension is fixed when the point is created. Every binary operation
/// between two points requires equal dimensions; a mismatch means the
/// pipeline was wired incorrectly and panics.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    coords: Vec<Coordinate>,
}

impl Point {
    /// Creates a point from raw values.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            coords: values.into_iter().map(Coordinate).collect(),
        }
    }

    /// Creates a one-dimensional point.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self {
            coords: vec![Coordinate(value)],
        }
    }

    /// Creates the origin of a `dimensions`-dimensional space.
    #[must_use]
    pub fn zeros(dimensions: usize) -> Self {
        Self {
            coords: vec![Coordinate::default(); dimensions],
        }
    }

    /// Returns the origin of this point's space.
    #[must_use]
    pub fn origin(&self) -> Self {
        Self::zeros(self.dimensions())
    }

    /// Number of dimensions.
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.coords.len()
    }

    /// Returns the coordinate of `dimension`, if in range.
    #[inline]
    #[must_use]
    pub fn coordinate(&self, dimension: usize) -> Option<Coordinate> {
        self.coords.get(dimension).copied()
    }

    /// Returns the raw value of `dimension`, if in range.
    #[inline]
    #[must_use]
    pub fn value(&self, dimension: usize) -> Option<f64> {
        self.coords.get(dimension).map(Coordinate::value)
    }

    /// Sets the coordinate of `dimension`.
    ///
    /// # Panics
    /// Panics if `dimension` is out of range.
    pub fn set_coordinate(&mut self, dimension: usize, value: f64) {
        self.coords[dimension] = Coordinate(value);
    }

    /// All coordinates in dimension order.
    #[inline]
    #[must_use]
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coords
    }

    /// Iterates over the raw coordinate values.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.coords.iter().map(Coordinate::value)
    }

    /// Adds `other` to this point, dimension by dimension.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    pub fn add_point(&mut self, other: &Point) {
        self.assert_same_space(other);
        for (coord, rhs) in self.coords.iter_mut().zip(&other.coords) {
            coord.add_value(rhs.0);
        }
    }

    /// Adds `weight * other` to this point, dimension by dimension.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    pub fn add_weighted_point(&mut self, other: &Point, weight: f64) {
        self.assert_same_space(other);
        for (coord, rhs) in self.coords.iter_mut().zip(&other.coords) {
            coord.add_value(rhs.0 * weight);
        }
    }

    /// Divides every coordinate by `denominator`. A zero denominator is a no-op.
    pub fn normalize(&mut self, denominator: f64) {
        for coord in &mut self.coords {
            coord.normalize(denominator);
        }
    }

    /// Sum over dimensions of `|a_i - b_i|^exponent`.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    #[must_use]
    pub fn powered_distance_to(&self, other: &Point, exponent: f64) -> f64 {
        self.assert_same_space(other);
        self.coords
            .iter()
            .zip(&other.coords)
            .map(|(a, b)| a.powered_distance_to(b, exponent))
            .sum()
    }

    /// Euclidean distance.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    #[must_use]
    pub fn euclidean_distance_to(&self, other: &Point) -> f64 {
        let delta = self.powered_distance_to(other, 2.0);
        if delta > 0.0 {
            delta.sqrt()
        } else {
            0.0
        }
    }

    /// Euclidean distance to the origin.
    #[must_use]
    pub fn distance_to_origin(&self) -> f64 {
        self.coords
            .iter()
            .map(|c| c.0 * c.0)
            .sum::<f64>()
            .sqrt()
    }

    /// Squared Euclidean distance normalised by the squared norm of whichever
    /// of the two points lies farther from the origin.
    ///
    /// Delta streams are centred near zero. Two large deltas of the same sign
    /// (a tap running, the burner firing) describe the same regime even when
    /// their absolute gap is wide, while small deltas near zero must stay
    /// well separated. The normalisation compresses distances far from the
    /// origin accordingly; agglomerative bucket generation depends on this.
    /// When both points sit on the origin the plain squared distance (zero)
    /// is returned.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    #[must_use]
    pub fn weighted_euclidean_distance_to(&self, other: &Point) -> f64 {
        let squared = self.powered_distance_to(other, 2.0);
        let reach = self.distance_to_origin().max(other.distance_to_origin());
        let denominator = reach * reach;
        if denominator != 0.0 {
            squared / denominator
        } else {
            squared
        }
    }

    #[inline]
    fn assert_same_space(&self, other: &Point) {
        assert_eq!(
            self.dimensions(),
            other.dimensions(),
            "points differ in dimensions: vector space violation"
        );
    }
}

impl From<Vec<f64>> for Point {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (dim, coord) in self.coords.iter().enumerate() {
            if dim > 0 {
                write!(f, " ; ")?;
            }
            write!(f, "{coord}")?;
        }
        write!(f, ")")
    }
}

/// Point-to-point distance measure.
///
/// Passed explicitly through every clustering call instead of living in
/// shared state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointMeasure {
    /// Plain Euclidean distance.
    #[default]
    Euclidean,
    /// Origin-normalised squared Euclidean distance.
    WeightedEuclidean,
    /// Sum of powered coordinate differences with the given exponent.
    Powered(f64),
}

impl PointMeasure {
    /// Distance between `a` and `b` under this measure.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &Point, b: &Point) -> f64 {
        match self {
            Self::Euclidean => a.euclidean_distance_to(b),
            Self::WeightedEuclidean => a.weighted_euclidean_distance_to(b),
            Self::Powered(exponent) => a.powered_distance_to(b, exponent),
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::WeightedEuclidean => "weighted-euclidean",
            Self::Powered(_) => "powered",
        }
    }
}

/// A one-dimensional temperature delta observed at a timestamp.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeltaPoint {
    /// The delta as a one-dimensional point.
    pub point: Point,
    /// Observation time in seconds since the epoch.
    pub timestamp: i64,
}

impl DeltaPoint {
    /// Creates a new delta point.
    #[must_use]
    pub fn new(delta: f64, timestamp: i64) -> Self {
        Self {
            point: Point::scalar(delta),
            timestamp,
        }
    }

    /// Returns the delta value.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.point.value(0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_points() -> Vec<Point> {
        let mut points = Vec::new();
        for i in -3..=3 {
            for j in -2..=2 {
                let x = f64::from(i) * 1.7 + 0.3;
                let y = f64::from(j) * -2.2 + 0.1 * f64::from(i);
                points.push(Point::new(vec![x, y, x * y * 0.5]));
            }
        }
        points
    }

    #[test]
    fn test_powered_distance() {
        let a = Point::new(vec![1.0, 2.0]);
        let b = Point::new(vec![4.0, -2.0]);
        assert_relative_eq!(a.powered_distance_to(&b, 2.0), 25.0);
        assert_relative_eq!(a.powered_distance_to(&b, 1.0), 7.0);
        assert_relative_eq!(a.euclidean_distance_to(&b), 5.0);
    }

    #[test]
    fn test_powered_distance_uses_absolute_difference() {
        let a = Point::scalar(1.0);
        let b = Point::scalar(3.0);
        assert_relative_eq!(a.powered_distance_to(&b, 3.0), 8.0);
        assert_relative_eq!(b.powered_distance_to(&a, 3.0), 8.0);
    }

    #[test]
    fn test_euclidean_axioms() {
        let points = sample_points();
        for a in &points {
            assert_relative_eq!(a.euclidean_distance_to(a), 0.0);
            for b in &points {
                let ab = a.euclidean_distance_to(b);
                assert_relative_eq!(ab, b.euclidean_distance_to(a));
                for c in &points {
                    let ac = a.euclidean_distance_to(c);
                    let cb = c.euclidean_distance_to(b);
                    assert!(ab <= ac + cb + 1e-9, "triangle inequality violated");
                }
            }
        }
    }

    #[test]
    fn test_weighted_distance_compresses_far_points() {
        let near_a = Point::scalar(0.0);
        let near_b = Point::scalar(1.0);
        let far_a = Point::scalar(10.0);
        let far_b = Point::scalar(11.0);

        assert_relative_eq!(near_a.weighted_euclidean_distance_to(&near_b), 1.0);
        assert_relative_eq!(far_a.weighted_euclidean_distance_to(&far_b), 1.0 / 121.0);
        assert_relative_eq!(
            far_a.weighted_euclidean_distance_to(&far_b),
            far_b.weighted_euclidean_distance_to(&far_a)
        );
        assert_relative_eq!(near_a.weighted_euclidean_distance_to(&near_a), 0.0);
    }

    #[test]
    fn test_normalize_by_zero_is_noop() {
        let mut p = Point::new(vec![3.0, 6.0]);
        p.normalize(0.0);
        assert_eq!(p, Point::new(vec![3.0, 6.0]));
        p.normalize(3.0);
        assert_eq!(p, Point::new(vec![1.0, 2.0]));
    }

    #[test]
    #[should_panic(expected = "vector space violation")]
    fn test_dimension_mismatch_is_fatal() {
        let a = Point::new(vec![1.0, 2.0]);
        let b = Point::scalar(1.0);
        let _ = a.euclidean_distance_to(&b);
    }

    #[test]
    fn test_measure_dispatch() {
        let a = Point::scalar(2.0);
        let b = Point::scalar(4.0);
        assert_relative_eq!(PointMeasure::Euclidean.distance(&a, &b), 2.0);
        assert_relative_eq!(PointMeasure::WeightedEuclidean.distance(&a, &b), 0.25);
        assert_relative_eq!(PointMeasure::Powered(3.0).distance(&a, &b), 8.0);
    }

    #[test]
    fn test_delta_point() {
        let p = DeltaPoint::new(-4.5, 1_700_000_000);
        assert_relative_eq!(p.delta(), -4.5);
        assert_eq!(p.timestamp, 1_700_000_000);
        assert_eq!(p.point.dimensions(), 1);
        assert_eq!(format!("{}", p.point), "(-4.50)");
    }
}
