//! Ordered collection of data points.

use std::ops::Range;

/// An ordered sequence of points, immutable once constructed.
///
/// No deduplication happens anywhere in here; callers that merge
/// overlapping sources own the consequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    points: Vec<T>,
}

impl<T> Dataset<T> {
    pub fn new(points: Vec<T>) -> Self {
        Dataset { points }
    }

    pub fn empty() -> Self {
        Dataset { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[T] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<T> {
        self.points
    }
}

impl<T: Clone> Dataset<T> {
    /// Owned copy of `range`, with the end clamped to the length.
    pub fn slice(&self, range: Range<usize>) -> Dataset<T> {
        let start = range.start.min(self.points.len());
        let end = range.end.min(self.points.len()).max(start);
        Dataset::new(self.points[start..end].to_vec())
    }

    /// A new dataset holding `self`'s points followed by `other`'s.
    pub fn concat(&self, other: &Dataset<T>) -> Dataset<T> {
        let mut points = self.points.clone();
        points.extend(other.points.iter().cloned());
        Dataset::new(points)
    }
}

impl<T> Default for Dataset<T> {
    fn default() -> Self {
        Dataset::empty()
    }
}

impl<T> FromIterator<T> for Dataset<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a Dataset<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
