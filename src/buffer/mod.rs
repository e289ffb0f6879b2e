//! Per-instance point accumulation.
//!
//! Points are grouped by `(database, precision)` and kept in insertion order,
//! which becomes the wire order of the request body. The buffer has no
//! internal bound; callers check `size()` after each append.

use crate::domain::Point;
use std::collections::BTreeMap;

/// Identifies one bucket within an instance's buffer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub database: Option<String>,
    pub precision: Option<String>,
}

impl BucketKey {
    pub fn new(database: Option<&str>, precision: Option<&str>) -> Self {
        Self {
            database: database.map(str::to_string),
            precision: precision.map(str::to_string),
        }
    }
}

/// The points of one bucket, taken out of the buffer by `drain`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainedBucket {
    pub key: BucketKey,
    pub points: Vec<Point>,
}

impl DrainedBucket {
    /// Newline-joined request body.
    pub fn body(&self) -> String {
        let mut body = String::with_capacity(self.points.iter().map(|p| p.len() + 1).sum());
        for (i, point) in self.points.iter().enumerate() {
            if i > 0 {
                body.push('\n');
            }
            body.push_str(point.as_str());
        }
        body
    }
}

#[derive(Debug, Default)]
pub struct PointBuffer {
    buckets: BTreeMap<BucketKey, Vec<Point>>,
    size: usize,
}

impl PointBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail of the bucket, creating it if absent.
    /// Returns the buffer size after the append.
    pub fn append(&mut self, key: BucketKey, point: Point) -> usize {
        self.buckets.entry(key).or_default().push(point);
        self.size += 1;
        self.size
    }

    /// Total points across all buckets.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Take every non-empty bucket, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<DrainedBucket> {
        self.size = 0;
        std::mem::take(&mut self.buckets)
            .into_iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(key, points)| DrainedBucket { key, points })
            .collect()
    }
}
