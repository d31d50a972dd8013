use serde::{Deserialize, Serialize};

use crate::{MetricsError, Result};

/// One measurement. Reads may come back without an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: f64,
    pub timestamp: i64,
}

impl DataPoint {
    pub fn new(id: impl Into<String>, value: f64, timestamp: i64) -> Self {
        Self {
            id: Some(id.into()),
            value,
            timestamp,
        }
    }
}

/// Optional parameters of a read. Times are epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub buckets: Option<u32>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: i64) -> Self {
        self.end = Some(end);
        self
    }

    pub fn buckets(mut self, buckets: u32) -> Self {
        self.buckets = Some(buckets);
        self
    }
}

/// The body of a write. Always serialized as a JSON array, even for a
/// single point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteBatch(Vec<DataPoint>);

impl WriteBatch {
    pub fn points(&self) -> &[DataPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rejects batches the server could not store: no points, a point
    /// without an id, or a non-finite value.
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(MetricsError::InvalidArgument(
                "data must contain at least one point".to_string(),
            ));
        }

        for (idx, point) in self.0.iter().enumerate() {
            match point.id.as_deref() {
                Some(id) if !id.is_empty() => {}
                _ => {
                    return Err(MetricsError::InvalidArgument(format!(
                        "point {} has no id",
                        idx
                    )))
                }
            }
            if !point.value.is_finite() {
                return Err(MetricsError::InvalidArgument(format!(
                    "point {} has non-finite value {}",
                    idx, point.value
                )));
            }
        }

        Ok(())
    }
}

impl From<DataPoint> for WriteBatch {
    fn from(point: DataPoint) -> Self {
        WriteBatch(vec![point])
    }
}

impl From<Vec<DataPoint>> for WriteBatch {
    fn from(points: Vec<DataPoint>) -> Self {
        WriteBatch(points)
    }
}

impl From<&[DataPoint]> for WriteBatch {
    fn from(points: &[DataPoint]) -> Self {
        WriteBatch(points.to_vec())
    }
}

impl FromIterator<DataPoint> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = DataPoint>>(iter: I) -> Self {
        WriteBatch(iter.into_iter().collect())
    }
}
