// Sample store - per-monitor timestamps with parallel value series
use super::sample::SampleBatch;
use thiserror::Error;

/// Shape errors between a batch, a store and the chart rendering it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("batch has {timestamps} timestamps but {samples} samples")]
    LengthMismatch { timestamps: usize, samples: usize },

    #[error("sample {index} has {found} fields, expected {expected}")]
    FieldCount {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("store holds {found} series but the chart renders {expected}")]
    SeriesCount { expected: usize, found: usize },

    #[error("series {index} has {found} points for {expected} timestamps")]
    SeriesLength {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Result of a successful merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub appended: usize,
    /// Largest timestamp among the appended samples
    pub latest: Option<i64>,
}

/// Ordered timestamps plus one value series per sample field.
///
/// Every series always has exactly as many points as there are timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleStore {
    timestamps: Vec<i64>,
    series: Vec<Vec<f64>>,
}

/// Borrowed, read-only view of a store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreSnapshot<'a> {
    pub timestamps: &'a [i64],
    pub series: &'a [Vec<f64>],
}

impl SampleStore {
    pub fn new(series_count: usize) -> Self {
        Self {
            timestamps: Vec::new(),
            series: vec![Vec::new(); series_count],
        }
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append every sample of `batch` dated strictly after `watermark`.
    ///
    /// The whole batch is validated before anything is appended, so a
    /// rejected batch leaves the store untouched.
    pub fn merge(
        &mut self,
        batch: &SampleBatch,
        watermark: i64,
    ) -> Result<MergeOutcome, ValidationError> {
        if batch.timestamps.len() != batch.samples.len() {
            return Err(ValidationError::LengthMismatch {
                timestamps: batch.timestamps.len(),
                samples: batch.samples.len(),
            });
        }

        let expected = self.series.len();
        if let Some((index, fields)) = batch
            .samples
            .iter()
            .enumerate()
            .find(|(_, fields)| fields.len() != expected)
        {
            return Err(ValidationError::FieldCount {
                index,
                expected,
                found: fields.len(),
            });
        }

        let mut outcome = MergeOutcome::default();
        for (&timestamp, fields) in batch.timestamps.iter().zip(&batch.samples) {
            if timestamp <= watermark {
                continue;
            }

            self.timestamps.push(timestamp);
            for (series, &value) in self.series.iter_mut().zip(fields) {
                series.push(value);
            }

            outcome.appended += 1;
            outcome.latest = Some(outcome.latest.map_or(timestamp, |l| l.max(timestamp)));
        }

        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.timestamps.clear();
        for series in &mut self.series {
            series.clear();
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot<'_> {
        StoreSnapshot {
            timestamps: &self.timestamps,
            series: &self.series,
        }
    }
}

impl StoreSnapshot<'_> {
    /// Check the snapshot against a chart rendering `rendered_series` series
    pub fn validate(&self, rendered_series: usize) -> Result<(), ValidationError> {
        if self.series.len() != rendered_series {
            return Err(ValidationError::SeriesCount {
                expected: rendered_series,
                found: self.series.len(),
            });
        }

        for (index, series) in self.series.iter().enumerate() {
            if series.len() != self.timestamps.len() {
                return Err(ValidationError::SeriesLength {
                    index,
                    expected: self.timestamps.len(),
                    found: series.len(),
                });
            }
        }

        Ok(())
    }
}
