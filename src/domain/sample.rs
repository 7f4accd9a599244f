// Sample domain models

/// One timestamped reading with a fixed number of numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub values: Vec<f64>,
}

impl Sample {
    pub fn new(timestamp: i64, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }
}

/// A channel's response from the backend.
///
/// `timestamps[i]` dates `samples[i]`. The backend does not promise the
/// timestamps are sorted or unique; the store's watermark does the dedup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBatch {
    pub timestamps: Vec<i64>,
    pub samples: Vec<Vec<f64>>,
}

impl SampleBatch {
    pub fn new(timestamps: Vec<i64>, samples: Vec<Vec<f64>>) -> Self {
        Self {
            timestamps,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty() && self.samples.is_empty()
    }

    /// Largest timestamp carried by the batch, whether or not it survives a merge
    pub fn latest(&self) -> Option<i64> {
        self.timestamps.iter().copied().max()
    }
}

impl FromIterator<Sample> for SampleBatch {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        let (timestamps, samples) = iter
            .into_iter()
            .map(|sample| (sample.timestamp, sample.values))
            .unzip();
        Self::new(timestamps, samples)
    }
}
