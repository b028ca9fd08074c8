use serde::{Deserialize, Serialize};
use simple_error::{SimpleError, SimpleResult};

/// Exported part of a recorder buffer, either bare values or `[t, v]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportedSeries {
    Values(Vec<f64>),
    Pairs(Vec<[f64; 2]>),
}

impl ExportedSeries {
    pub fn len(&self) -> usize {
        match self {
            ExportedSeries::Values(values) => values.len(),
            ExportedSeries::Pairs(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens into the layout `collect` hands out: `[v0, v1, ...]` or
    /// `[t0, v0, t1, v1, ...]`.
    pub fn into_flat(self) -> Vec<f64> {
        match self {
            ExportedSeries::Values(values) => values,
            ExportedSeries::Pairs(pairs) => pairs.into_iter().flatten().collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderSnapshot {
    pub path: String,
    pub column_name: String,
    pub dt: f64,
    pub cursor: usize,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub value: f64,
}

pub fn split_interleaved(data: &[f64]) -> SimpleResult<Vec<(f64, f64)>> {
    if data.len() % 2 != 0 {
        return Err(SimpleError::new(format!(
            "interleaved data must have even length, got {}",
            data.len()
        )));
    }

    Ok(data.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect())
}
