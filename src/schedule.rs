//! Host-side dump of a megakernel schedule: timing and instruction tensors.

use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::{KernTraceError, KernTraceResult};

/// Dense row-major 3-D integer array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Vec<i64>>>", into = "Vec<Vec<Vec<i64>>>")]
pub struct Tensor3 {
    shape: [usize; 3],
    data: Vec<i64>,
}

impl Tensor3 {
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0; shape[0] * shape[1] * shape[2]],
        }
    }

    pub fn from_nested(nested: Vec<Vec<Vec<i64>>>) -> KernTraceResult<Self> {
        let d0 = nested.len();
        let d1 = nested.first().map_or(0, Vec::len);
        let d2 = nested
            .first()
            .and_then(|rows| rows.first())
            .map_or(0, Vec::len);

        let mut data = Vec::with_capacity(d0 * d1 * d2);
        for (i, rows) in nested.into_iter().enumerate() {
            if rows.len() != d1 {
                return Err(KernTraceError::ShapeMismatch(format!(
                    "ragged tensor: row {i} has {} entries, expected {d1}",
                    rows.len()
                )));
            }
            for (j, fields) in rows.into_iter().enumerate() {
                if fields.len() != d2 {
                    return Err(KernTraceError::ShapeMismatch(format!(
                        "ragged tensor: [{i}, {j}] has {} entries, expected {d2}",
                        fields.len()
                    )));
                }
                data.extend(fields);
            }
        }
        Ok(Self {
            shape: [d0, d1, d2],
            data,
        })
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    fn offset(&self, i: usize, j: usize, k: usize) -> Option<usize> {
        let [d0, d1, d2] = self.shape;
        (i < d0 && j < d1 && k < d2).then(|| (i * d1 + j) * d2 + k)
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<i64> {
        self.offset(i, j, k).map(|o| self.data[o])
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: i64) -> KernTraceResult<()> {
        let o = self.offset(i, j, k).ok_or_else(|| {
            KernTraceError::ShapeMismatch(format!(
                "index [{i}, {j}, {k}] out of bounds for shape {:?}",
                self.shape
            ))
        })?;
        self.data[o] = value;
        Ok(())
    }
}

impl TryFrom<Vec<Vec<Vec<i64>>>> for Tensor3 {
    type Error = KernTraceError;

    fn try_from(value: Vec<Vec<Vec<i64>>>) -> Result<Self, Self::Error> {
        Self::from_nested(value)
    }
}

impl From<Tensor3> for Vec<Vec<Vec<i64>>> {
    fn from(t: Tensor3) -> Self {
        let [_, d1, d2] = t.shape;
        if d1 == 0 || d2 == 0 {
            return vec![vec![Vec::new(); d1]; t.shape[0]];
        }
        t.data
            .chunks(d1 * d2)
            .map(|sm| sm.chunks(d2).map(<[i64]>::to_vec).collect())
            .collect()
    }
}

/// Timing tensor `[num_sms, max_queue_len, events]` and instruction tensor
/// `[num_sms, max_queue_len, fields]` as read back from the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub timings: Tensor3,
    pub instructions: Tensor3,
}

impl Schedule {
    pub fn new(timings: Tensor3, instructions: Tensor3) -> Self {
        Self {
            timings,
            instructions,
        }
    }

    pub fn read_json(path: &Path) -> KernTraceResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| KernTraceError::io_at(path, e))?;
        // Ragged tensors surface here as a serde custom error.
        serde_json::from_slice(&bytes).map_err(|source| KernTraceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn num_sms(&self) -> usize {
        self.timings.shape()[0]
    }

    pub fn queue_len(&self) -> usize {
        self.timings.shape()[1]
    }
}
