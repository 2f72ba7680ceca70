//! Column transformers that turn customer records into a dense feature matrix.

use crate::error::ModelError;
use crate::models::{Cell, CustomerRecord};
use ndarray::Array2;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    Ignore,
}

fn unit_scale() -> f64 {
    1.0
}

/// One fitted transformer over a single input column.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnTransform {
    OneHot {
        column: String,
        categories: Vec<String>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Numeric {
        column: String,
        #[serde(default)]
        mean: f64,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
}

impl ColumnTransform {
    pub fn column(&self) -> &str {
        match self {
            ColumnTransform::OneHot { column, .. } | ColumnTransform::Numeric { column, .. } => {
                column
            }
        }
    }

    /// Number of output features this transformer produces.
    pub fn width(&self) -> usize {
        match self {
            ColumnTransform::OneHot { categories, .. } => categories.len(),
            ColumnTransform::Numeric { .. } => 1,
        }
    }

    fn write(&self, record: &CustomerRecord, out: &mut [f64]) -> Result<(), ModelError> {
        let column = self.column();
        let cell = record
            .cell(column)
            .ok_or_else(|| ModelError::InvalidArtifact(format!("unknown column {column}")))?;

        match (self, cell) {
            (
                ColumnTransform::OneHot {
                    categories,
                    handle_unknown,
                    ..
                },
                Cell::Text(value),
            ) => match categories.iter().position(|c| c == value) {
                Some(slot) => out[slot] = 1.0,
                None if *handle_unknown == HandleUnknown::Ignore => {}
                None => {
                    return Err(ModelError::UnknownCategory {
                        column: column.to_string(),
                        value: value.to_string(),
                    })
                }
            },
            (ColumnTransform::Numeric { mean, scale, .. }, Cell::Number(x)) => {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                out[0] = (x - mean) / scale;
            }
            (ColumnTransform::OneHot { .. }, Cell::Number(_)) => {
                return Err(ModelError::ColumnType {
                    column: column.to_string(),
                    expected: "categorical",
                })
            }
            (ColumnTransform::Numeric { .. }, Cell::Text(_)) => {
                return Err(ModelError::ColumnType {
                    column: column.to_string(),
                    expected: "numeric",
                })
            }
        }
        Ok(())
    }
}

/// Ordered set of column transformers; output features are concatenated in
/// declaration order.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct FeatureEncoder {
    transforms: Vec<ColumnTransform>,
}

impl FeatureEncoder {
    pub fn new(transforms: Vec<ColumnTransform>) -> Self {
        Self { transforms }
    }

    pub fn width(&self) -> usize {
        self.transforms.iter().map(ColumnTransform::width).sum()
    }

    /// Checks every transformer targets a real record column.
    pub fn check_columns(&self) -> Result<(), ModelError> {
        for transform in &self.transforms {
            if !crate::schema::FIELDS
                .iter()
                .any(|(name, _)| *name == transform.column())
            {
                return Err(ModelError::InvalidArtifact(format!(
                    "transformer references unknown column {}",
                    transform.column()
                )));
            }
        }
        Ok(())
    }

    /// Encodes a batch into a `[records, width]` matrix.
    pub fn encode(&self, records: &[CustomerRecord]) -> Result<Array2<f64>, ModelError> {
        let width = self.width();
        let mut matrix = Array2::<f64>::zeros((records.len(), width));

        for (mut row, record) in matrix.rows_mut().into_iter().zip(records) {
            let row = row
                .as_slice_mut()
                .ok_or_else(|| ModelError::InvalidArtifact("non-contiguous feature row".into()))?;
            let mut offset = 0;
            for transform in &self.transforms {
                let end = offset + transform.width();
                transform.write(record, &mut row[offset..end])?;
                offset = end;
            }
        }

        Ok(matrix)
    }
}
