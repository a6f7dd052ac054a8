//! Named-field transition batches.
//!
//! A transition batch maps field names to dense numeric arrays sharing a
//! leading batch dimension. The same representation is used on both sides
//! of the buffer boundary: producers build batches and `extend` them in,
//! sampling returns batches with the sampled insertion ids and, for
//! prioritized sampling, importance weights attached.
use crate::error::ReplayError;
use std::collections::{hash_map::Iter, HashMap};

/// A dense array of `f32` values with an explicit shape.
///
/// The leading dimension (`shape[0]`) is the batch dimension.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldArray {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl FieldArray {
    /// Creates an array, validating that the data length matches the shape.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self, ReplayError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected || shape.is_empty() {
            return Err(ReplayError::SchemaMismatch(format!(
                "field data of length {} does not fit shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self { data, shape })
    }

    /// Creates a rank-1 array of scalars, one per transition.
    pub fn from_scalars(data: Vec<f32>) -> Self {
        let shape = vec![data.len()];
        Self { data, shape }
    }

    /// The leading (batch) dimension.
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    /// Returns `true` when the leading dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The full shape, including the leading dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The per-item shape, i.e. the shape without the leading dimension.
    pub fn item_shape(&self) -> &[usize] {
        &self.shape[1..]
    }

    /// Number of scalars in one item.
    pub fn item_len(&self) -> usize {
        self.shape[1..].iter().product()
    }

    /// The raw data, row-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// The `i`-th row of the leading dimension.
    pub fn row(&self, i: usize) -> &[f32] {
        let w = self.item_len();
        &self.data[i * w..(i + 1) * w]
    }
}

/// The field set and per-field item shapes shared by all records in a buffer.
///
/// The first `extend` call fixes the schema; later batches must match it.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema(HashMap<String, Vec<usize>>);

impl Schema {
    /// Derives the schema of a batch.
    pub fn of(batch: &TransitionBatch) -> Self {
        Self(
            batch
                .fields()
                .map(|(name, array)| (name.clone(), array.item_shape().to_vec()))
                .collect(),
        )
    }

    /// Iterates over field names and their per-item shapes.
    pub fn iter(&self) -> Iter<'_, String, Vec<usize>> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn num_fields(&self) -> usize {
        self.0.len()
    }
}

/// A batch of transitions: named fields of equal leading dimension.
///
/// After sampling, `ix_sample` carries the insertion ids of the sampled
/// transitions (for later priority feedback) and `weight` carries the
/// importance-sampling correction weights when prioritized sampling is
/// active.
#[derive(Debug)]
pub struct TransitionBatch {
    fields: HashMap<String, FieldArray>,

    /// Insertion ids of the sampled transitions.
    pub ix_sample: Option<Vec<u64>>,

    /// Importance-sampling weights of the sampled transitions.
    pub weight: Option<Vec<f32>>,
}

impl TransitionBatch {
    /// Creates an empty batch.
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
            ix_sample: None,
            weight: None,
        }
    }

    /// Creates a batch from named fields.
    ///
    /// Fails with [`ReplayError::SchemaMismatch`] if the fields disagree on
    /// the leading dimension.
    pub fn from_fields<K: Into<String>>(
        fields: Vec<(K, FieldArray)>,
    ) -> Result<Self, ReplayError> {
        let batch = Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ix_sample: None,
            weight: None,
        };
        batch.check_ragged()?;
        Ok(batch)
    }

    /// Inserts a field, replacing any previous field of the same name.
    pub fn insert(&mut self, name: impl Into<String>, array: FieldArray) {
        self.fields.insert(name.into(), array);
    }

    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.fields.values().next().map(|f| f.len()).unwrap_or(0)
    }

    /// Returns `true` when the batch holds no transitions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldArray> {
        self.fields.get(name)
    }

    /// Iterates over the named fields.
    pub fn fields(&self) -> Iter<'_, String, FieldArray> {
        self.fields.iter()
    }

    /// Fails when the fields disagree on the leading dimension.
    pub(crate) fn check_ragged(&self) -> Result<(), ReplayError> {
        let n = self.len();
        for (name, array) in self.fields.iter() {
            if array.len() != n {
                return Err(ReplayError::SchemaMismatch(format!(
                    "field `{}` has leading dimension {} but the batch has {}",
                    name,
                    array.len(),
                    n
                )));
            }
        }
        Ok(())
    }
}
