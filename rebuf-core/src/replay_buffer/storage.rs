//! Circular field storage.
//!
//! One fixed-capacity flat buffer per field; slot `i` owns rows
//! `[i * item_len, (i + 1) * item_len)` of each field. The cursor assigns
//! slots round-robin, so writing a slot when the buffer is full implicitly
//! evicts the previous occupant (FIFO). Each slot also records the
//! insertion id of its current occupant, which is how stale priority
//! feedback is detected after eviction.
use crate::batch::{FieldArray, Schema, TransitionBatch};
use crate::error::ReplayError;
use std::collections::HashMap;

/// Flat circular buffer for one field.
struct FieldStore {
    item_shape: Vec<usize>,
    item_len: usize,
    data: Vec<f32>,
}

/// Fixed-capacity circular storage for all fields of a buffer.
pub(crate) struct CircularStorage {
    capacity: usize,
    schema: Option<Schema>,
    fields: HashMap<String, FieldStore>,
    /// Insertion id currently occupying each slot; `u64::MAX` means never written.
    ids: Vec<u64>,
}

impl CircularStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            schema: None,
            fields: HashMap::new(),
            ids: vec![u64::MAX; capacity],
        }
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Fixes the schema on the first call; validates against it afterwards.
    ///
    /// No storage is touched on failure, so a rejected batch leaves the
    /// buffer exactly as it was.
    pub fn ensure_schema(&mut self, batch: &TransitionBatch) -> Result<(), ReplayError> {
        batch.check_ragged()?;
        let incoming = Schema::of(batch);
        match &self.schema {
            Some(schema) => {
                if *schema != incoming {
                    return Err(ReplayError::SchemaMismatch(format!(
                        "batch fields {:?} do not match the established schema {:?}",
                        incoming, schema
                    )));
                }
            }
            None => {
                if incoming.num_fields() == 0 {
                    return Err(ReplayError::SchemaMismatch(
                        "cannot establish a schema from a batch with no fields".to_string(),
                    ));
                }
                for (name, item_shape) in incoming.iter() {
                    let item_len = item_shape.iter().product::<usize>();
                    self.fields.insert(
                        name.clone(),
                        FieldStore {
                            item_shape: item_shape.clone(),
                            item_len,
                            data: vec![0.0; self.capacity * item_len],
                        },
                    );
                }
                self.schema = Some(incoming);
            }
        }
        Ok(())
    }

    /// Writes a batch into consecutive slots starting at `cursor`, wrapping.
    ///
    /// The batch must already have passed [`ensure_schema`](Self::ensure_schema).
    pub fn write(&mut self, cursor: usize, batch: &TransitionBatch, first_id: u64) {
        let n = batch.len();
        for (name, store) in self.fields.iter_mut() {
            if let Some(src) = batch.field(name) {
                let w = store.item_len;
                let mut j = cursor;
                for r in 0..n {
                    store.data[j * w..(j + 1) * w].copy_from_slice(src.row(r));
                    j += 1;
                    if j == self.capacity {
                        j = 0;
                    }
                }
            }
        }
        let mut j = cursor;
        for r in 0..n {
            self.ids[j] = first_id + r as u64;
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    /// Insertion id currently held by a slot.
    pub fn slot_id(&self, slot: usize) -> u64 {
        self.ids[slot]
    }

    /// Gathers the given slots into a new batch.
    pub fn gather(&self, slots: &[usize]) -> TransitionBatch {
        let mut batch = TransitionBatch::empty();
        for (name, store) in self.fields.iter() {
            let w = store.item_len;
            let mut data = Vec::with_capacity(slots.len() * w);
            for &slot in slots {
                data.extend_from_slice(&store.data[slot * w..(slot + 1) * w]);
            }
            let mut shape = Vec::with_capacity(store.item_shape.len() + 1);
            shape.push(slots.len());
            shape.extend_from_slice(&store.item_shape);
            batch.insert(name.clone(), FieldArray::new(data, shape).unwrap());
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::CircularStorage;
    use crate::batch::{FieldArray, TransitionBatch};

    fn batch(values: &[f32]) -> TransitionBatch {
        TransitionBatch::from_fields(vec![(
            "obs",
            FieldArray::from_scalars(values.to_vec()),
        )])
        .unwrap()
    }

    #[test]
    fn writes_wrap_around_the_cursor() {
        let mut storage = CircularStorage::new(4);
        let b = batch(&[10.0, 11.0, 12.0]);
        storage.ensure_schema(&b).unwrap();
        storage.write(2, &b, 0);

        let out = storage.gather(&[2, 3, 0]);
        assert_eq!(out.field("obs").unwrap().data(), &[10.0, 11.0, 12.0]);
        assert_eq!(storage.slot_id(0), 2);
        assert_eq!(storage.slot_id(1), u64::MAX);
    }

    #[test]
    fn schema_is_fixed_by_the_first_batch() {
        let mut storage = CircularStorage::new(4);
        storage.ensure_schema(&batch(&[1.0])).unwrap();

        let other = TransitionBatch::from_fields(vec![(
            "act",
            FieldArray::from_scalars(vec![1.0]),
        )])
        .unwrap();
        assert!(storage.ensure_schema(&other).is_err());
        assert!(storage.ensure_schema(&batch(&[2.0, 3.0])).is_ok());
    }
}
