//! End-to-end tests of the replay buffer contract.
use rebuf_core::{
    replay_buffer::{PerConfig, ReplayBuffer, ReplayBufferConfig},
    ExperienceBufferBase, FieldArray, ReplayBufferBase, TransitionBatch,
};

/// One scalar field `obs` tagging each transition with a distinct value.
fn tagged_batch(values: &[f32]) -> TransitionBatch {
    TransitionBatch::from_fields(vec![("obs", FieldArray::from_scalars(values.to_vec()))]).unwrap()
}

fn sampled_values(batch: &TransitionBatch) -> Vec<f32> {
    batch.field("obs").unwrap().data().to_vec()
}

fn uniform_config(capacity: usize) -> ReplayBufferConfig {
    ReplayBufferConfig::default().capacity(capacity).seed(0)
}

fn per_config(capacity: usize, alpha: f32, beta: f32) -> ReplayBufferConfig {
    ReplayBufferConfig::default().capacity(capacity).seed(0).per_config(Some(
        PerConfig::default()
            .alpha(alpha)
            .beta_0(beta)
            .beta_final(beta),
    ))
}

#[test]
fn size_tracks_insertions_until_capacity() {
    let mut buffer = ReplayBuffer::build(&uniform_config(4));
    assert_eq!(buffer.len(), 0);

    let ids = buffer.extend(tagged_batch(&[0.0, 1.0, 2.0])).unwrap();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(buffer.len(), 3);

    let ids = buffer.extend(tagged_batch(&[3.0, 4.0, 5.0])).unwrap();
    assert_eq!(ids, vec![3, 4, 5]);
    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.cursor(), 2);
}

#[test]
fn evicted_records_are_no_longer_sampled() {
    let mut buffer = ReplayBuffer::build(&uniform_config(4).replacement(true));
    buffer
        .extend(tagged_batch(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]))
        .unwrap();

    // slots now hold 4, 5, 2, 3; the two oldest records are gone
    for _ in 0..50 {
        let batch = buffer.sample(4).unwrap();
        for v in sampled_values(&batch) {
            assert!(v >= 2.0, "evicted record {} was sampled", v);
        }
    }
}

#[test]
fn sampling_without_replacement_returns_each_record_once() {
    let mut buffer = ReplayBuffer::build(&uniform_config(8).replacement(false));
    buffer.extend(tagged_batch(&[0.0, 1.0, 2.0, 3.0, 4.0])).unwrap();

    let batch = buffer.sample(5).unwrap();
    let mut values = sampled_values(&batch);
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

    // asking for more than is stored fails instead of repeating records
    assert!(buffer.sample(6).is_err());
}

#[test]
fn sampling_an_empty_buffer_fails_immediately() {
    let mut buffer = ReplayBuffer::build(&uniform_config(4));
    assert!(buffer.sample(1).is_err());
}

#[test]
fn schema_mismatch_rejects_the_whole_batch() {
    let mut buffer = ReplayBuffer::build(&uniform_config(4));
    buffer.extend(tagged_batch(&[0.0])).unwrap();

    let other = TransitionBatch::from_fields(vec![(
        "act",
        FieldArray::from_scalars(vec![1.0, 2.0]),
    )])
    .unwrap();
    assert!(buffer.extend(other).is_err());
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.cursor(), 1);
}

#[test]
fn uniform_buffer_attaches_ids_but_no_weights() {
    let mut buffer = ReplayBuffer::build(&uniform_config(4));
    buffer.extend(tagged_batch(&[0.0, 1.0])).unwrap();

    let batch = buffer.sample(2).unwrap();
    assert!(batch.weight.is_none());
    let ids = batch.ix_sample.as_ref().unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|&id| id < 2));
}

#[test]
fn prioritized_sampling_prefers_high_priority_records() {
    let mut buffer = ReplayBuffer::build(&per_config(4, 1.0, 1.0));
    let ids = buffer.extend(tagged_batch(&[0.0, 1.0, 2.0, 3.0])).unwrap();

    // make record 3 dominate the priority mass
    buffer.update_priority(&[ids[3]], &[1000.0]).unwrap();

    let mut hits = 0usize;
    let mut draws = 0usize;
    for _ in 0..200 {
        let batch = buffer.sample(8).unwrap();
        for v in sampled_values(&batch) {
            draws += 1;
            if v == 3.0 {
                hits += 1;
            }
        }
    }
    let freq = hits as f32 / draws as f32;
    assert!(freq > 0.95, "high-priority record sampled at frequency {}", freq);
}

#[test]
fn importance_weights_are_normalized_and_penalize_high_priorities() {
    let mut buffer = ReplayBuffer::build(&per_config(8, 1.0, 1.0));
    let ids = buffer.extend(tagged_batch(&[0.0, 1.0, 2.0, 3.0])).unwrap();
    buffer
        .update_priority(&ids, &[1.0, 1.0, 1.0, 50.0])
        .unwrap();

    // keep sampling until a batch contains both a dominant and a plain record
    for _ in 0..100 {
        let batch = buffer.sample(16).unwrap();
        let values = sampled_values(&batch);
        let weights = batch.weight.as_ref().unwrap();

        let w_max = weights.iter().fold(f32::NEG_INFINITY, |m, &w| w.max(m));
        assert_eq!(w_max, 1.0);
        assert!(weights.iter().all(|w| w.is_finite() && *w >= 0.0));

        let dominant = values.iter().position(|&v| v == 3.0);
        let plain = values.iter().position(|&v| v != 3.0);
        if let (Some(d), Some(p)) = (dominant, plain) {
            assert!(weights[d] < weights[p]);
            return;
        }
    }
    panic!("no batch contained both priority classes");
}

#[test]
fn alpha_zero_bypasses_priorities() {
    let mut buffer = ReplayBuffer::build(&per_config(4, 0.0, 1.0));
    let ids = buffer.extend(tagged_batch(&[0.0, 1.0, 2.0])).unwrap();
    buffer.update_priority(&[ids[0]], &[1000.0]).unwrap();

    let mut counts = [0usize; 3];
    let n_batches = 3000;
    for _ in 0..n_batches {
        let batch = buffer.sample(1).unwrap();
        counts[sampled_values(&batch)[0] as usize] += 1;
        assert_eq!(batch.weight.as_ref().unwrap(), &vec![1.0]);
    }
    for &c in counts.iter() {
        let freq = c as f32 / n_batches as f32;
        assert!(
            (freq - 1.0 / 3.0).abs() < 0.05,
            "uniform frequency off: {}",
            freq
        );
    }
}

#[test]
fn stale_priority_updates_are_counted_no_ops() {
    let mut buffer = ReplayBuffer::build(&per_config(2, 1.0, 1.0));
    buffer.extend(tagged_batch(&[0.0, 1.0])).unwrap();
    // evicts id 0
    buffer.extend(tagged_batch(&[2.0])).unwrap();

    let size = buffer.len();
    let cursor = buffer.cursor();
    let total = buffer.priority_total().unwrap();

    buffer.update_priority(&[0], &[100.0]).unwrap();

    assert_eq!(buffer.len(), size);
    assert_eq!(buffer.cursor(), cursor);
    assert_eq!(buffer.priority_total().unwrap(), total);
    assert_eq!(buffer.n_stale_updates(), 1);
}

#[test]
fn invalid_priorities_fail_without_mutating() {
    let mut buffer = ReplayBuffer::build(&per_config(4, 1.0, 1.0));
    let ids = buffer.extend(tagged_batch(&[0.0, 1.0])).unwrap();
    let total = buffer.priority_total().unwrap();

    assert!(buffer.update_priority(&ids, &[1.0, -1.0]).is_err());
    assert!(buffer.update_priority(&ids, &[1.0, f32::NAN]).is_err());
    assert!(buffer.update_priority(&ids, &[1.0]).is_err());
    assert_eq!(buffer.priority_total().unwrap(), total);
}

#[test]
fn new_insertions_inherit_the_maximum_priority() {
    let mut buffer = ReplayBuffer::build(&per_config(8, 1.0, 1.0));
    let ids = buffer.extend(tagged_batch(&[0.0])).unwrap();
    buffer.update_priority(&ids, &[100.0]).unwrap();

    // the next insertion starts at the running maximum, so it carries
    // roughly half of the total mass
    buffer.extend(tagged_batch(&[1.0])).unwrap();
    let total = buffer.priority_total().unwrap();
    assert!((total - 200.0).abs() / 200.0 < 1e-3);
}

#[test]
fn multi_dimensional_fields_round_trip() {
    let mut buffer = ReplayBuffer::build(&uniform_config(4).replacement(false));
    let batch = TransitionBatch::from_fields(vec![
        (
            "obs",
            FieldArray::new(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], vec![2, 3]).unwrap(),
        ),
        ("reward", FieldArray::from_scalars(vec![0.5, -0.5])),
    ])
    .unwrap();
    buffer.extend(batch).unwrap();

    let out = buffer.sample(2).unwrap();
    let obs = out.field("obs").unwrap();
    assert_eq!(obs.shape(), &[2, 3]);
    let ids = out.ix_sample.as_ref().unwrap();
    for (row, &id) in ids.iter().enumerate() {
        // row id identifies the original record
        let expected: Vec<f32> = (0..3).map(|k| (id * 3 + k) as f32).collect();
        assert_eq!(obs.row(row), expected.as_slice());
    }
}
