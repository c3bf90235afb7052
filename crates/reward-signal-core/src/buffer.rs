//! Agent trajectory buffer handed to reward signals for training

use indexmap::IndexMap;
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Result, SignalError};

/// Named fields an [`AgentBuffer`] can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferKey {
    /// Observation at step t
    VectorObs,
    /// Observation at step t + 1
    NextVectorObs,
    /// Raw action taken at step t
    Actions,
    /// Environment reward for the transition
    EnvironmentRewards,
    /// 1.0 if the episode ended on the transition
    Done,
}

impl fmt::Display for BufferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VectorObs => "vector_obs",
            Self::NextVectorObs => "next_vector_obs",
            Self::Actions => "actions",
            Self::EnvironmentRewards => "environment_rewards",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Field-keyed store of per-step rows.
///
/// Every field is a list of rows; scalar fields store rows of length one.
/// Fields collected together are expected to have the same number of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentBuffer {
    fields: IndexMap<BufferKey, Vec<Vec<f32>>>,
}

impl AgentBuffer {
    /// Create a new empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a field
    pub fn append(&mut self, key: BufferKey, row: Vec<f32>) {
        self.fields.entry(key).or_default().push(row);
    }

    /// Append a whole step at once
    pub fn push_step(
        &mut self,
        obs: Vec<f32>,
        next_obs: Vec<f32>,
        action: Vec<f32>,
        reward: f32,
        done: bool,
    ) {
        self.append(BufferKey::VectorObs, obs);
        self.append(BufferKey::NextVectorObs, next_obs);
        self.append(BufferKey::Actions, action);
        self.append(BufferKey::EnvironmentRewards, vec![reward]);
        self.append(BufferKey::Done, vec![if done { 1.0 } else { 0.0 }]);
    }

    /// Rows of a field, if collected
    #[must_use]
    pub fn field(&self, key: BufferKey) -> Option<&[Vec<f32>]> {
        self.fields.get(&key).map(Vec::as_slice)
    }

    /// Check whether a field has been collected
    #[must_use]
    pub fn contains(&self, key: BufferKey) -> bool {
        self.fields.contains_key(&key)
    }

    /// Keys currently held, in insertion order
    pub fn keys(&self) -> impl Iterator<Item = BufferKey> + '_ {
        self.fields.keys().copied()
    }

    /// Number of stored steps (rows of the longest field)
    #[must_use]
    pub fn num_experiences(&self) -> usize {
        self.fields.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Row count shared by every field. Fields of different lengths are a
    /// `DimensionMismatch`.
    pub fn aligned_len(&self) -> Result<usize> {
        let mut lengths = self.fields.values().map(Vec::len);
        let expected = lengths.next().unwrap_or(0);
        match lengths.find(|&len| len != expected) {
            Some(actual) => Err(SignalError::DimensionMismatch { expected, actual }),
            None => Ok(expected),
        }
    }

    /// Check if the buffer holds no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_experiences() == 0
    }

    /// Remove every field
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Stack the rows of a field into a matrix
    pub fn to_array(&self, key: BufferKey) -> Result<Array2<f32>> {
        let rows = self.field(key).ok_or(SignalError::MissingField(key))?;
        stack_rows(rows, |row| row.as_slice())
    }

    /// Stack selected rows of a field into a matrix
    pub fn gather(&self, key: BufferKey, indices: &[usize]) -> Result<Array2<f32>> {
        let rows = self.field(key).ok_or(SignalError::MissingField(key))?;
        let selected = indices
            .iter()
            .map(|&i| {
                rows.get(i).ok_or(SignalError::DimensionMismatch {
                    expected: i + 1,
                    actual: rows.len(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        stack_rows(&selected, |row| row.as_slice())
    }

    /// Copy rows `start..end` of every field into a new buffer
    #[must_use]
    pub fn make_mini_batch(&self, start: usize, end: usize) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|(&key, rows)| {
                let end = end.min(rows.len());
                let start = start.min(end);
                (key, rows[start..end].to_vec())
            })
            .collect();
        Self { fields }
    }

    /// Sample `batch_size` whole sequences of `sequence_length` steps.
    ///
    /// Sequences start at multiples of `sequence_length`; returns an empty
    /// buffer if fewer than one full sequence is stored.
    pub fn sample_mini_batch<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        sequence_length: usize,
        rng: &mut R,
    ) -> Self {
        let sequence_length = sequence_length.max(1);
        let num_sequences = self.num_experiences() / sequence_length;
        if num_sequences == 0 {
            return Self::new();
        }

        let starts: Vec<usize> = (0..batch_size)
            .map(|_| rng.gen_range(0..num_sequences) * sequence_length)
            .collect();

        let mut batch = Self::new();
        for (&key, rows) in &self.fields {
            let sampled = batch.fields.entry(key).or_default();
            for &start in &starts {
                let end = (start + sequence_length).min(rows.len());
                sampled.extend_from_slice(&rows[start.min(end)..end]);
            }
        }
        batch
    }

    /// Row order for one epoch, shuffled in whole sequences
    pub fn shuffled_indices<R: Rng + ?Sized>(&self, sequence_length: usize, rng: &mut R) -> Vec<usize> {
        let sequence_length = sequence_length.max(1);
        let num_sequences = self.num_experiences() / sequence_length;
        let mut order: Vec<usize> = (0..num_sequences).collect();
        order.shuffle(rng);
        order
            .into_iter()
            .flat_map(|s| s * sequence_length..(s + 1) * sequence_length)
            .collect()
    }
}

fn stack_rows<T, F>(rows: &[T], as_slice: F) -> Result<Array2<f32>>
where
    F: Fn(&T) -> &[f32],
{
    let width = rows.first().map_or(0, |r| as_slice(r).len());
    let mut flat = Vec::with_capacity(rows.len() * width);
    for row in rows {
        let row = as_slice(row);
        if row.len() != width {
            return Err(SignalError::DimensionMismatch {
                expected: width,
                actual: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| SignalError::Other(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn filled(steps: usize) -> AgentBuffer {
        let mut buffer = AgentBuffer::new();
        for i in 0..steps {
            let x = i as f32;
            buffer.push_step(vec![x, x], vec![x + 1.0, x + 1.0], vec![0.0], x, false);
        }
        buffer
    }

    #[test]
    fn test_to_array_stacks_rows() {
        let buffer = filled(3);
        let obs = buffer.to_array(BufferKey::VectorObs).unwrap();

        assert_eq!(obs.dim(), (3, 2));
        assert_eq!(obs[[2, 0]], 2.0);
        assert_eq!(buffer.num_experiences(), 3);
    }

    #[test]
    fn test_aligned_len() {
        let mut buffer = filled(4);
        assert_eq!(buffer.aligned_len().unwrap(), 4);
        assert_eq!(AgentBuffer::new().aligned_len().unwrap(), 0);

        buffer.append(BufferKey::EnvironmentRewards, vec![1.0]);
        assert!(matches!(
            buffer.aligned_len(),
            Err(SignalError::DimensionMismatch { expected: 4, actual: 5 })
        ));
    }

    #[test]
    fn test_missing_field() {
        let buffer = AgentBuffer::new();
        let err = buffer.to_array(BufferKey::Actions).unwrap_err();
        assert!(matches!(err, SignalError::MissingField(BufferKey::Actions)));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut buffer = AgentBuffer::new();
        buffer.append(BufferKey::VectorObs, vec![1.0, 2.0]);
        buffer.append(BufferKey::VectorObs, vec![1.0]);

        assert!(buffer.to_array(BufferKey::VectorObs).is_err());
    }

    #[test]
    fn test_make_mini_batch_clamps_range() {
        let buffer = filled(4);
        let batch = buffer.make_mini_batch(2, 10);

        assert_eq!(batch.num_experiences(), 2);
        assert_eq!(batch.field(BufferKey::EnvironmentRewards).unwrap()[0], vec![2.0]);
    }

    #[test]
    fn test_sample_whole_sequences() {
        let buffer = filled(8);
        let mut rng = StdRng::seed_from_u64(7);

        let batch = buffer.sample_mini_batch(3, 2, &mut rng);
        assert_eq!(batch.num_experiences(), 6);

        let rewards = batch.field(BufferKey::EnvironmentRewards).unwrap();
        for pair in rewards.chunks(2) {
            assert_eq!(pair[0][0] as usize % 2, 0);
            assert_eq!(pair[1][0], pair[0][0] + 1.0);
        }
    }

    #[test]
    fn test_shuffled_indices_cover_buffer() {
        let buffer = filled(6);
        let mut rng = StdRng::seed_from_u64(1);

        let mut order = buffer.shuffled_indices(2, &mut rng);
        order.sort_unstable();
        assert_eq!(order, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_json_round_trip_uses_snake_case_keys() {
        let buffer = filled(1);
        let json = serde_json::to_string(&buffer).unwrap();

        assert!(json.contains("\"next_vector_obs\""));
        let back: AgentBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, buffer);
    }
}
