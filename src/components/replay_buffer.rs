use {
    crate::{
        components::PrngKey,
        error::TD3Error,
    },
    candle_core::{
        Device,
        Result,
        Tensor,
    },
    rand::{
        distributions::Uniform,
        Rng,
    },
};

/// A single environment step.
///
/// # Fields
///
/// * `obs` - The observation the action was taken in.
/// * `action` - The action that was taken.
/// * `reward` - The reward that was received.
/// * `next_obs` - The observation returned by the environment.
/// * `done` - Whether the episode ended with this step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub obs: Vec<f64>,
    pub action: Vec<f64>,
    pub reward: f64,
    pub next_obs: Vec<f64>,
    pub done: bool,
}

/// A batch of transitions gathered from the replay buffer.
///
/// Vector fields are flattened row-major, so row `i` of `obs` is
/// `obs[i * obs_dim..(i + 1) * obs_dim]`. `done` is stored as `0.0` / `1.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Minibatch {
    pub obs: Vec<f64>,
    pub action: Vec<f64>,
    pub reward: Vec<f64>,
    pub next_obs: Vec<f64>,
    pub done: Vec<f64>,
    pub obs_dim: usize,
    pub action_dim: usize,
}

/// The device-side version of a [`Minibatch`].
pub struct BatchTensors {
    pub obs: Tensor,
    pub action: Tensor,
    pub reward: Tensor,
    pub next_obs: Tensor,
    pub done: Tensor,
}

impl Minibatch {
    pub fn batch_size(&self) -> usize {
        self.reward.len()
    }

    /// Apply `f` to every row of `obs` and `next_obs`.
    pub fn map_observations<F>(
        mut self,
        f: F,
    ) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let obs_dim = self.obs_dim;
        let map = |flat: &[f64]| -> Vec<f64> {
            flat.chunks_exact(obs_dim).flat_map(&f).collect()
        };
        self.obs = map(&self.obs);
        self.next_obs = map(&self.next_obs);
        self
    }

    pub fn tensors(
        &self,
        device: &Device,
    ) -> Result<BatchTensors> {
        let b = self.batch_size();
        Ok(BatchTensors {
            obs: Tensor::from_slice(&self.obs, (b, self.obs_dim), device)?,
            action: Tensor::from_slice(&self.action, (b, self.action_dim), device)?,
            reward: Tensor::from_slice(&self.reward, b, device)?,
            next_obs: Tensor::from_slice(&self.next_obs, (b, self.obs_dim), device)?,
            done: Tensor::from_slice(&self.done, b, device)?,
        })
    }
}

/// A fixed-capacity replay buffer for off-policy algorithms.
///
/// The buffer is a ring over parallel arrays, one per transition field. The
/// `k`-th appended transition lands at position `k mod capacity`; once the
/// buffer is full the oldest entry is overwritten.
///
/// # Fields
///
/// * `obs`, `action`, `reward`, `next_obs`, `done` - The storage arrays.
/// * `capacity` - The maximum number of transitions held.
/// * `cursor` - The position the next transition is written to.
/// * `count` - The number of populated positions.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    obs: Vec<f64>,
    action: Vec<f64>,
    reward: Vec<f64>,
    next_obs: Vec<f64>,
    done: Vec<bool>,
    obs_dim: usize,
    action_dim: usize,
    capacity: usize,
    cursor: usize,
    count: usize,
}

impl ReplayBuffer {
    /// Create a zero-filled replay buffer.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn empty(
        capacity: usize,
        obs_dim: usize,
        action_dim: usize,
    ) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            obs: vec![0.0; capacity * obs_dim],
            action: vec![0.0; capacity * action_dim],
            reward: vec![0.0; capacity],
            next_obs: vec![0.0; capacity * obs_dim],
            done: vec![false; capacity],
            obs_dim,
            action_dim,
            capacity,
            cursor: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Write a transition at the cursor and advance it.
    ///
    /// The transition must match the buffer's observation and action sizes;
    /// the training loop checks this before appending.
    pub fn append(
        mut self,
        transition: &Transition,
    ) -> Self {
        let i = self.cursor;
        self.obs[i * self.obs_dim..(i + 1) * self.obs_dim].copy_from_slice(&transition.obs);
        self.action[i * self.action_dim..(i + 1) * self.action_dim]
            .copy_from_slice(&transition.action);
        self.reward[i] = transition.reward;
        self.next_obs[i * self.obs_dim..(i + 1) * self.obs_dim]
            .copy_from_slice(&transition.next_obs);
        self.done[i] = transition.done;

        self.cursor = (self.cursor + 1) % self.capacity;
        self.count = (self.count + 1).min(self.capacity);
        self
    }

    /// Read back the transition stored at `index`, if that position has been
    /// written to.
    pub fn get(
        &self,
        index: usize,
    ) -> Option<Transition> {
        (index < self.count).then(|| Transition {
            obs: self.obs[index * self.obs_dim..(index + 1) * self.obs_dim].to_vec(),
            action: self.action[index * self.action_dim..(index + 1) * self.action_dim].to_vec(),
            reward: self.reward[index],
            next_obs: self.next_obs[index * self.obs_dim..(index + 1) * self.obs_dim].to_vec(),
            done: self.done[index],
        })
    }

    /// Draw `batch_size` positions uniformly, with replacement, from the
    /// populated part of the buffer.
    pub fn sample_indices(
        &self,
        batch_size: usize,
        key: PrngKey,
    ) -> std::result::Result<Vec<usize>, TD3Error> {
        if self.is_empty() {
            return Err(TD3Error::EmptyBuffer);
        }
        Ok(key
            .rng()
            .sample_iter(Uniform::from(0..self.count))
            .take(batch_size)
            .collect())
    }

    /// Sample a random batch of transitions from the buffer.
    pub fn sample(
        &self,
        batch_size: usize,
        key: PrngKey,
    ) -> std::result::Result<Minibatch, TD3Error> {
        let indices = self.sample_indices(batch_size, key)?;

        let gather = |flat: &[f64], dim: usize| -> Vec<f64> {
            indices
                .iter()
                .flat_map(|&i| flat[i * dim..(i + 1) * dim].iter().copied())
                .collect()
        };

        Ok(Minibatch {
            obs: gather(&self.obs, self.obs_dim),
            action: gather(&self.action, self.action_dim),
            reward: gather(&self.reward, 1),
            next_obs: gather(&self.next_obs, self.obs_dim),
            done: indices.iter().map(|&i| f64::from(u8::from(self.done[i]))).collect(),
            obs_dim: self.obs_dim,
            action_dim: self.action_dim,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn transition(k: usize) -> Transition {
        let x = k as f64;
        Transition {
            obs: vec![x, x + 0.5],
            action: vec![-x],
            reward: x * 10.0,
            next_obs: vec![x + 1.0, x + 1.5],
            done: k % 3 == 0,
        }
    }

    fn filled(capacity: usize, n: usize) -> ReplayBuffer {
        (0..n).fold(ReplayBuffer::empty(capacity, 2, 1), |buffer, k| {
            buffer.append(&transition(k))
        })
    }

    #[test]
    fn empty_buffer_is_zeroed() {
        let buffer = ReplayBuffer::empty(4, 2, 1);
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert!(buffer.get(0).is_none());
        assert!(matches!(
            buffer.sample(3, PrngKey::new(0)),
            Err(TD3Error::EmptyBuffer),
        ));
    }

    #[test]
    fn append_writes_at_cursor() {
        let buffer = filled(5, 3);
        assert_eq!(buffer.len(), 3);
        for k in 0..3 {
            assert_eq!(buffer.get(k), Some(transition(k)));
        }
        assert!(buffer.get(3).is_none());
    }

    #[test]
    fn wraparound_keeps_last_capacity_transitions() {
        let capacity = 4;
        for extra in [0, 1, 3, 4, 9] {
            let n = capacity + extra;
            let buffer = filled(capacity, n);
            assert!(buffer.is_full());
            assert_eq!(buffer.len(), capacity);

            let mut stored: Vec<f64> = (0..capacity)
                .map(|i| buffer.get(i).map(|t| t.reward).unwrap_or(f64::NAN))
                .collect();
            stored.sort_by(|a, b| a.total_cmp(b));
            let expected: Vec<f64> = (n - capacity..n).map(|k| transition(k).reward).collect();
            assert_eq!(stored, expected);

            // entry k sits at position k mod capacity
            for k in n - capacity..n {
                assert_eq!(buffer.get(k % capacity), Some(transition(k)));
            }
        }
    }

    #[test]
    fn sampling_never_returns_unwritten_entries() {
        let buffer = filled(100, 7);
        for seed in 0..20 {
            let indices = buffer.sample_indices(64, PrngKey::new(seed)).unwrap();
            assert_eq!(indices.len(), 64);
            assert!(indices.iter().all(|&i| i < 7));

            let batch = buffer.sample(64, PrngKey::new(seed)).unwrap();
            assert!(batch.reward.iter().all(|r| *r < 70.0));
        }
    }

    #[test]
    fn sampling_is_with_replacement() {
        let buffer = filled(10, 2);
        let indices = buffer.sample_indices(50, PrngKey::new(1)).unwrap();
        assert!(indices.contains(&0));
        assert!(indices.contains(&1));
    }

    #[test]
    fn sampling_is_deterministic_per_key() {
        let buffer = filled(16, 16);
        assert_eq!(
            buffer.sample(8, PrngKey::new(5)).unwrap(),
            buffer.sample(8, PrngKey::new(5)).unwrap(),
        );
    }

    #[test]
    fn minibatch_rows_are_consistent() {
        let buffer = filled(8, 8);
        let batch = buffer.sample(16, PrngKey::new(11)).unwrap();
        assert_eq!(batch.batch_size(), 16);
        assert_eq!(batch.obs.len(), 32);
        assert_eq!(batch.action.len(), 16);
        for i in 0..16 {
            let k = batch.obs[2 * i] as usize;
            let t = transition(k);
            assert_eq!(&batch.obs[2 * i..2 * i + 2], t.obs.as_slice());
            assert_eq!(batch.action[i], t.action[0]);
            assert_eq!(batch.reward[i], t.reward);
            assert_eq!(&batch.next_obs[2 * i..2 * i + 2], t.next_obs.as_slice());
            assert_eq!(batch.done[i], if t.done { 1.0 } else { 0.0 });
        }
    }

    #[test]
    fn map_observations_touches_both_observation_fields() {
        let buffer = filled(4, 4);
        let batch = buffer.sample(4, PrngKey::new(2)).unwrap();
        let doubled = batch.clone().map_observations(|row| row.iter().map(|x| 2.0 * x).collect());
        assert_eq!(doubled.action, batch.action);
        for (a, b) in doubled.obs.iter().zip(&batch.obs) {
            assert_eq!(*a, 2.0 * b);
        }
        for (a, b) in doubled.next_obs.iter().zip(&batch.next_obs) {
            assert_eq!(*a, 2.0 * b);
        }
    }

    #[test]
    fn tensors_have_batch_shapes() -> anyhow::Result<()> {
        let buffer = filled(4, 4);
        let batch = buffer.sample(3, PrngKey::new(0))?;
        let tensors = batch.tensors(&Device::Cpu)?;
        assert_eq!(tensors.obs.dims(), &[3, 2]);
        assert_eq!(tensors.action.dims(), &[3, 1]);
        assert_eq!(tensors.reward.dims(), &[3]);
        assert_eq!(tensors.next_obs.dims(), &[3, 2]);
        assert_eq!(tensors.done.dims(), &[3]);
        Ok(())
    }
}
