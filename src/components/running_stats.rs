use serde::{
    Deserialize,
    Serialize,
};

const EPSILON: f64 = 1e-8;

/// Running per-dimension mean and variance of observations.
///
/// Statistics are merged with the parallel variance formula, so a batch of
/// samples can be folded in at once. The count starts at `1e-4`, not zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunningMeanStd {
    mean: Vec<f64>,
    var: Vec<f64>,
    count: f64,
}

impl RunningMeanStd {
    pub fn new(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            var: vec![1.0; dim],
            count: 1e-4,
        }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn var(&self) -> &[f64] {
        &self.var
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    /// Fold a single observation into the statistics.
    pub fn update(
        &mut self,
        obs: &[f64],
    ) {
        self.update_batch(obs)
    }

    /// Fold a flattened batch of observations into the statistics.
    pub fn update_batch(
        &mut self,
        batch: &[f64],
    ) {
        let dim = self.mean.len();
        let rows: Vec<&[f64]> = batch.chunks_exact(dim).collect();
        if rows.is_empty() {
            return;
        }
        let batch_count = rows.len() as f64;

        for d in 0..dim {
            let batch_mean = rows.iter().map(|r| r[d]).sum::<f64>() / batch_count;
            let batch_var = rows
                .iter()
                .map(|r| (r[d] - batch_mean).powi(2))
                .sum::<f64>()
                / batch_count;

            let delta = batch_mean - self.mean[d];
            let total = self.count + batch_count;
            let m_a = self.var[d] * self.count;
            let m_b = batch_var * batch_count;
            let m2 = m_a + m_b + delta * delta * self.count * batch_count / total;

            self.mean[d] += delta * batch_count / total;
            self.var[d] = m2 / total;
        }
        self.count += batch_count;
    }

    /// Normalize an observation to (approximately) zero mean and unit variance.
    pub fn normalize(
        &self,
        obs: &[f64],
    ) -> Vec<f64> {
        obs.iter()
            .zip(self.mean.iter().zip(&self.var))
            .map(|(x, (m, v))| (x - m) / (v + EPSILON).sqrt())
            .collect()
    }
}
