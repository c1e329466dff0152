use {
    crate::components::PrngKey,
    candle_core::{
        backprop::GradStore,
        DType,
        Device,
        Error,
        Module,
        Result,
        Tensor,
        Var,
    },
    candle_nn::{
        linear,
        AdamW,
        Linear,
        Optimizer,
        ParamsAdamW,
        VarBuilder,
        VarMap,
    },
    rand::Rng,
    std::{
        collections::BTreeMap,
        ops::RangeInclusive,
        sync::PoisonError,
    },
};

/// Target parameters live in the same [`VarMap`] as the online ones, under
/// the online name with this prefix.
pub const TARGET_PREFIX: &str = "target-";

/// Flattened parameter values keyed by (online) parameter name.
pub type ParamTree = BTreeMap<String, Vec<f64>>;

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::Msg("varmap lock poisoned".to_owned())
}

/// Insert freshly initialized parameters for `prefix` and for its target copy.
///
/// Both copies get the same values but separate storage, so the online
/// network can be trained without touching the target. Weights and biases are
/// drawn from `U(-1/sqrt(fan_in), 1/sqrt(fan_in))` using `key`, never from the
/// device's own generator.
fn init_params(
    varmap: &VarMap,
    prefix: &str,
    dims: &[(usize, usize)],
    key: PrngKey,
    device: &Device,
) -> Result<()> {
    let mut data = varmap.data().lock().map_err(poisoned)?;
    for (i, (&(in_dim, out_dim), key)) in dims.iter().zip(key.split_many(dims.len())).enumerate() {
        let bound = 1.0 / (in_dim as f64).sqrt();
        let mut rng = key.rng();
        let weight: Vec<f64> = (0..in_dim * out_dim).map(|_| rng.gen_range(-bound..=bound)).collect();
        let bias: Vec<f64> = (0..out_dim).map(|_| rng.gen_range(-bound..=bound)).collect();

        for p in [prefix.to_owned(), format!("{TARGET_PREFIX}{prefix}")] {
            data.insert(
                format!("{p}-fc{i}.weight"),
                Var::from_tensor(&Tensor::from_slice(&weight, (out_dim, in_dim), device)?)?,
            );
            data.insert(
                format!("{p}-fc{i}.bias"),
                Var::from_tensor(&Tensor::from_slice(&bias, out_dim, device)?)?,
            );
        }
    }
    Ok(())
}

/// Blend every online parameter into its target copy:
/// `target = (1 - tau) * online + tau * target`.
pub fn soft_update(
    varmap: &VarMap,
    tau: f64,
) -> Result<()> {
    let data = varmap.data().lock().map_err(poisoned)?;
    for (name, target) in data.iter() {
        if let Some(online_name) = name.strip_prefix(TARGET_PREFIX) {
            let online = data
                .get(online_name)
                .ok_or_else(|| Error::Msg(format!("no online parameter for {name}")))?;
            let blended = ((online.as_tensor() * (1.0 - tau))? + (target.as_tensor() * tau)?)?;
            target.set(&blended)?;
        }
    }
    Ok(())
}

/// The variables whose name starts with `prefix`, sorted by name.
fn filter_by_prefix(
    varmap: &VarMap,
    prefix: &str,
) -> Result<Vec<Var>> {
    let data = varmap.data().lock().map_err(poisoned)?;
    let mut vars: Vec<(&String, &Var)> = data
        .iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .collect();
    vars.sort_by(|a, b| a.0.cmp(b.0));
    Ok(vars.into_iter().map(|(_, var)| var.clone()).collect())
}

/// Snapshot the parameters under `prefix`, with any target prefix stripped
/// from the names so online and target snapshots are directly comparable.
fn snapshot(
    varmap: &VarMap,
    prefix: &str,
) -> Result<ParamTree> {
    let data = varmap.data().lock().map_err(poisoned)?;
    data.iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .map(|(name, var)| {
            Ok((
                name.trim_start_matches(TARGET_PREFIX).to_owned(),
                var.flatten_all()?.to_vec1::<f64>()?,
            ))
        })
        .collect()
}

/// Adam with the epsilon used throughout training and no weight decay.
pub fn adam(
    vars: Vec<Var>,
    learning_rate: f64,
) -> Result<AdamW> {
    AdamW::new(
        vars,
        ParamsAdamW {
            lr: learning_rate,
            eps: 1e-5,
            weight_decay: 0.0,
            ..Default::default()
        },
    )
}

/// Rescale the gradients of `vars` so that their global L2 norm is at most
/// `max_norm`. Returns the norm before clipping.
pub fn clip_grad_norm(
    grads: &mut GradStore,
    vars: &[Var],
    max_norm: f64,
) -> Result<f64> {
    let mut sum_sq = 0.0;
    for var in vars {
        if let Some(grad) = grads.get(var) {
            sum_sq += grad.sqr()?.sum_all()?.to_scalar::<f64>()?;
        }
    }
    let norm = sum_sq.sqrt();

    if norm > max_norm {
        let scale = max_norm / norm;
        for var in vars {
            if let Some(grad) = grads.remove(var) {
                grads.insert(var, (grad * scale)?);
            }
        }
    }
    Ok(norm)
}

/// One optimizer step on `loss` with global-norm gradient clipping. Returns
/// the gradient norm before clipping.
pub fn clipped_backward_step(
    optimizer: &mut AdamW,
    vars: &[Var],
    loss: &Tensor,
    max_norm: f64,
) -> Result<f64> {
    let mut grads = loss.backward()?;
    let norm = clip_grad_norm(&mut grads, vars, max_norm)?;
    optimizer.step(&grads)?;
    Ok(norm)
}

/// A plain multi-layer perceptron with ReLU between layers and no activation
/// on the output.
struct Mlp {
    layers: Vec<Linear>,
}

impl Mlp {
    fn new(
        vb: &VarBuilder,
        prefix: &str,
        dims: &[(usize, usize)],
    ) -> Result<Self> {
        let layers = dims
            .iter()
            .enumerate()
            .map(|(i, &(in_dim, out_dim))| linear(in_dim, out_dim, vb.pp(format!("{prefix}-fc{i}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layers })
    }

    fn forward(
        &self,
        xs: &Tensor,
    ) -> Result<Tensor> {
        let mut xs = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i + 1 < self.layers.len() {
                xs = xs.relu()?;
            }
        }
        Ok(xs)
    }
}

/// The layer sizes of a two-hidden-layer network.
pub fn mlp_dims(
    input: usize,
    hidden_1: usize,
    hidden_2: usize,
    output: usize,
) -> [(usize, usize); 3] {
    [(input, hidden_1), (hidden_1, hidden_2), (hidden_2, output)]
}

/// Deterministic policy network with a target copy.
///
/// The output is squashed with `tanh` and mapped affinely onto the action
/// domain, so every action it produces lies within the bounds.
pub struct Actor {
    varmap: VarMap,
    network: Mlp,
    target_network: Mlp,
    action_loc: Tensor,
    action_scale: Tensor,
    device: Device,
}

impl Actor {
    pub fn new(
        key: PrngKey,
        device: &Device,
        dims: &[(usize, usize)],
        action_domain: &[RangeInclusive<f64>],
    ) -> Result<Self> {
        let varmap = VarMap::new();
        init_params(&varmap, "actor", dims, key, device)?;
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, device);

        let loc: Vec<f64> = action_domain.iter().map(|r| (r.end() + r.start()) / 2.0).collect();
        let scale: Vec<f64> = action_domain.iter().map(|r| (r.end() - r.start()) / 2.0).collect();

        Ok(Self {
            network: Mlp::new(&vb, "actor", dims)?,
            target_network: Mlp::new(&vb, &format!("{TARGET_PREFIX}actor"), dims)?,
            action_loc: Tensor::from_slice(&loc, loc.len(), device)?,
            action_scale: Tensor::from_slice(&scale, scale.len(), device)?,
            device: device.clone(),
            varmap,
        })
    }

    fn head(
        &self,
        xs: Tensor,
    ) -> Result<Tensor> {
        xs.tanh()?
            .broadcast_mul(&self.action_scale)?
            .broadcast_add(&self.action_loc)
    }

    /// Batched actions `[B, action_dim]` for observations `[B, obs_dim]`.
    pub fn forward(
        &self,
        obs: &Tensor,
    ) -> Result<Tensor> {
        self.head(self.network.forward(obs)?)
    }

    pub fn target_forward(
        &self,
        obs: &Tensor,
    ) -> Result<Tensor> {
        self.head(self.target_network.forward(obs)?)
    }

    /// The online action for a single observation.
    pub fn act(
        &self,
        obs: &[f64],
    ) -> Result<Vec<f64>> {
        // pretend there is a batch dimension
        let obs = Tensor::from_slice(obs, (1, obs.len()), &self.device)?;
        self.forward(&obs)?.squeeze(0)?.to_vec1::<f64>()
    }

    pub fn vars(&self) -> Result<Vec<Var>> {
        filter_by_prefix(&self.varmap, "actor")
    }

    pub fn track(
        &self,
        tau: f64,
    ) -> Result<()> {
        soft_update(&self.varmap, tau)
    }

    pub fn params(&self) -> Result<ParamTree> {
        snapshot(&self.varmap, "actor")
    }

    pub fn target_params(&self) -> Result<ParamTree> {
        snapshot(&self.varmap, &format!("{TARGET_PREFIX}actor"))
    }
}

/// Twin Q-networks (`q1`, `q2`) with target copies.
///
/// Both heads see `concat(obs, action)` and are initialized from independent
/// keys.
pub struct Critic {
    varmap: VarMap,
    q1: Mlp,
    q2: Mlp,
    target_q1: Mlp,
    target_q2: Mlp,
}

impl Critic {
    pub fn new(
        key: PrngKey,
        device: &Device,
        dims: &[(usize, usize)],
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let (key_q1, key_q2) = key.split();
        init_params(&varmap, "critic-q1", dims, key_q1, device)?;
        init_params(&varmap, "critic-q2", dims, key_q2, device)?;
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, device);

        Ok(Self {
            q1: Mlp::new(&vb, "critic-q1", dims)?,
            q2: Mlp::new(&vb, "critic-q2", dims)?,
            target_q1: Mlp::new(&vb, &format!("{TARGET_PREFIX}critic-q1"), dims)?,
            target_q2: Mlp::new(&vb, &format!("{TARGET_PREFIX}critic-q2"), dims)?,
            varmap,
        })
    }

    fn heads(
        q1: &Mlp,
        q2: &Mlp,
        obs: &Tensor,
        action: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        let xs = Tensor::cat(&[obs, action], 1)?;
        Ok((q1.forward(&xs)?.squeeze(1)?, q2.forward(&xs)?.squeeze(1)?))
    }

    /// Online values `(q1, q2)`, each of shape `[B]`.
    pub fn forward(
        &self,
        obs: &Tensor,
        action: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        Self::heads(&self.q1, &self.q2, obs, action)
    }

    pub fn target_forward(
        &self,
        obs: &Tensor,
        action: &Tensor,
    ) -> Result<(Tensor, Tensor)> {
        Self::heads(&self.target_q1, &self.target_q2, obs, action)
    }

    pub fn vars(&self) -> Result<Vec<Var>> {
        filter_by_prefix(&self.varmap, "critic")
    }

    pub fn track(
        &self,
        tau: f64,
    ) -> Result<()> {
        soft_update(&self.varmap, tau)
    }

    pub fn params(&self) -> Result<ParamTree> {
        snapshot(&self.varmap, "critic")
    }

    pub fn target_params(&self) -> Result<ParamTree> {
        snapshot(&self.varmap, &format!("{TARGET_PREFIX}critic"))
    }
}
