use {
    super::PrngKey,
    rand::Rng,
    rand_distr::StandardNormal,
};

/// `size` independent samples of `N(0, scale²)` drawn from `key`.
pub fn gaussian(
    key: PrngKey,
    size: usize,
    scale: f64,
) -> Vec<f64> {
    let mut rng = key.rng();
    (0..size)
        .map(|_| scale * rng.sample::<f64, _>(StandardNormal))
        .collect()
}

/// Gaussian noise clipped elementwise to `[-clip, clip]`.
///
/// This is the target-policy smoothing noise: it regularizes the bootstrap
/// action without letting the perturbation leave a small neighbourhood.
pub fn clipped_gaussian(
    key: PrngKey,
    size: usize,
    scale: f64,
    clip: f64,
) -> Vec<f64> {
    gaussian(key, size, scale)
        .into_iter()
        .map(|x| x.clamp(-clip, clip))
        .collect()
}
