//! Generic, model-agnostic RANSAC engine.
//!
//! Implement [`Estimator`] for a model type, then hand [`ransac`] the data
//! slice and a set of [`RansacOptions`].
//!
//! Each iteration shuffles the index range, fits the model on the first
//! `MIN_SAMPLES` indices, and scans the remaining indices for a consensus
//! set. When the consensus set is large enough, the model is refitted on
//! sample ∪ consensus and scored by the **mean residual** over that union;
//! the model with the lowest mean wins. Exhausting the iteration budget
//! without ever accepting a consensus set is a hard error
//! ([`RansacError::NoConsensus`]); no fallback model is returned.
//!
//! Sampling is driven by an explicit seed in [`RansacOptions`], so results
//! are reproducible and independent runs never share hidden state.

use log::debug;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tuning parameters for a single RANSAC run.
///
/// All knobs are per-call; there is no global configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RansacOptions {
    /// Number of RANSAC iterations to run.
    pub max_iters: usize,
    /// Inlier residual threshold (residuals strictly below it join the
    /// consensus set).
    pub thresh: f64,
    /// Minimum size the consensus set must **exceed** for a candidate model
    /// to be accepted. With `min_consensus == 0`, at least one point beyond
    /// the minimal sample must agree.
    pub min_consensus: usize,
    /// Seed for the sampling generator; equal seeds replay the same search.
    pub seed: u64,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            thresh: 2.0,
            min_consensus: 10,
            seed: 1234,
        }
    }
}

/// Output of a successful RANSAC run.
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    /// Best model found, refitted on its full inlier set.
    pub model: M,
    /// Indices of inlier data points (minimal sample ∪ consensus set),
    /// sorted ascending.
    pub inliers: Vec<usize>,
    /// Mean residual of [`model`](Self::model) over the inliers.
    pub mean_residual: f64,
    /// Iteration (1-based) at which the best model was recorded.
    pub iterations: usize,
}

/// Errors from the RANSAC engine.
#[derive(Debug, Clone, Error)]
pub enum RansacError {
    /// Fewer data points than the model's minimal sample size.
    #[error("need at least {needed} data points, got {got}")]
    NotEnoughPoints { needed: usize, got: usize },
    /// No iteration produced a consensus set exceeding `min_consensus`.
    #[error("no consensus set larger than {min_consensus} found in {iterations} iterations")]
    NoConsensus {
        min_consensus: usize,
        iterations: usize,
    },
}

/// Model-fitting interface the engine drives.
///
/// Implement this for your geometric models: lines, homographies,
/// fundamental matrices, etc. The engine knows nothing about what `fit` and
/// `residual` mean geometrically; it is pure combinatorial search.
pub trait Estimator {
    type Datum;
    type Model;

    /// Size of the minimal sample the model needs.
    const MIN_SAMPLES: usize;

    /// Fit a model to the data points selected by `indices`.
    ///
    /// Called with exactly `MIN_SAMPLES` indices for the minimal fit and
    /// with the full inlier union for the refit, so implementations must
    /// accept `MIN_SAMPLES` **or more** indices. Return `None` if the
    /// subset is degenerate or fitting fails.
    fn fit(data: &[Self::Datum], indices: &[usize]) -> Option<Self::Model>;

    /// Error of a single datum under `model`.
    ///
    /// This should be a **non-negative scalar** in the same units as
    /// `opts.thresh`.
    fn residual(model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Reject a minimal sample before fitting is attempted.
    ///
    /// The default accepts every sample.
    fn is_degenerate(_data: &[Self::Datum], _indices: &[usize]) -> bool {
        false
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::INFINITY;
    }
    vals.iter().sum::<f64>() / (vals.len() as f64)
}

/// One sampling loop over `iters` iterations with a caller-owned generator.
///
/// Returns `None` when no consensus set exceeding `opts.min_consensus` was
/// found.
fn search<E: Estimator>(
    data: &[E::Datum],
    opts: &RansacOptions,
    iters: usize,
    rng: &mut StdRng,
) -> Option<RansacResult<E::Model>> {
    let mut indices: Vec<usize> = (0..data.len()).collect();
    let mut best: Option<RansacResult<E::Model>> = None;

    let mut union = Vec::<usize>::with_capacity(data.len());
    let mut residuals = Vec::<f64>::with_capacity(data.len());

    for iter in 1..=iters {
        // Partition the index range: shuffle, then split off the minimal
        // sample. The complement is scanned for also-inliers below.
        indices.shuffle(rng);
        let (sample, rest) = indices.split_at(E::MIN_SAMPLES);

        if E::is_degenerate(data, sample) {
            debug!("iteration {iter}: degenerate sample skipped");
            continue;
        }

        let Some(model) = E::fit(data, sample) else {
            continue;
        };

        union.clear();
        union.extend_from_slice(sample);
        for &i in rest {
            if E::residual(&model, &data[i]) < opts.thresh {
                union.push(i);
            }
        }

        let consensus = union.len() - E::MIN_SAMPLES;
        if consensus <= opts.min_consensus {
            continue;
        }

        // Refit on sample ∪ consensus and score by the mean residual of the
        // refitted model over that union.
        let Some(refined) = E::fit(data, &union) else {
            continue;
        };
        residuals.clear();
        residuals.extend(union.iter().map(|&i| E::residual(&refined, &data[i])));
        let mean_residual = mean(&residuals);

        if best
            .as_ref()
            .map_or(true, |b| mean_residual < b.mean_residual)
        {
            debug!(
                "iteration {iter}: new best with {} inliers, mean residual {mean_residual:.6}",
                union.len()
            );
            let mut inliers = union.clone();
            inliers.sort_unstable();
            best = Some(RansacResult {
                model: refined,
                inliers,
                mean_residual,
                iterations: iter,
            });
        }
    }

    best
}

/// Run the RANSAC loop for a given [`Estimator`] implementation.
///
/// Always performs `opts.max_iters` iterations and returns the best model
/// recorded, or [`RansacError::NoConsensus`] if no iteration produced a
/// consensus set exceeding `opts.min_consensus`.
pub fn ransac<E: Estimator>(
    data: &[E::Datum],
    opts: &RansacOptions,
) -> Result<RansacResult<E::Model>, RansacError> {
    if data.len() < E::MIN_SAMPLES {
        return Err(RansacError::NotEnoughPoints {
            needed: E::MIN_SAMPLES,
            got: data.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    search::<E>(data, opts, opts.max_iters, &mut rng).ok_or(RansacError::NoConsensus {
        min_consensus: opts.min_consensus,
        iterations: opts.max_iters,
    })
}

/// Parallel variant of [`ransac`] fanning the iteration budget out over
/// `workers` rayon tasks.
///
/// Iterations are stateless given the data and a seed, so each worker runs
/// an independent search with its own generator (seeded from `opts.seed`
/// plus the worker index) and the per-worker bests are reduced to the
/// global lowest mean residual. With `workers <= 1` this is exactly
/// [`ransac`].
pub fn ransac_parallel<E>(
    data: &[E::Datum],
    opts: &RansacOptions,
    workers: usize,
) -> Result<RansacResult<E::Model>, RansacError>
where
    E: Estimator,
    E::Datum: Sync,
    E::Model: Send,
{
    if workers <= 1 {
        return ransac::<E>(data, opts);
    }
    if data.len() < E::MIN_SAMPLES {
        return Err(RansacError::NotEnoughPoints {
            needed: E::MIN_SAMPLES,
            got: data.len(),
        });
    }

    let per_worker = opts.max_iters.div_ceil(workers);

    (0..workers)
        .into_par_iter()
        .filter_map(|w| {
            let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(w as u64));
            search::<E>(data, opts, per_worker, &mut rng)
        })
        .min_by(|a, b| {
            a.mean_residual
                .partial_cmp(&b.mean_residual)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or(RansacError::NoConsensus {
            min_consensus: opts.min_consensus,
            iterations: opts.max_iters,
        })
}
