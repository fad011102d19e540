//! Forward likelihood engine: per-site HMM recursion over latent
//! abundance, run from the last observed period back to the first.
//!
//! Purpose
//! -------
//! Marginalize latent abundance out of each site's observation history and
//! return the site log-likelihoods the model front door sums into a
//! negative log-likelihood.
//!
//! Key behaviors
//! -------------
//! For one site with window `first..=last`:
//! 1. `g* ← 1`.
//! 2. For `t = last, …, first+1`, skipping all-missing periods:
//!    `g* ← P_{t−1}^{δ(i,t)} · (g_t ⊙ g*)`, where `g_t` is the observation
//!    likelihood at `t` and `P_{t−1}` the transition matrix of column
//!    `t − 1`.
//! 3. `v ← g_first ⊙ g*`.
//! 4. If the initial gap `δ(i, first) > 1`, `v ← P_c^{δ(i,first) − 1} · v`
//!    with `c = max(first, 1) − 1`.
//! 5. `ℓ_i = ln(Σ_k π(k; λ_i)·v(k) + ε)`, `π` the mixture pmf.
//!
//! Invariants & assumptions
//! ------------------------
//! - The schedule, rates and observation model agree on `M` and `T`
//!   (checked by the front door before the engine is built).
//! - Each worker owns a [`SiteWorkspace`]; shared state is read-only.
//! - Site results are collected in site order, so the sum is independent
//!   of scheduling.
use crate::abundance::{
    core::{
        cache::TransitionCache,
        mixture::Mixture,
        rates::EffectiveRates,
        schedule::SurveySchedule,
        transition::{TransitionBuilder, TransitionScratch, propagate},
    },
    errors::{AbundanceError, AbundanceResult},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use rayon::prelude::*;
use tracing::trace;

/// Per-period observation likelihood, abstracted over survey protocols.
pub trait ObservationModel: Sync {
    /// Per-worker scratch space.
    type Scratch: Send;

    fn scratch(&self) -> Self::Scratch;

    /// Overwrite `out` (length `K + 1`) with the likelihood of the data at
    /// `site`, `period` for every latent abundance `0..=K`.
    fn fill_likelihood(
        &self, site: usize, period: usize, scratch: &mut Self::Scratch, out: ArrayViewMut1<f64>,
    );
}

/// Working buffers for one site recursion.
#[derive(Debug)]
pub struct SiteWorkspace<S> {
    g_star: Array1<f64>,
    g_obs: Array1<f64>,
    buffer: Array1<f64>,
    prior: Array1<f64>,
    matrix: Array2<f64>,
    transition: TransitionScratch,
    observation: S,
}

impl<S> SiteWorkspace<S> {
    pub fn new(k: usize, observation: S) -> Self {
        let lk = k + 1;
        SiteWorkspace {
            g_star: Array1::ones(lk),
            g_obs: Array1::zeros(lk),
            buffer: Array1::zeros(lk),
            prior: Array1::zeros(lk),
            matrix: Array2::zeros((lk, lk)),
            transition: TransitionScratch::new(k),
            observation,
        }
    }
}

/// Log-likelihood of one site and whether it hit the underflow floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteOutcome {
    pub log_lik: f64,
    pub floored: bool,
}

/// Read-only state shared by every site recursion of one evaluation.
pub struct ForwardEngine<'a, O: ObservationModel> {
    schedule: &'a SurveySchedule,
    rates: &'a EffectiveRates,
    lambda: ArrayView1<'a, f64>,
    mixture: Mixture,
    builder: &'a TransitionBuilder<'a>,
    cache: &'a TransitionCache,
    observation: &'a O,
    k: usize,
    floor: f64,
}

impl<'a, O: ObservationModel> ForwardEngine<'a, O> {
    /// Assemble the engine.
    ///
    /// # Errors
    /// Returns `InvalidSchedule` when a site needs an initial-gap transition
    /// but the model has a single period (no transition columns).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schedule: &'a SurveySchedule, rates: &'a EffectiveRates, lambda: ArrayView1<'a, f64>,
        mixture: Mixture, builder: &'a TransitionBuilder<'a>, cache: &'a TransitionCache,
        observation: &'a O, k: usize, floor: f64,
    ) -> AbundanceResult<Self> {
        if rates.n_columns() == 0 {
            for site in 0..schedule.n_sites() {
                if schedule.delta(site, schedule.first(site)) > 1 {
                    return Err(AbundanceError::InvalidSchedule {
                        site,
                        reason: "initial gap > 1 needs at least two periods",
                    });
                }
            }
        }
        Ok(ForwardEngine { schedule, rates, lambda, mixture, builder, cache, observation, k, floor })
    }

    pub fn workspace(&self) -> SiteWorkspace<O::Scratch> {
        SiteWorkspace::new(self.k, self.observation.scratch())
    }

    /// Run the recursion for one site.
    pub fn site_log_likelihood(&self, site: usize, ws: &mut SiteWorkspace<O::Scratch>) -> SiteOutcome {
        let SiteWorkspace { g_star, g_obs, buffer, prior, matrix, transition, observation } = ws;
        let first = self.schedule.first(site);
        let last = self.schedule.last(site);

        g_star.fill(1.0);
        for period in ((first + 1)..=last).rev() {
            if self.schedule.is_missing(site, period) {
                continue;
            }
            self.observation.fill_likelihood(site, period, observation, g_obs.view_mut());
            *g_star *= &*g_obs;
            let p = self.cache.matrix(site, period - 1, self.builder, self.rates, transition, matrix);
            propagate(p, self.schedule.delta(site, period), g_star, buffer);
        }

        self.observation.fill_likelihood(site, first, observation, g_obs.view_mut());
        *g_star *= &*g_obs;

        let initial_gap = self.schedule.delta(site, first);
        if initial_gap > 1 {
            let column = first.saturating_sub(1).min(self.rates.n_columns() - 1);
            let p = self.cache.matrix(site, column, self.builder, self.rates, transition, matrix);
            propagate(p, initial_gap - 1, g_star, buffer);
        }

        self.mixture.fill_pmf(self.lambda[site], prior.view_mut());
        let likelihood = prior.dot(&*g_star);
        let floored = likelihood <= 0.0;
        if floored {
            trace!(site, "site likelihood underflowed; applying floor");
        }
        SiteOutcome { log_lik: (likelihood + self.floor).ln(), floored }
    }

    /// Run every site, in parallel on the rayon pool when requested.
    ///
    /// Outcomes are returned in site order.
    pub fn run(&self, parallel: bool) -> Vec<SiteOutcome> {
        let n_sites = self.schedule.n_sites();
        if parallel {
            (0..n_sites)
                .into_par_iter()
                .map_init(|| self.workspace(), |ws, site| self.site_log_likelihood(site, ws))
                .collect()
        } else {
            let mut ws = self.workspace();
            (0..n_sites).map(|site| self.site_log_likelihood(site, &mut ws)).collect()
        }
    }
}
