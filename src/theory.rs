//! Closed-form view of the same switch: the number of active users is Binomial(N, p), and the
//! link is overloaded whenever more than `link / user` of them show up at once.
//!
//! Nothing in here is used by the engine. It exists so simulated loss can be compared with what
//! the distribution predicts.

use crate::simulation::SimConfig;
use anyhow::Result;
use csv::Writer;
use rand::Rng;
use rand_distr::{Binomial, Distribution};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SWEEP_PROBS: [f64; 5] = [0.01, 0.05, 0.1, 0.2, 0.3];

/// How many users a circuit switched link could admit (whole circuits only).
pub fn circuit_capacity(link_capacity_bps: f64, user_capacity_bps: f64) -> u64 {
    (link_capacity_bps / user_capacity_bps).floor() as u64
}

fn ln_choose(n: u64, k: u64) -> f64 {
    let k = k.min(n - k);
    (1..=k).map(|i| ((n - k + i) as f64 / i as f64).ln()).sum()
}

/// P(X = k) for X ~ Binomial(n, p).
pub fn binomial_pmf(n: u64, k: u64, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    // the log form below breaks on ln(0)
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }
    let ln_pmf = ln_choose(n, k) + k as f64 * p.ln() + (n - k) as f64 * (1.0 - p).ln();
    ln_pmf.exp()
}

/// P(X <= k).
pub fn binomial_cdf(n: u64, k: u64, p: f64) -> f64 {
    if k >= n {
        return 1.0;
    }
    (0..=k).map(|i| binomial_pmf(n, i, p)).sum::<f64>().min(1.0)
}

/// P(X > k), zero when there aren't even k+1 users.
pub fn binomial_tail(n: u64, k: u64, p: f64) -> f64 {
    if n <= k {
        return 0.0;
    }
    // summing the upper tail directly keeps precision when the answer is tiny
    ((k + 1)..=n).map(|i| binomial_pmf(n, i, p)).sum::<f64>().clamp(0.0, 1.0)
}

// Abramowitz & Stegun 7.1.26, good to ~1.5e-7
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736
                + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Normal approximation of P(X > k) with continuity correction.
pub fn normal_approx_tail(n: u64, k: u64, p: f64) -> f64 {
    let mu = n as f64 * p;
    let sigma = (n as f64 * p * (1.0 - p)).sqrt();
    if sigma == 0.0 {
        return if mu <= k as f64 { 0.0 } else { 1.0 };
    }
    let z = (k as f64 + 0.5 - mu) / sigma;
    1.0 - standard_normal_cdf(z)
}

/// Monte-Carlo estimate of P(X > k) from `trials` independent draws.
pub fn monte_carlo_tail<R: Rng + ?Sized>(n: u64, k: u64, p: f64, trials: u64, rng: &mut R) -> f64 {
    if trials == 0 {
        return 0.0;
    }
    let Ok(dist) = Binomial::new(n, p) else {
        return 0.0;
    };
    let hits = (0..trials).filter(|_| dist.sample(rng) > k).count();
    hits as f64 / trials as f64
}

/// P(X > k) at one population size, one entry per swept activity probability.
#[derive(Debug, Clone, PartialEq)]
pub struct TailRow {
    pub n: u64,
    pub tails: Vec<f64>,
}

/// Overload probability for every population from 1 to `max_n`.
pub fn tail_sweep(max_n: u64, threshold: u64, probs: &[f64]) -> Vec<TailRow> {
    (1..=max_n)
        .map(|n| TailRow {
            n,
            tails: probs.iter().map(|&p| binomial_tail(n, threshold, p)).collect(),
        })
        .collect()
}

/// Smallest population whose overload probability reaches `level`, if the sweep gets there.
pub fn first_population_above(rows: &[TailRow], column: usize, level: f64) -> Option<u64> {
    rows.iter()
        .find(|row| row.tails.get(column).is_some_and(|&t| t >= level))
        .map(|row| row.n)
}

/// Writes the sweep as `N,P_tail_p=<p>,...`, one row per population.
pub fn write_tail_summary(path: impl AsRef<Path>, probs: &[f64], rows: &[TailRow]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = Writer::from_path(path)?;

    let mut header = vec!["N".to_string()];
    header.extend(probs.iter().map(|p| format!("P_tail_p={}", p)));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.n.to_string()];
        record.extend(row.tails.iter().map(|t| t.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheoreticalStats {
    pub n: u64,
    pub p: f64,
    pub threshold: u64,
    pub expected_active: f64,
    pub max_supported_users: f64,
    pub prob_overload: f64,
}

impl TheoreticalStats {
    pub fn new(n: u64, p: f64, link_capacity_bps: f64, user_capacity_bps: f64) -> Self {
        let max_supported_users = link_capacity_bps / user_capacity_bps;
        let threshold = circuit_capacity(link_capacity_bps, user_capacity_bps);
        Self {
            n,
            p,
            threshold,
            expected_active: n as f64 * p,
            max_supported_users,
            prob_overload: binomial_tail(n, threshold, p),
        }
    }

    pub fn for_config(config: &SimConfig) -> Self {
        Self::new(
            config.num_users as u64,
            config.user_active_prob,
            config.link_capacity_bps,
            config.user_capacity_bps,
        )
    }

    pub fn overloaded_on_average(&self) -> bool {
        self.expected_active > self.threshold as f64
    }
}
