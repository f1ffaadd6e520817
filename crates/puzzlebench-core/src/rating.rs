//! Glicko-2 rating tracking.
//!
//! The tracker is the one piece of cross-puzzle shared mutable state in the
//! engine. `absorb` is a stateful, order-dependent fold: each call rates
//! against the triple produced by the previous call, so callers must apply
//! updates one at a time, in completion order, never concurrently. The batch
//! orchestrator guarantees this by funneling all mutations through its
//! single completion handler.

use serde::{Deserialize, Serialize};

/// Glicko-2 internal scale factor.
const GLICKO2_SCALE: f64 = 173.7178;

/// Rating the scale is centred on.
const BASE_RATING: f64 = 1500.0;

/// Convergence tolerance for the volatility iteration.
const CONVERGENCE_TOLERANCE: f64 = 1e-6;

/// Default system constant constraining volatility change over time.
pub const DEFAULT_TAU: f64 = 0.5;

/// An agent's estimated skill and its uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingTriple {
    pub rating: f64,
    pub deviation: f64,
    pub volatility: f64,
}

impl Default for RatingTriple {
    /// Standard unrated-player starting point.
    fn default() -> Self {
        Self {
            rating: 1500.0,
            deviation: 350.0,
            volatility: 0.06,
        }
    }
}

/// One rated result: the opponent's strength and whether the agent won.
///
/// For puzzle evaluation the "opponent" is the puzzle itself, rated by its
/// difficulty.
#[derive(Debug, Clone, Copy)]
pub struct GameScore {
    pub opponent_rating: f64,
    pub opponent_deviation: f64,
    pub won: bool,
}

/// Mutable rating state with a batch update operation.
pub trait RatingTracker: Send {
    /// The current rating triple.
    fn current(&self) -> RatingTriple;

    /// Absorb a batch of game outcomes, mutating the triple in place.
    ///
    /// An empty batch still inflates the deviation (a rating period without
    /// play increases uncertainty).
    fn absorb(&mut self, scores: &[GameScore]);
}

/// Glicko-2 implementation of [`RatingTracker`] (Glickman's algorithm).
#[derive(Debug, Clone)]
pub struct Glicko2Tracker {
    triple: RatingTriple,
    tau: f64,
}

impl Glicko2Tracker {
    pub fn new(initial: RatingTriple) -> Self {
        Self {
            triple: initial,
            tau: DEFAULT_TAU,
        }
    }

    /// Override the system constant τ.
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }
}

impl RatingTracker for Glicko2Tracker {
    fn current(&self) -> RatingTriple {
        self.triple
    }

    fn absorb(&mut self, scores: &[GameScore]) {
        let mu = (self.triple.rating - BASE_RATING) / GLICKO2_SCALE;
        let phi = self.triple.deviation / GLICKO2_SCALE;
        let sigma = self.triple.volatility;

        if scores.is_empty() {
            let phi_star = (phi * phi + sigma * sigma).sqrt();
            self.triple.deviation = phi_star * GLICKO2_SCALE;
            return;
        }

        // Estimated variance (v) and improvement sum over the batch.
        let mut v_inv = 0.0;
        let mut improvement_sum = 0.0;
        for score in scores {
            let mu_j = (score.opponent_rating - BASE_RATING) / GLICKO2_SCALE;
            let phi_j = score.opponent_deviation / GLICKO2_SCALE;
            let g = g(phi_j);
            let e = expectation(mu, mu_j, g);
            let outcome = if score.won { 1.0 } else { 0.0 };
            v_inv += g * g * e * (1.0 - e);
            improvement_sum += g * (outcome - e);
        }
        let v = 1.0 / v_inv;
        let delta = v * improvement_sum;

        let sigma_prime = new_volatility(sigma, delta, phi, v, self.tau);
        let phi_star = (phi * phi + sigma_prime * sigma_prime).sqrt();
        let phi_prime = 1.0 / (1.0 / (phi_star * phi_star) + 1.0 / v).sqrt();
        let mu_prime = mu + phi_prime * phi_prime * improvement_sum;

        self.triple = RatingTriple {
            rating: BASE_RATING + GLICKO2_SCALE * mu_prime,
            deviation: GLICKO2_SCALE * phi_prime,
            volatility: sigma_prime,
        };
    }
}

fn g(phi: f64) -> f64 {
    1.0 / (1.0 + 3.0 * phi * phi / (std::f64::consts::PI * std::f64::consts::PI)).sqrt()
}

fn expectation(mu: f64, mu_j: f64, g_phi_j: f64) -> f64 {
    1.0 / (1.0 + (-g_phi_j * (mu - mu_j)).exp())
}

/// Volatility update: Illinois-variant regula falsi on Glickman's f(x).
fn new_volatility(sigma: f64, delta: f64, phi: f64, v: f64, tau: f64) -> f64 {
    let a = (sigma * sigma).ln();
    let f = |x: f64| {
        let ex = x.exp();
        let num = ex * (delta * delta - phi * phi - v - ex);
        let den = 2.0 * (phi * phi + v + ex) * (phi * phi + v + ex);
        num / den - (x - a) / (tau * tau)
    };

    let mut big_a = a;
    let mut big_b = if delta * delta > phi * phi + v {
        (delta * delta - phi * phi - v).ln()
    } else {
        let mut k = 1.0;
        while f(a - k * tau) < 0.0 {
            k += 1.0;
        }
        a - k * tau
    };

    let mut f_a = f(big_a);
    let mut f_b = f(big_b);
    while (big_b - big_a).abs() > CONVERGENCE_TOLERANCE {
        let big_c = big_a + (big_a - big_b) * f_a / (f_b - f_a);
        let f_c = f(big_c);
        if f_c * f_b <= 0.0 {
            big_a = big_b;
            f_a = f_b;
        } else {
            f_a /= 2.0;
        }
        big_b = big_c;
        f_b = f_c;
    }
    (big_a / 2.0).exp()
}
