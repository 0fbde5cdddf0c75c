// SPDX-License-Identifier: Apache-2.0

/// Tuning knobs for the sum-product schedule.
#[derive(Debug, Clone, Copy)]
pub struct BpParams {
    /// Maximum number of sweeps before giving up (non-fatal).
    pub max_iter: usize,
    /// Stop once the summed binary entropy of all marginals drops below
    /// this (nats).
    pub entropy_threshold: f64,
    /// Stop once the largest per-variable belief change in one sweep drops
    /// below this.
    pub change_threshold: f64,
    /// Convex mixing weight on the previous variable-to-factor message,
    /// in [0, 1).
    pub damping: f64,
    /// Prior bias: observed bits get the distribution [1-eps, eps] or
    /// [eps, 1-eps].
    pub epsilon: f64,
}

impl Default for BpParams {
    fn default() -> BpParams {
        BpParams {
            max_iter: 250,
            entropy_threshold: 1e-2,
            change_threshold: 1e-4,
            damping: 0.5,
            epsilon: 1e-4,
        }
    }
}
