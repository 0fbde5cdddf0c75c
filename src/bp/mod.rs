// SPDX-License-Identifier: Apache-2.0

//! Belief-propagation backend: sum-product message passing over the factor
//! graph induced by the gate list, with damping and entropy/change-based
//! stopping.

pub mod factor;
pub mod graph;
pub mod params;

use std::collections::BTreeMap;

use crate::error::Error;
use crate::solver::{Backend, Factor};

use self::factor::BpFactorKind;
use self::graph::Graph;
use self::params::BpParams;

pub struct BpBackend {
    params: BpParams,
    graph: Graph,
}

impl BpBackend {
    pub fn new(params: BpParams) -> BpBackend {
        BpBackend {
            params,
            graph: Graph::new(params),
        }
    }
}

impl Default for BpBackend {
    fn default() -> BpBackend {
        BpBackend::new(BpParams::default())
    }
}

impl Backend for BpBackend {
    fn name(&self) -> &'static str {
        "bp"
    }

    fn initialize(&mut self, factors: &BTreeMap<u32, Factor>) -> Result<(), Error> {
        self.graph = Graph::new(self.params);
        for factor in factors.values() {
            self.graph
                .add_gate_factor(BpFactorKind::from(factor.kind), factor.output, &factor.inputs);
        }
        Ok(())
    }

    fn solve_internal(
        &mut self,
        observed: &BTreeMap<u32, bool>,
    ) -> Result<BTreeMap<u32, bool>, Error> {
        for (&var, &val) in observed {
            self.graph.add_prior(var, val, self.params.epsilon);
        }
        self.graph.init_messages();

        let mut converged = false;
        while self.graph.iterations() < self.params.max_iter {
            self.graph.sweep();
            let entropy = self.graph.entropy_sum();
            let change = self.graph.max_change();
            log::info!(
                "bp sweep {}/{}: entropy sum {:.4}, max change {:.4}",
                self.graph.iterations(),
                self.params.max_iter,
                entropy,
                change
            );
            if entropy < self.params.entropy_threshold {
                log::info!(
                    "entropy threshold reached ({:.4}) after sweep {}",
                    entropy,
                    self.graph.iterations()
                );
                converged = true;
                break;
            }
            if change < self.params.change_threshold {
                log::info!(
                    "change threshold reached ({:.4}) after sweep {}",
                    change,
                    self.graph.iterations()
                );
                converged = true;
                break;
            }
        }
        if !converged {
            // Budget exhaustion is not fatal; the current beliefs are still
            // the best available answer.
            log::warn!(
                "bp sweep budget ({}) exhausted without convergence",
                self.params.max_iter
            );
        }
        if self.graph.num_resets() > 0 {
            log::warn!("bp message resets: {}", self.graph.num_resets());
        }

        Ok(self.graph.decisions())
    }
}
