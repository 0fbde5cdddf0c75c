// SPDX-License-Identifier: Apache-2.0

//! Bipartite factor graph and the sum-product sweep.
//!
//! Storage is a flat edge table: variable nodes and factor nodes hold edge
//! indices, and each edge carries the two message distributions. That keeps
//! message updates index-addressed and makes the numeric reset path simple.

use std::collections::BTreeMap;

use super::factor::BpFactorKind;
use super::params::BpParams;

pub type Message = [f64; 2];

const UNIFORM: Message = [0.5, 0.5];

/// Both components below this means the message has underflowed.
const RESET_THRESHOLD: f64 = 1e-20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDir {
    Output,
    Input,
    Prior,
}

#[derive(Debug, Clone)]
struct Edge {
    var: u32,
    dir: EdgeDir,
    factor: usize,
    msg_v2f: Message,
    msg_f2v: Message,
}

#[derive(Debug, Clone)]
struct VarNode {
    edges: Vec<usize>,
    marginal: Message,
    prev_p1: f64,
    change: f64,
}

#[derive(Debug, Clone)]
struct FactorNode {
    kind: BpFactorKind,
    /// Edge ids; for gate kinds the output edge is first, inputs follow in
    /// gate order.
    edges: Vec<usize>,
    /// Fixed factor-to-variable message for `Prior` factors.
    bias: Option<Message>,
}

pub struct Graph {
    params: BpParams,
    edges: Vec<Edge>,
    /// Variable nodes keyed by index; iteration order doubles as the
    /// ascending variable schedule.
    var_nodes: BTreeMap<u32, VarNode>,
    factors: Vec<FactorNode>,
    /// Gate factors in construction order; priors are excluded, their
    /// messages never change.
    schedule_factor: Vec<usize>,
    iterations: usize,
    num_resets: u64,
}

impl Graph {
    pub fn new(params: BpParams) -> Graph {
        Graph {
            params,
            edges: Vec::new(),
            var_nodes: BTreeMap::new(),
            factors: Vec::new(),
            schedule_factor: Vec::new(),
            iterations: 0,
            num_resets: 0,
        }
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn num_resets(&self) -> u64 {
        self.num_resets
    }

    pub fn has_node(&self, var: u32) -> bool {
        self.var_nodes.contains_key(&var)
    }

    fn add_edge(&mut self, var: u32, factor: usize, dir: EdgeDir) {
        let eid = self.edges.len();
        self.edges.push(Edge {
            var,
            dir,
            factor,
            msg_v2f: UNIFORM,
            msg_f2v: UNIFORM,
        });
        self.var_nodes
            .entry(var)
            .or_insert_with(|| VarNode {
                edges: Vec::new(),
                marginal: UNIFORM,
                prev_p1: 0.5,
                change: 0.0,
            })
            .edges
            .push(eid);
        self.factors[factor].edges.push(eid);
    }

    pub fn add_gate_factor(&mut self, kind: BpFactorKind, output: u32, inputs: &[u32]) {
        debug_assert!(kind != BpFactorKind::Prior);
        let fi = self.factors.len();
        self.factors.push(FactorNode {
            kind,
            edges: Vec::new(),
            bias: None,
        });
        self.add_edge(output, fi, EdgeDir::Output);
        for &input in inputs {
            self.add_edge(input, fi, EdgeDir::Input);
        }
        self.schedule_factor.push(fi);
    }

    pub fn add_prior(&mut self, var: u32, value: bool, epsilon: f64) {
        let fi = self.factors.len();
        let bias = if value {
            [epsilon, 1.0 - epsilon]
        } else {
            [1.0 - epsilon, epsilon]
        };
        self.factors.push(FactorNode {
            kind: BpFactorKind::Prior,
            edges: Vec::new(),
            bias: Some(bias),
        });
        self.add_edge(var, fi, EdgeDir::Prior);
    }

    /// Uniform messages everywhere except the pinned prior distributions.
    pub fn init_messages(&mut self) {
        for eid in 0..self.edges.len() {
            let bias = self.factors[self.edges[eid].factor].bias;
            self.edges[eid].msg_v2f = UNIFORM;
            self.edges[eid].msg_f2v = bias.unwrap_or(UNIFORM);
        }
        self.iterations = 0;
    }

    /// One sweep: all factor-to-variable updates in factor-schedule order,
    /// then all variable-to-factor updates in ascending variable order, then
    /// a normalization pass and a marginal write-back.
    pub fn sweep(&mut self) {
        for si in 0..self.schedule_factor.len() {
            let fi = self.schedule_factor[si];
            self.update_factor(fi);
        }
        let vars: Vec<u32> = self.var_nodes.keys().copied().collect();
        for var in vars {
            self.update_variable(var);
        }
        self.norm();
        self.write_nodes();
        self.iterations += 1;
    }

    /// Exact sum-product update: for each connected variable, marginalize
    /// the gate indicator against the incoming messages of the others. The
    /// largest factor (MAJ3) connects four variables, so enumeration stays
    /// cheap.
    fn update_factor(&mut self, fi: usize) {
        let kind = self.factors[fi].kind;
        if kind == BpFactorKind::Prior {
            return;
        }
        let edge_ids = self.factors[fi].edges.clone();
        let k = edge_ids.len();
        debug_assert!(k <= 4, "gate factor connects at most 4 variables");
        debug_assert_eq!(
            self.edges[edge_ids[0]].dir,
            EdgeDir::Output,
            "gate factor edge 0 must be the output edge"
        );
        let incoming: Vec<Message> = edge_ids
            .iter()
            .map(|&e| normalized(self.edges[e].msg_v2f))
            .collect();

        for t in 0..k {
            let mut msg = [0.0f64; 2];
            for assignment in 0..(1u32 << k) {
                let mut vals = [false; 4];
                for (i, val) in vals.iter_mut().enumerate().take(k) {
                    *val = (assignment >> i) & 1 == 1;
                }
                if !kind.satisfied(vals[0], &vals[1..k]) {
                    continue;
                }
                let mut p = 1.0;
                for i in 0..k {
                    if i != t {
                        p *= incoming[i][vals[i] as usize];
                    }
                }
                msg[vals[t] as usize] += p;
            }
            self.edges[edge_ids[t]].msg_f2v = msg;
        }
    }

    /// Damped product update toward each neighboring factor.
    fn update_variable(&mut self, var: u32) {
        let edge_ids = self.var_nodes[&var].edges.clone();
        debug_assert!(
            edge_ids.iter().all(|&e| self.edges[e].var == var),
            "edge table out of sync with variable node {}",
            var
        );
        let incoming: Vec<Message> = edge_ids
            .iter()
            .map(|&e| normalized(self.edges[e].msg_f2v))
            .collect();
        let damping = self.params.damping;
        for (t, &eid) in edge_ids.iter().enumerate() {
            let mut product = [1.0f64, 1.0];
            for (i, m) in incoming.iter().enumerate() {
                if i != t {
                    product[0] *= m[0];
                    product[1] *= m[1];
                }
            }
            let fresh = self.normalize_or_reset(product);
            let old = self.edges[eid].msg_v2f;
            self.edges[eid].msg_v2f = [
                damping * old[0] + (1.0 - damping) * fresh[0],
                damping * old[1] + (1.0 - damping) * fresh[1],
            ];
        }
    }

    /// Normalizes every message in both directions, resetting any that have
    /// gone non-finite or underflowed.
    fn norm(&mut self) {
        for eid in 0..self.edges.len() {
            let v2f = self.normalize_or_reset(self.edges[eid].msg_v2f);
            let f2v = self.normalize_or_reset(self.edges[eid].msg_f2v);
            self.edges[eid].msg_v2f = v2f;
            self.edges[eid].msg_f2v = f2v;
        }
    }

    /// Recomputes each variable's marginal as the product of its incoming
    /// factor messages and records the per-sweep belief change.
    fn write_nodes(&mut self) {
        let vars: Vec<u32> = self.var_nodes.keys().copied().collect();
        for var in vars {
            let edge_ids = self.var_nodes[&var].edges.clone();
            let mut belief = [1.0f64, 1.0];
            for &eid in &edge_ids {
                let m = normalized(self.edges[eid].msg_f2v);
                belief[0] *= m[0];
                belief[1] *= m[1];
            }
            let belief = self.normalize_or_reset(belief);
            let node = self.var_nodes.get_mut(&var).unwrap();
            node.change = (belief[1] - node.prev_p1).abs();
            node.prev_p1 = belief[1];
            node.marginal = belief;
        }
    }

    fn normalize_or_reset(&mut self, m: Message) -> Message {
        let sum = m[0] + m[1];
        if !m[0].is_finite()
            || !m[1].is_finite()
            || sum <= 0.0
            || (m[0] < RESET_THRESHOLD && m[1] < RESET_THRESHOLD)
        {
            self.num_resets += 1;
            return UNIFORM;
        }
        [m[0] / sum, m[1] / sum]
    }

    /// Summed binary entropy of all marginals, in nats.
    pub fn entropy_sum(&self) -> f64 {
        self.var_nodes
            .values()
            .map(|n| binary_entropy(n.marginal[1]))
            .sum()
    }

    /// Largest per-variable belief change recorded in the last sweep.
    pub fn max_change(&self) -> f64 {
        self.var_nodes
            .values()
            .map(|n| n.change)
            .fold(0.0, f64::max)
    }

    pub fn marginal(&self, var: u32) -> Option<Message> {
        self.var_nodes.get(&var).map(|n| n.marginal)
    }

    /// Hard bit decisions for every variable node.
    pub fn decisions(&self) -> BTreeMap<u32, bool> {
        self.var_nodes
            .iter()
            .map(|(&var, node)| (var, node.marginal[1] > node.marginal[0]))
            .collect()
    }
}

fn normalized(m: Message) -> Message {
    let sum = m[0] + m[1];
    if sum > 0.0 && sum.is_finite() {
        [m[0] / sum, m[1] / sum]
    } else {
        UNIFORM
    }
}

fn binary_entropy(p: f64) -> f64 {
    let mut h = 0.0;
    for q in [p, 1.0 - p] {
        if q > 0.0 {
            h -= q * q.ln();
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_normalized() {
        let mut g = Graph::new(BpParams::default());
        g.add_gate_factor(BpFactorKind::Xor, 3, &[1, 2]);
        g.add_prior(3, true, 1e-4);
        g.add_prior(1, false, 1e-4);
        g.init_messages();
        for _ in 0..5 {
            g.sweep();
        }
        for edge in &g.edges {
            for m in [edge.msg_v2f, edge.msg_f2v] {
                assert!(m[0] >= 0.0 && m[0] <= 1.0);
                assert!(m[1] >= 0.0 && m[1] <= 1.0);
                assert!((m[0] + m[1] - 1.0).abs() < 1e-9);
            }
        }
        for (_, node) in &g.var_nodes {
            assert!((node.marginal[0] + node.marginal[1] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn entropy_drops_as_beliefs_harden() {
        let mut g = Graph::new(BpParams::default());
        g.add_gate_factor(BpFactorKind::Xor, 3, &[1, 2]);
        g.add_prior(3, true, 1e-4);
        g.add_prior(1, false, 1e-4);
        g.init_messages();
        g.sweep();
        let early = g.entropy_sum();
        for _ in 0..30 {
            g.sweep();
        }
        assert!(g.entropy_sum() < early);
    }

    #[test]
    fn binary_entropy_boundaries() {
        assert_eq!(binary_entropy(0.0), 0.0);
        assert_eq!(binary_entropy(1.0), 0.0);
        assert!((binary_entropy(0.5) - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
