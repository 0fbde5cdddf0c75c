// SPDX-License-Identifier: Apache-2.0

//! Canonical n-ary logic gates and their CNF expansion.
//!
//! A `LogicGate` relates one output variable to a list of input literals
//! (DIMACS convention: `+i` is variable `i`, `-i` its negation). The kinds
//! form a closed set, so consumers dispatch exhaustively on `GateKind`
//! rather than through a trait object.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GateKind {
    And,
    Or,
    Xor,
    Not,
    Maj3,
}

impl GateKind {
    pub fn arity(self) -> usize {
        match self {
            GateKind::Not => 1,
            GateKind::And | GateKind::Or | GateKind::Xor => 2,
            GateKind::Maj3 => 3,
        }
    }

    /// Single-character token used by the DAG text format.
    pub fn token(self) -> char {
        match self {
            GateKind::And => 'A',
            GateKind::Or => 'O',
            GateKind::Xor => 'X',
            GateKind::Not => 'N',
            GateKind::Maj3 => 'M',
        }
    }

    pub fn from_token(c: char) -> Option<GateKind> {
        match c {
            'A' => Some(GateKind::And),
            'O' => Some(GateKind::Or),
            'X' => Some(GateKind::Xor),
            'N' => Some(GateKind::Not),
            'M' => Some(GateKind::Maj3),
            _ => None,
        }
    }

    /// Boolean semantics of the gate on concrete input values.
    pub fn eval(self, inputs: &[bool]) -> bool {
        debug_assert_eq!(inputs.len(), self.arity(), "gate arity mismatch in eval");
        match self {
            GateKind::And => inputs.iter().all(|&b| b),
            GateKind::Or => inputs.iter().any(|&b| b),
            GateKind::Xor => inputs.iter().fold(false, |acc, &b| acc ^ b),
            GateKind::Not => !inputs[0],
            GateKind::Maj3 => inputs.iter().filter(|&&b| b).count() >= 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogicGate {
    pub kind: GateKind,
    /// Output variable index; always positive.
    pub output: u32,
    /// Input literals, signed.
    pub inputs: Vec<i32>,
}

impl LogicGate {
    pub fn new(kind: GateKind, output: u32, inputs: Vec<i32>) -> LogicGate {
        debug_assert!(output > 0, "gate output index must be positive");
        debug_assert_eq!(inputs.len(), kind.arity(), "gate input arity mismatch");
        debug_assert!(
            inputs.iter().all(|&lit| lit != 0),
            "gate input literal must be nonzero"
        );
        debug_assert!(
            inputs.iter().all(|&lit| lit.unsigned_abs() != output),
            "gate output {} appears among its own inputs",
            output
        );
        LogicGate {
            kind,
            output,
            inputs,
        }
    }

    /// Resolves a signed literal against a variable assignment.
    fn lit_value(lit: i32, assignment: &HashMap<u32, bool>) -> Option<bool> {
        assignment
            .get(&lit.unsigned_abs())
            .map(|&v| if lit < 0 { !v } else { v })
    }

    /// Evaluates the gate's output under `assignment`; `None` if any input
    /// variable is unassigned.
    pub fn eval(&self, assignment: &HashMap<u32, bool>) -> Option<bool> {
        let mut values = Vec::with_capacity(self.inputs.len());
        for &lit in &self.inputs {
            values.push(Self::lit_value(lit, assignment)?);
        }
        Some(self.kind.eval(&values))
    }

    /// Tseitin expansion: a clause set satisfied exactly by assignments where
    /// the output equals the gate function of the inputs.
    pub fn cnf(&self) -> Vec<Vec<i32>> {
        let y = self.output as i32;
        let x = &self.inputs;
        match self.kind {
            GateKind::Not => vec![vec![-y, -x[0]], vec![y, x[0]]],
            GateKind::And => vec![
                vec![-y, x[0]],
                vec![-y, x[1]],
                vec![y, -x[0], -x[1]],
            ],
            GateKind::Or => vec![
                vec![y, -x[0]],
                vec![y, -x[1]],
                vec![-y, x[0], x[1]],
            ],
            GateKind::Xor => vec![
                vec![-y, x[0], x[1]],
                vec![-y, -x[0], -x[1]],
                vec![y, -x[0], x[1]],
                vec![y, x[0], -x[1]],
            ],
            GateKind::Maj3 => {
                let mut clauses = Vec::with_capacity(6);
                for i in 0..3 {
                    for j in (i + 1)..3 {
                        clauses.push(vec![-y, x[i], x[j]]);
                        clauses.push(vec![y, -x[i], -x[j]]);
                    }
                }
                clauses
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause_sat(clause: &[i32], assignment: &HashMap<u32, bool>) -> bool {
        clause
            .iter()
            .any(|&lit| LogicGate::lit_value(lit, assignment) == Some(true))
    }

    /// The CNF expansion must be satisfied iff the gate semantics hold, for
    /// every assignment of the gate's variables.
    fn check_cnf_matches_semantics(kind: GateKind) {
        let arity = kind.arity();
        let inputs: Vec<i32> = (1..=arity as i32).collect();
        let output = (arity + 1) as u32;
        let gate = LogicGate::new(kind, output, inputs);
        let num_vars = arity + 1;
        for bits in 0..(1u32 << num_vars) {
            let mut assignment = HashMap::new();
            for v in 0..num_vars {
                assignment.insert((v + 1) as u32, (bits >> v) & 1 == 1);
            }
            let semantic = gate.eval(&assignment).unwrap() == assignment[&output];
            let cnf_sat = gate.cnf().iter().all(|c| clause_sat(c, &assignment));
            assert_eq!(
                semantic, cnf_sat,
                "CNF/semantics disagree for {:?} under assignment {:#b}",
                kind, bits
            );
        }
    }

    #[test]
    fn cnf_matches_semantics_all_kinds() {
        for kind in [
            GateKind::And,
            GateKind::Or,
            GateKind::Xor,
            GateKind::Not,
            GateKind::Maj3,
        ] {
            check_cnf_matches_semantics(kind);
        }
    }

    #[test]
    fn cnf_handles_negated_inputs() {
        // y = AND(-1, 2): satisfied iff y == (!x1 && x2).
        let gate = LogicGate::new(GateKind::And, 3, vec![-1, 2]);
        for bits in 0..8u32 {
            let mut assignment = HashMap::new();
            for v in 0..3 {
                assignment.insert((v + 1) as u32, (bits >> v) & 1 == 1);
            }
            let expected = !assignment[&1] && assignment[&2];
            let cnf_sat = gate.cnf().iter().all(|c| clause_sat(c, &assignment));
            assert_eq!(cnf_sat, assignment[&3] == expected);
        }
    }

    #[test]
    fn maj3_eval() {
        assert!(!GateKind::Maj3.eval(&[true, false, false]));
        assert!(GateKind::Maj3.eval(&[true, true, false]));
        assert!(GateKind::Maj3.eval(&[true, true, true]));
    }

    #[test]
    fn tokens_round_trip() {
        for kind in [
            GateKind::And,
            GateKind::Or,
            GateKind::Xor,
            GateKind::Not,
            GateKind::Maj3,
        ] {
            assert_eq!(GateKind::from_token(kind.token()), Some(kind));
        }
        assert_eq!(GateKind::from_token('Z'), None);
    }
}
