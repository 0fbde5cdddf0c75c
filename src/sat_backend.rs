// SPDX-License-Identifier: Apache-2.0

//! CNF SAT backend over varisat.
//!
//! varisat supports incremental solving via `assume`/`solve`, which lets the
//! observed bits ride along as assumptions instead of baked-in unit clauses.
//! It has no native XOR-clause interface, so XOR factors use the four-clause
//! Tseitin form like everything else.

use std::collections::BTreeMap;

use varisat::{ExtendFormula, Lit};

use crate::error::Error;
use crate::gate::LogicGate;
use crate::solver::{Backend, Factor};

pub struct SatBackend<'a> {
    solver: varisat::Solver<'a>,
    num_vars: u32,
}

impl SatBackend<'_> {
    pub fn new() -> Self {
        SatBackend {
            solver: varisat::Solver::new(),
            num_vars: 0,
        }
    }

    fn lit(dimacs: i32) -> Lit {
        debug_assert!(dimacs != 0);
        Lit::from_dimacs(dimacs as isize)
    }
}

impl Default for SatBackend<'_> {
    fn default() -> Self {
        SatBackend::new()
    }
}

impl Backend for SatBackend<'_> {
    fn name(&self) -> &'static str {
        "sat"
    }

    fn initialize(&mut self, factors: &BTreeMap<u32, Factor>) -> Result<(), Error> {
        let mut num_clauses = 0usize;
        for factor in factors.values() {
            let gate = LogicGate::new(
                factor.kind,
                factor.output,
                factor.inputs.iter().map(|&i| i as i32).collect(),
            );
            for clause in gate.cnf() {
                let lits: Vec<Lit> = clause.iter().map(|&l| Self::lit(l)).collect();
                self.solver.add_clause(&lits);
                num_clauses += 1;
            }
            self.num_vars = self.num_vars.max(factor.output);
            for &input in &factor.inputs {
                self.num_vars = self.num_vars.max(input);
            }
        }
        log::debug!(
            "sat backend loaded {} clauses over {} variables",
            num_clauses,
            self.num_vars
        );
        Ok(())
    }

    fn solve_internal(
        &mut self,
        observed: &BTreeMap<u32, bool>,
    ) -> Result<BTreeMap<u32, bool>, Error> {
        let assumptions: Vec<Lit> = observed
            .iter()
            .map(|(&var, &val)| {
                let lit = var as i32;
                Self::lit(if val { lit } else { -lit })
            })
            .collect();
        self.solver.assume(&assumptions);

        match self.solver.solve() {
            Ok(true) => {
                let model = self
                    .solver
                    .model()
                    .ok_or_else(|| Error::SolverFailed("SAT result carried no model".into()))?;
                let mut assignment: BTreeMap<u32, bool> =
                    (1..=self.num_vars).map(|v| (v, false)).collect();
                for lit in model {
                    let var = lit.var().to_dimacs() as u32;
                    if var >= 1 && var <= self.num_vars {
                        assignment.insert(var, lit.is_positive());
                    }
                }
                Ok(assignment)
            }
            Ok(false) => Err(Error::UnsatInstance),
            Err(e) => Err(Error::SolverFailed(format!("{:?}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateKind;
    use crate::solver::{factors_from_gates, Solver};

    #[test]
    fn trivial_xor_preimage() {
        // y = a XOR b; observe y = 1 and a = 0, expect b = 1.
        let gates = vec![LogicGate::new(GateKind::Xor, 3, vec![1, 2])];
        let mut solver = Solver::new(SatBackend::new());
        solver.set_factors_from_gates(&gates).unwrap();
        solver.set_input_indices(&[1, 2]);
        solver.set_observed([(3, true), (1, false)].into());
        let model = solver.solve().unwrap();
        assert_eq!(model[&2], true);
        assert_eq!(model[&1], false);
        assert_eq!(model[&3], true);
    }

    #[test]
    fn unsat_observation_is_reported() {
        // 2 = NOT(1), 3 = AND(1, 2): the output is constant false, so
        // demanding it true is unsatisfiable at the clause level.
        let gates = vec![
            LogicGate::new(GateKind::Not, 2, vec![1]),
            LogicGate::new(GateKind::And, 3, vec![1, 2]),
        ];
        let mut backend = SatBackend::new();
        backend
            .initialize(&factors_from_gates(&gates).unwrap())
            .unwrap();
        let result = backend.solve_internal(&[(3, true)].into());
        assert!(matches!(result, Err(Error::UnsatInstance)));
    }

    #[test]
    fn model_covers_all_gate_variables() {
        let gates = vec![
            LogicGate::new(GateKind::Xor, 3, vec![1, 2]),
            LogicGate::new(GateKind::Or, 4, vec![3, 1]),
        ];
        let mut backend = SatBackend::new();
        let factors = factors_from_gates(&gates).unwrap();
        backend.initialize(&factors).unwrap();
        let model = backend.solve_internal(&BTreeMap::new()).unwrap();
        for v in 1..=4 {
            assert!(model.contains_key(&v));
        }
    }
}
