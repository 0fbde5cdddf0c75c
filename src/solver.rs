// SPDX-License-Identifier: Apache-2.0

//! Common solving driver: holds the factors, the hash input indices, and
//! the observed bits, runs implicit propagation of known values through the
//! circuit, and delegates what remains to a backend.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::gate::{GateKind, LogicGate};

/// A gate as seen by the solvers: one output variable determined by a list
/// of input variables. The frontend only emits positive input literals (NOT
/// is its own gate kind), so inputs are plain indices here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    pub kind: GateKind,
    pub output: u32,
    pub inputs: Vec<u32>,
}

impl Factor {
    pub fn from_gate(gate: &LogicGate) -> Result<Factor, Error> {
        let mut inputs = Vec::with_capacity(gate.inputs.len());
        for &lit in &gate.inputs {
            if lit < 0 {
                return Err(Error::Circuit(format!(
                    "gate {} has negated input {}; solvers require NOT-normalized circuits",
                    gate.output, lit
                )));
            }
            inputs.push(lit as u32);
        }
        Ok(Factor {
            kind: gate.kind,
            output: gate.output,
            inputs,
        })
    }

    /// Output value under `observed`, if every input is observed.
    fn eval(&self, observed: &BTreeMap<u32, bool>) -> Option<bool> {
        let mut values = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            values.push(*observed.get(input)?);
        }
        Some(self.kind.eval(&values))
    }
}

/// Builds the solver view of a gate list, keyed by output index.
pub fn factors_from_gates(gates: &[LogicGate]) -> Result<BTreeMap<u32, Factor>, Error> {
    let mut factors = BTreeMap::new();
    for gate in gates {
        let factor = Factor::from_gate(gate)?;
        let previous = factors.insert(factor.output, factor);
        debug_assert!(
            previous.is_none(),
            "two factors share output {}",
            gate.output
        );
    }
    Ok(factors)
}

/// Backend capability set. `initialize` consumes the circuit; `solve` sees
/// the observation set after implicit propagation and returns a model
/// covering every gate variable.
pub trait Backend {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, factors: &BTreeMap<u32, Factor>) -> Result<(), Error>;

    fn solve_internal(
        &mut self,
        observed: &BTreeMap<u32, bool>,
    ) -> Result<BTreeMap<u32, bool>, Error>;
}

pub struct Solver<B> {
    backend: B,
    factors: BTreeMap<u32, Factor>,
    input_indices: Vec<u32>,
    observed: BTreeMap<u32, bool>,
}

impl<B: Backend> Solver<B> {
    pub fn new(backend: B) -> Solver<B> {
        Solver {
            backend,
            factors: BTreeMap::new(),
            input_indices: Vec::new(),
            observed: BTreeMap::new(),
        }
    }

    pub fn set_factors(&mut self, factors: BTreeMap<u32, Factor>) {
        self.factors = factors;
    }

    pub fn set_factors_from_gates(&mut self, gates: &[LogicGate]) -> Result<(), Error> {
        self.factors = factors_from_gates(gates)?;
        Ok(())
    }

    /// Hash input bit indices; zeros (constant bits) are ignored.
    pub fn set_input_indices(&mut self, indices: &[i32]) {
        self.input_indices = indices
            .iter()
            .filter(|&&i| i != 0)
            .map(|&i| i.unsigned_abs())
            .collect();
    }

    pub fn set_observed(&mut self, observed: BTreeMap<u32, bool>) {
        self.observed = observed;
    }

    pub fn observed(&self) -> &BTreeMap<u32, bool> {
        &self.observed
    }

    pub fn solve(&mut self) -> Result<BTreeMap<u32, bool>, Error> {
        self.set_implicit_observed()?;

        if !self.input_indices.is_empty()
            && self
                .input_indices
                .iter()
                .all(|i| self.observed.contains_key(i))
        {
            log::info!(
                "propagation pinned all {} input bits; skipping {}",
                self.input_indices.len(),
                self.backend.name()
            );
            return Ok(self.observed.clone());
        }

        self.backend.initialize(&self.factors)?;
        let mut model = self.backend.solve_internal(&self.observed)?;
        // Observed values are ground truth; propagation already proved them
        // consistent with the circuit.
        for (&var, &val) in &self.observed {
            model.insert(var, val);
        }
        Ok(model)
    }

    /// Propagates observed values backward then forward to a fixpoint,
    /// growing `observed` with every bit the circuit already determines.
    fn set_implicit_observed(&mut self) -> Result<(), Error> {
        let before = self.observed.len();
        let smallest = self.propagate_backward()?;
        if let Some(smallest) = smallest {
            self.propagate_forward(smallest)?;
        }
        log::debug!(
            "implicit propagation pinned {} additional bits",
            self.observed.len() - before
        );
        Ok(())
    }

    fn observe(&mut self, var: u32, val: bool) -> Result<bool, Error> {
        match self.observed.get(&var) {
            Some(&prev) if prev != val => Err(Error::InconsistentObservation { var }),
            Some(_) => Ok(false),
            None => {
                self.observed.insert(var, val);
                Ok(true)
            }
        }
    }

    /// Pins inputs of factors whose observed output value uniquely forces
    /// them: NOT always, AND with output 1, OR with output 0. Returns the
    /// smallest observed index after the fixpoint.
    fn propagate_backward(&mut self) -> Result<Option<u32>, Error> {
        loop {
            let mut forced: Vec<(u32, bool)> = Vec::new();
            for (output, factor) in &self.factors {
                let Some(&val) = self.observed.get(output) else {
                    continue;
                };
                match factor.kind {
                    GateKind::Not => forced.push((factor.inputs[0], !val)),
                    GateKind::And if val => {
                        forced.extend(factor.inputs.iter().map(|&i| (i, true)));
                    }
                    GateKind::Or if !val => {
                        forced.extend(factor.inputs.iter().map(|&i| (i, false)));
                    }
                    _ => {}
                }
            }
            let mut changed = false;
            for (var, val) in forced {
                changed |= self.observe(var, val)?;
            }
            if !changed {
                break;
            }
        }
        Ok(self.observed.keys().next().copied())
    }

    /// Walks variables upward from the smallest observed index, computing
    /// the output of every factor whose inputs are all observed.
    fn propagate_forward(&mut self, smallest: u32) -> Result<(), Error> {
        let outputs: Vec<u32> = self.factors.range(smallest..).map(|(&v, _)| v).collect();
        for output in outputs {
            let Some(val) = self.factors[&output].eval(&self.observed) else {
                continue;
            };
            self.observe(output, val)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that fails the test if it is ever reached.
    struct Unreachable;

    impl Backend for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }
        fn initialize(&mut self, _factors: &BTreeMap<u32, Factor>) -> Result<(), Error> {
            panic!("backend should have been bypassed");
        }
        fn solve_internal(
            &mut self,
            _observed: &BTreeMap<u32, bool>,
        ) -> Result<BTreeMap<u32, bool>, Error> {
            panic!("backend should have been bypassed");
        }
    }

    fn and_circuit() -> BTreeMap<u32, Factor> {
        // 3 = AND(1, 2)
        factors_from_gates(&[LogicGate::new(GateKind::And, 3, vec![1, 2])]).unwrap()
    }

    #[test]
    fn backward_propagation_solves_observed_and() {
        let mut solver = Solver::new(Unreachable);
        solver.set_factors(and_circuit());
        solver.set_input_indices(&[1, 2]);
        solver.set_observed([(3, true)].into());
        let model = solver.solve().unwrap();
        assert_eq!(model[&1], true);
        assert_eq!(model[&2], true);
        assert_eq!(model[&3], true);
    }

    #[test]
    fn backward_propagation_through_not_chain() {
        // 2 = NOT(1), 3 = NOT(2); observing 3 pins everything.
        let gates = vec![
            LogicGate::new(GateKind::Not, 2, vec![1]),
            LogicGate::new(GateKind::Not, 3, vec![2]),
        ];
        let mut solver = Solver::new(Unreachable);
        solver.set_factors_from_gates(&gates).unwrap();
        solver.set_input_indices(&[1]);
        solver.set_observed([(3, true)].into());
        let model = solver.solve().unwrap();
        assert_eq!(model[&1], true);
        assert_eq!(model[&2], false);
    }

    #[test]
    fn forward_propagation_computes_outputs() {
        // 3 = XOR(1, 2); observing both inputs determines the output.
        let gates = vec![LogicGate::new(GateKind::Xor, 3, vec![1, 2])];
        let mut solver = Solver::new(Unreachable);
        solver.set_factors_from_gates(&gates).unwrap();
        solver.set_input_indices(&[1, 2]);
        solver.set_observed([(1, true), (2, false)].into());
        let model = solver.solve().unwrap();
        assert_eq!(model[&3], true);
    }

    #[test]
    fn inconsistent_observation_is_fatal() {
        // 3 = AND(1, 2) with output observed true but an input observed
        // false cannot be satisfied.
        let mut solver = Solver::new(Unreachable);
        solver.set_factors(and_circuit());
        solver.set_input_indices(&[1, 2]);
        solver.set_observed([(3, true), (1, false)].into());
        assert!(matches!(
            solver.solve(),
            Err(Error::InconsistentObservation { var: 1 })
        ));
    }

    #[test]
    fn negated_gate_inputs_are_rejected() {
        let gate = LogicGate::new(GateKind::And, 3, vec![-1, 2]);
        assert!(matches!(Factor::from_gate(&gate), Err(Error::Circuit(_))));
    }
}
