// SPDX-License-Identifier: Apache-2.0

//! A single symbolic bit: either a known constant or a distinct variable of
//! the output circuit.
//!
//! Operators fold constants aggressively; only an operation whose result is
//! genuinely unknown allocates a fresh variable and records a [`LogicGate`]
//! in the ledger. The concrete `value` is always maintained alongside so the
//! frontend can check itself against a reference implementation.

use std::ops::{BitAnd, BitOr, BitXor, Not};

use crate::gate::{GateKind, LogicGate};
use crate::ledger;

/// Reserved index carried by constant (non-variable) bits.
pub const CONSTANT_INDEX: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolicBit {
    pub value: bool,
    pub is_variable: bool,
    pub index: u32,
}

impl SymbolicBit {
    pub fn constant(value: bool) -> SymbolicBit {
        SymbolicBit {
            value,
            is_variable: false,
            index: CONSTANT_INDEX,
        }
    }

    /// Allocates a fresh variable bit from the ledger.
    pub fn variable(value: bool) -> SymbolicBit {
        ledger::new_variable(value)
    }

    /// The bit as a positive DIMACS literal. Constants have no literal.
    pub fn literal(self) -> i32 {
        debug_assert!(self.is_variable, "constant bits have no literal");
        self.index as i32
    }

    fn emit(kind: GateKind, value: bool, inputs: Vec<i32>) -> SymbolicBit {
        let out = SymbolicBit::variable(value);
        ledger::record_gate(LogicGate::new(kind, out.index, inputs));
        out
    }

    /// Full adder: returns `(sum, carry_out)` with
    /// `sum = a ^ b ^ carry_in` and
    /// `carry_out = (a & b) | (carry_in & (a ^ b))`.
    pub fn full_add(a: SymbolicBit, b: SymbolicBit, carry_in: SymbolicBit) -> (SymbolicBit, SymbolicBit) {
        let a_xor_b = a ^ b;
        let sum = a_xor_b ^ carry_in;
        let carry_out = (a & b) | (carry_in & a_xor_b);
        (sum, carry_out)
    }

    /// Shorthand for [`SymbolicBit::full_add`] with a zero carry-in.
    pub fn half_add(a: SymbolicBit, b: SymbolicBit) -> (SymbolicBit, SymbolicBit) {
        SymbolicBit::full_add(a, b, SymbolicBit::constant(false))
    }

    /// Three-way majority, emitted as a single MAJ3 gate when all operands
    /// are variables.
    pub fn majority3(a: SymbolicBit, b: SymbolicBit, c: SymbolicBit) -> SymbolicBit {
        let operands = [a, b, c];
        let constants: Vec<bool> = operands
            .iter()
            .filter(|o| !o.is_variable)
            .map(|o| o.value)
            .collect();
        let variables: Vec<SymbolicBit> =
            operands.iter().filter(|o| o.is_variable).copied().collect();
        match constants.len() {
            0 => {
                let value = [a.value, b.value, c.value].iter().filter(|&&v| v).count() >= 2;
                SymbolicBit::emit(
                    GateKind::Maj3,
                    value,
                    vec![a.literal(), b.literal(), c.literal()],
                )
            }
            // MAJ(x, y, 1) = x | y and MAJ(x, y, 0) = x & y.
            1 => {
                if constants[0] {
                    variables[0] | variables[1]
                } else {
                    variables[0] & variables[1]
                }
            }
            // Two equal constants decide the vote outright; two opposing
            // constants leave the variable as the tiebreaker.
            2 => {
                if constants[0] == constants[1] {
                    SymbolicBit::constant(constants[0])
                } else {
                    variables[0]
                }
            }
            _ => SymbolicBit::constant(constants.iter().filter(|&&v| v).count() >= 2),
        }
    }
}

impl Not for SymbolicBit {
    type Output = SymbolicBit;

    fn not(self) -> SymbolicBit {
        if !self.is_variable {
            return SymbolicBit::constant(!self.value);
        }
        SymbolicBit::emit(GateKind::Not, !self.value, vec![self.literal()])
    }
}

impl BitAnd for SymbolicBit {
    type Output = SymbolicBit;

    fn bitand(self, rhs: SymbolicBit) -> SymbolicBit {
        if !self.is_variable && !self.value {
            return SymbolicBit::constant(false);
        }
        if !rhs.is_variable && !rhs.value {
            return SymbolicBit::constant(false);
        }
        if !self.is_variable {
            return rhs; // self is constant 1
        }
        if !rhs.is_variable {
            return self; // rhs is constant 1
        }
        SymbolicBit::emit(
            GateKind::And,
            self.value & rhs.value,
            vec![self.literal(), rhs.literal()],
        )
    }
}

impl BitOr for SymbolicBit {
    type Output = SymbolicBit;

    fn bitor(self, rhs: SymbolicBit) -> SymbolicBit {
        if !self.is_variable && self.value {
            return SymbolicBit::constant(true);
        }
        if !rhs.is_variable && rhs.value {
            return SymbolicBit::constant(true);
        }
        if !self.is_variable {
            return rhs; // self is constant 0
        }
        if !rhs.is_variable {
            return self; // rhs is constant 0
        }
        SymbolicBit::emit(
            GateKind::Or,
            self.value | rhs.value,
            vec![self.literal(), rhs.literal()],
        )
    }
}

impl BitXor for SymbolicBit {
    type Output = SymbolicBit;

    fn bitxor(self, rhs: SymbolicBit) -> SymbolicBit {
        if !self.is_variable {
            return if self.value { !rhs } else { rhs };
        }
        if !rhs.is_variable {
            return if rhs.value { !self } else { self };
        }
        SymbolicBit::emit(
            GateKind::Xor,
            self.value ^ rhs.value,
            vec![self.literal(), rhs.literal()],
        )
    }
}
