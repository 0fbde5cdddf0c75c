// SPDX-License-Identifier: Apache-2.0

use crate::gate::GateKind;

/// Factor kinds in the probabilistic view of the circuit. Gate kinds map
/// one-to-one; `Prior` is the single-edge factor pinning an observed bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BpFactorKind {
    And,
    Or,
    Xor,
    Not,
    Maj,
    Prior,
}

impl From<GateKind> for BpFactorKind {
    fn from(kind: GateKind) -> BpFactorKind {
        match kind {
            GateKind::And => BpFactorKind::And,
            GateKind::Or => BpFactorKind::Or,
            GateKind::Xor => BpFactorKind::Xor,
            GateKind::Not => BpFactorKind::Not,
            GateKind::Maj3 => BpFactorKind::Maj,
        }
    }
}

impl BpFactorKind {
    /// Indicator function: does `output` together with `inputs` satisfy the
    /// gate relation?
    pub fn satisfied(self, output: bool, inputs: &[bool]) -> bool {
        match self {
            BpFactorKind::And => output == inputs.iter().all(|&b| b),
            BpFactorKind::Or => output == inputs.iter().any(|&b| b),
            BpFactorKind::Xor => output == inputs.iter().fold(false, |acc, &b| acc ^ b),
            BpFactorKind::Not => output == !inputs[0],
            BpFactorKind::Maj => output == (inputs.iter().filter(|&&b| b).count() >= 2),
            BpFactorKind::Prior => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_matches_gate_semantics() {
        assert!(BpFactorKind::And.satisfied(true, &[true, true]));
        assert!(!BpFactorKind::And.satisfied(true, &[true, false]));
        assert!(BpFactorKind::Xor.satisfied(false, &[true, true]));
        assert!(BpFactorKind::Not.satisfied(false, &[true]));
        assert!(BpFactorKind::Maj.satisfied(true, &[false, true, true]));
        assert!(BpFactorKind::Prior.satisfied(true, &[]));
    }
}
