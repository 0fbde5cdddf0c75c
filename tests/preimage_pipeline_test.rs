// SPDX-License-Identifier: Apache-2.0

//! Preimage recovery through the full pipeline: symbolic execution, circuit
//! capture, observation of the digest, and a solver backend.

use std::collections::BTreeMap;

use unhash::hash::SymHash;
use unhash::ledger;
use unhash::md5::Md5;
use unhash::representation::SymRepresentation;
use unhash::sat_backend::SatBackend;
use unhash::solver::{factors_from_gates, Solver};
use unhash::sym_bit_vec::SymBitVec;

fn observed_digest(rep: &SymRepresentation, digest: &SymBitVec) -> BTreeMap<u32, bool> {
    let bits = digest.bits();
    rep.output_indices()
        .iter()
        .enumerate()
        .filter(|(_, &idx)| idx > 0)
        .map(|(bit, &idx)| (idx as u32, bits[bit]))
        .collect()
}

#[test]
fn sat_recovers_single_byte_md5_preimage() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Lift MD5 over one unknown byte.
    ledger::reset();
    let input = SymBitVec::from_bytes(&[0x61], true);
    let digest = Md5::new().hash(&input).unwrap();
    let target_hex = digest.hex();
    let rep = SymRepresentation::from_ledger(input.variable_indices(), digest.variable_indices());

    let mut solver = Solver::new(SatBackend::new());
    solver.set_factors(factors_from_gates(rep.gates()).unwrap());
    solver.set_input_indices(rep.input_indices());
    solver.set_observed(observed_digest(&rep, &digest));
    let model = solver.solve().unwrap();

    // Reassemble the recovered byte and hash it concretely.
    let mut byte = 0u8;
    for (bit, &idx) in rep.input_indices().iter().enumerate() {
        let value = if idx > 0 {
            model.get(&(idx as u32)).copied().unwrap_or(false)
        } else {
            input.at(bit).value
        };
        if value {
            byte |= 1 << bit;
        }
    }
    ledger::reset();
    let recovered = Md5::new()
        .hash(&SymBitVec::from_bytes(&[byte], false))
        .unwrap();
    assert_eq!(recovered.hex(), target_hex);
}

#[test]
fn model_satisfies_every_clause_of_the_circuit() {
    ledger::reset();
    let input = SymBitVec::from_bytes(&[0x7e], true);
    let digest = Md5::new().hash(&input).unwrap();
    let rep = SymRepresentation::from_ledger(input.variable_indices(), digest.variable_indices());

    let mut solver = Solver::new(SatBackend::new());
    solver.set_factors(factors_from_gates(rep.gates()).unwrap());
    solver.set_input_indices(rep.input_indices());
    solver.set_observed(observed_digest(&rep, &digest));
    let model = solver.solve().unwrap();

    let cnf = rep.to_cnf();
    let by_lit: std::collections::HashMap<i32, bool> = model
        .iter()
        .map(|(&var, &val)| (var as i32, val))
        .collect();
    assert_eq!(cnf.num_sat_clauses(&by_lit), cnf.num_clauses());
}

#[test]
fn simplified_cnf_model_lifts_back_to_the_original() {
    ledger::reset();
    let v = SymBitVec::unknown(0b1100, 4);
    let w = SymBitVec::unknown(0b1010, 4);
    let out = &(&v ^ &w) | &(&v & &w);
    let rep = SymRepresentation::from_ledger(
        v.variable_indices()
            .into_iter()
            .chain(w.variable_indices())
            .collect(),
        out.variable_indices(),
    );
    let cnf = rep.to_cnf();

    // Pin the observed outputs, simplify, and solve what remains by brute
    // force over the reduced variable count.
    let out_bits = out.bits();
    let observed: std::collections::HashMap<i32, bool> = rep
        .output_indices()
        .iter()
        .enumerate()
        .filter(|(_, &idx)| idx > 0)
        .map(|(bit, &idx)| (idx, out_bits[bit]))
        .collect();
    let simplification = cnf.simplify(&observed).unwrap();
    let reduced = &simplification.simplified;
    assert!(reduced.num_vars <= cnf.num_vars);

    let n = reduced.num_vars as u32;
    assert!(n <= 16, "reduced problem should be tiny");
    let mut solved = None;
    'search: for bits in 0..(1u32 << n) {
        let model: std::collections::HashMap<i32, bool> =
            (1..=n).map(|v| (v as i32, (bits >> (v - 1)) & 1 == 1)).collect();
        if reduced.num_sat_clauses(&model) == reduced.num_clauses() {
            solved = Some(model);
            break 'search;
        }
    }
    let model = solved.expect("reduced CNF is satisfiable");
    let mut lifted = simplification.lift(&model);
    // Variables that vanished because every clause referencing them was
    // already satisfied are unconstrained; any value works.
    for v in 1..=cnf.num_vars {
        lifted.entry(v).or_insert(false);
    }
    assert_eq!(cnf.num_sat_clauses(&lifted), cnf.num_clauses());
}
