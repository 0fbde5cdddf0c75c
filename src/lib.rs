// SPDX-License-Identifier: Apache-2.0

//! Symbolic hash preimage analysis.
//!
//! The frontend executes a hash function (MD5, SHA-256) over symbolic bit
//! vectors, recording every elementary operation as a gate in a global
//! ledger. The canonicalized gate graph can be exported (DIMACS CNF, DAG,
//! MIP, graph coloring) or handed to a solver backend (CNF SAT via varisat
//! or sum-product belief propagation) to recover an input consistent with
//! an observed digest.

pub mod bit;
pub mod bp;
pub mod cnf;
pub mod error;
pub mod gate;
pub mod hash;
pub mod ledger;
pub mod md5;
pub mod representation;
pub mod sat_backend;
pub mod sha256;
pub mod solver;
pub mod sym_bit_vec;
