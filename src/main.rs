// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};

use unhash::bp::params::BpParams;
use unhash::bp::BpBackend;
use unhash::hash::SymHash;
use unhash::ledger;
use unhash::md5::Md5;
use unhash::representation::SymRepresentation;
use unhash::sat_backend::SatBackend;
use unhash::sha256::Sha256;
use unhash::solver::{factors_from_gates, Solver};
use unhash::sym_bit_vec::SymBitVec;

/// Lifts a hash function into a gate circuit and searches for a preimage of
/// the resulting digest.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Hash function to lift (md5 | sha256).
    #[arg(long, default_value = "md5")]
    hash: String,

    /// Input message as hex bytes; a random message is generated otherwise.
    #[arg(long)]
    input_hex: Option<String>,

    /// Number of random input bytes when no message is given.
    #[arg(long, default_value_t = 8)]
    random_bytes: usize,

    /// RNG seed for the random message.
    #[arg(long)]
    seed: Option<u64>,

    /// Solver backend (sat | bp | none).
    #[arg(long, default_value = "sat")]
    solver: String,

    /// Write the circuit as DIMACS CNF.
    #[arg(long)]
    cnf_out: Option<PathBuf>,

    /// Write the circuit as a plain-text gate DAG.
    #[arg(long)]
    dag_out: Option<PathBuf>,

    /// Write the circuit as an LP-format 0/1 program.
    #[arg(long)]
    mip_out: Option<PathBuf>,

    /// Write the circuit as a DIMACS graph-coloring instance.
    #[arg(long)]
    coloring_out: Option<PathBuf>,

    /// Maximum belief-propagation sweeps.
    #[arg(long, default_value_t = 250)]
    bp_max_iter: usize,

    /// Belief-propagation damping factor in [0, 1).
    #[arg(long, default_value_t = 0.5)]
    bp_damping: f64,

    /// Stop once the summed marginal entropy falls below this.
    #[arg(long, default_value_t = 1e-2)]
    bp_entropy_threshold: f64,

    /// Stop once the largest belief change per sweep falls below this.
    #[arg(long, default_value_t = 1e-4)]
    bp_change_threshold: f64,
}

fn parse_hex_bytes(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        bail!("--input-hex must have an even number of digits");
    }
    (0..hex.len() / 2)
        .map(|i| {
            u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
                .map_err(|_| anyhow!("bad hex byte {:?}", &hex[2 * i..2 * i + 2]))
        })
        .collect()
}

fn build_hasher(name: &str) -> Result<Box<dyn SymHash>> {
    match name {
        "md5" => Ok(Box::new(Md5::new())),
        "sha256" => Ok(Box::new(Sha256::new())),
        other => bail!("unknown hash {:?} (expected md5 or sha256)", other),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let message: Vec<u8> = match &args.input_hex {
        Some(hex) => parse_hex_bytes(hex)?,
        None => {
            let mut rng = match args.seed {
                Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
                None => rand::rngs::StdRng::from_entropy(),
            };
            (0..args.random_bytes).map(|_| rng.gen()).collect()
        }
    };

    // Symbolic execution: every message bit becomes a circuit variable.
    ledger::reset();
    let input = SymBitVec::from_bytes(&message, true);
    let mut hasher = build_hasher(&args.hash)?;
    let digest = hasher
        .hash(&input)
        .with_context(|| format!("lifting {} failed", hasher.name()))?;
    log::info!(
        "{} of {} message bytes: {} ({} gates over {} variables)",
        hasher.name(),
        message.len(),
        digest.hex(),
        ledger::num_gates(),
        ledger::num_variables()
    );

    let rep = SymRepresentation::from_ledger(input.variable_indices(), digest.variable_indices());
    println!(
        "circuit: {} gates, {} variables, digest {}",
        rep.gates().len(),
        rep.num_vars(),
        digest.hex()
    );

    if let Some(path) = &args.cnf_out {
        rep.write_cnf(path).context("writing CNF export")?;
        println!("wrote CNF to {}", path.display());
    }
    if let Some(path) = &args.dag_out {
        rep.write_dag(path).context("writing DAG export")?;
        println!("wrote DAG to {}", path.display());
    }
    if let Some(path) = &args.mip_out {
        rep.write_mip(path).context("writing MIP export")?;
        println!("wrote MIP to {}", path.display());
    }
    if let Some(path) = &args.coloring_out {
        rep.write_graph_coloring(path)
            .context("writing graph-coloring export")?;
        println!("wrote graph coloring to {}", path.display());
    }

    if args.solver == "none" {
        return Ok(());
    }

    // Observe the digest bits that are circuit variables.
    let digest_bits = digest.bits();
    let observed: BTreeMap<u32, bool> = rep
        .output_indices()
        .iter()
        .enumerate()
        .filter(|(_, &idx)| idx > 0)
        .map(|(bit, &idx)| (idx as u32, digest_bits[bit]))
        .collect();

    let factors = factors_from_gates(rep.gates())?;
    let model = match args.solver.as_str() {
        "sat" => {
            let mut solver = Solver::new(SatBackend::new());
            solver.set_factors(factors);
            solver.set_input_indices(rep.input_indices());
            solver.set_observed(observed);
            solver.solve()?
        }
        "bp" => {
            let params = BpParams {
                max_iter: args.bp_max_iter,
                damping: args.bp_damping,
                entropy_threshold: args.bp_entropy_threshold,
                change_threshold: args.bp_change_threshold,
                ..BpParams::default()
            };
            let mut solver = Solver::new(BpBackend::new(params));
            solver.set_factors(factors);
            solver.set_input_indices(rep.input_indices());
            solver.set_observed(observed);
            solver.solve()?
        }
        other => bail!("unknown solver {:?} (expected sat, bp, or none)", other),
    };

    // Reassemble the candidate preimage from the model.
    let mut preimage = Vec::with_capacity(message.len());
    for (byte_idx, chunk) in rep.input_indices().chunks(8).enumerate() {
        let mut byte = 0u8;
        for (bit, &idx) in chunk.iter().enumerate() {
            let value = if idx > 0 {
                model.get(&(idx as u32)).copied().unwrap_or(false)
            } else {
                // Bits pruned from the circuit are unconstrained.
                input.at(byte_idx * 8 + bit).value
            };
            if value {
                byte |= 1 << bit;
            }
        }
        preimage.push(byte);
    }

    // Verify by hashing the candidate concretely.
    ledger::reset();
    let mut hasher = build_hasher(&args.hash)?;
    let recovered_digest = hasher.hash(&SymBitVec::from_bytes(&preimage, false))?;
    let hex: String = preimage.iter().map(|b| format!("{:02x}", b)).collect();
    println!("candidate preimage: {}", hex);
    println!("candidate digest:   {}", recovered_digest.hex());
    if recovered_digest.hex() == digest.hex() {
        println!("preimage verified");
        Ok(())
    } else {
        bail!("candidate digest does not match the target")
    }
}
