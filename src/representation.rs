// SPDX-License-Identifier: Apache-2.0

//! Canonical circuit representation: the gate list together with the hash
//! input and output bit indices.
//!
//! Construction prunes every gate that cannot reach an output and renumbers
//! the surviving variables densely from 1, inputs first, then each gate's
//! inputs before its output in emission order. That ordering keeps every
//! gate output index larger than its input indices, which the solver's
//! forward propagation and the BP variable schedule depend on.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cnf::Cnf;
use crate::error::Error;
use crate::gate::{GateKind, LogicGate};
use crate::ledger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymRepresentation {
    num_vars: u32,
    gates: Vec<LogicGate>,
    /// Hash input bit indices, LSB first; 0 marks a constant bit.
    input_indices: Vec<i32>,
    /// Hash output bit indices, LSB first; 0 marks a constant bit.
    output_indices: Vec<i32>,
}

impl SymRepresentation {
    pub fn new(
        gates: Vec<LogicGate>,
        input_indices: Vec<i32>,
        output_indices: Vec<i32>,
    ) -> SymRepresentation {
        let mut rep = SymRepresentation {
            num_vars: 0,
            gates,
            input_indices,
            output_indices,
        };
        rep.prune_unreachable_gates();
        rep.reindex();
        rep
    }

    /// Captures the current ledger contents as a canonical representation.
    pub fn from_ledger(input_indices: Vec<i32>, output_indices: Vec<i32>) -> SymRepresentation {
        SymRepresentation::new(ledger::gates(), input_indices, output_indices)
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn gates(&self) -> &[LogicGate] {
        &self.gates
    }

    pub fn input_indices(&self) -> &[i32] {
        &self.input_indices
    }

    pub fn output_indices(&self) -> &[i32] {
        &self.output_indices
    }

    pub fn to_cnf(&self) -> Cnf {
        Cnf::from_gates(&self.gates)
    }

    /// Drops every gate whose output cannot reach an output bit walking
    /// dependency edges backward.
    fn prune_unreachable_gates(&mut self) {
        let by_output: HashMap<u32, usize> = self
            .gates
            .iter()
            .enumerate()
            .map(|(i, g)| (g.output, i))
            .collect();

        let mut reachable: HashSet<u32> = HashSet::new();
        let mut worklist: Vec<u32> = self
            .output_indices
            .iter()
            .filter(|&&i| i != 0)
            .map(|&i| i.unsigned_abs())
            .collect();
        while let Some(var) = worklist.pop() {
            if !reachable.insert(var) {
                continue;
            }
            if let Some(&gate_idx) = by_output.get(&var) {
                for &lit in &self.gates[gate_idx].inputs {
                    worklist.push(lit.unsigned_abs());
                }
            }
        }

        self.gates.retain(|g| reachable.contains(&g.output));
    }

    /// Renumbers surviving variables densely to 1..num_vars and rewrites the
    /// gate list and both index lists. Input bits no longer referenced by
    /// any gate collapse to the constant marker 0.
    fn reindex(&mut self) {
        let mut used: HashSet<u32> = HashSet::new();
        for gate in &self.gates {
            used.insert(gate.output);
            for &lit in &gate.inputs {
                used.insert(lit.unsigned_abs());
            }
        }

        let mut mapping: HashMap<u32, u32> = HashMap::new();
        let mut next = 1u32;
        let mut assign = |var: u32, mapping: &mut HashMap<u32, u32>, next: &mut u32| {
            if var != 0 && !mapping.contains_key(&var) {
                mapping.insert(var, *next);
                *next += 1;
            }
        };

        for &idx in &self.input_indices {
            let var = idx.unsigned_abs();
            if used.contains(&var) {
                assign(var, &mut mapping, &mut next);
            }
        }
        for gate in &self.gates {
            for &lit in &gate.inputs {
                assign(lit.unsigned_abs(), &mut mapping, &mut next);
            }
            assign(gate.output, &mut mapping, &mut next);
        }

        let map_lit = |lit: i32, mapping: &HashMap<u32, u32>| -> i32 {
            if lit == 0 {
                return 0;
            }
            match mapping.get(&lit.unsigned_abs()) {
                Some(&new) => {
                    if lit < 0 {
                        -(new as i32)
                    } else {
                        new as i32
                    }
                }
                None => 0,
            }
        };

        let mut seen_outputs: HashSet<u32> = HashSet::new();
        for gate in &mut self.gates {
            let new_output = mapping[&gate.output];
            assert!(
                seen_outputs.insert(new_output),
                "variable {} is produced by more than one gate",
                new_output
            );
            gate.output = new_output;
            for lit in &mut gate.inputs {
                let mapped = map_lit(*lit, &mapping);
                assert!(mapped != 0, "gate input literal vanished during reindex");
                *lit = mapped;
            }
        }
        for idx in &mut self.input_indices {
            *idx = map_lit(*idx, &mapping);
        }
        for idx in &mut self.output_indices {
            *idx = map_lit(*idx, &mapping);
        }

        self.num_vars = next - 1;
    }

    /// Plain-text DAG export: header with the variable count, the two index
    /// lists, then one gate per line (`kind output input-literals...`).
    pub fn write_dag(&self, path: &Path) -> Result<(), Error> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "dag {} {}", self.num_vars, self.gates.len())?;
        writeln!(w, "inputs{}", join_indices(&self.input_indices))?;
        writeln!(w, "outputs{}", join_indices(&self.output_indices))?;
        for gate in &self.gates {
            write!(w, "{} {}", gate.kind.token(), gate.output)?;
            for lit in &gate.inputs {
                write!(w, " {}", lit)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }

    /// Parses a file produced by [`SymRepresentation::write_dag`]; the
    /// result is re-canonicalized, so parsing is idempotent over writing.
    pub fn read_dag(path: &Path) -> Result<SymRepresentation, Error> {
        let text = std::fs::read_to_string(path)?;
        let mut lines = text.lines();

        let header = lines
            .next()
            .ok_or_else(|| Error::MalformedDag("empty file".into()))?;
        let mut fields = header.split_whitespace();
        if fields.next() != Some("dag") {
            return Err(Error::MalformedDag("missing dag header".into()));
        }
        let _num_vars: u32 = parse_field(fields.next(), "num_vars")?;
        let num_gates: usize = parse_field(fields.next(), "num_gates")?;

        let input_indices = parse_index_line(lines.next(), "inputs")?;
        let output_indices = parse_index_line(lines.next(), "outputs")?;

        let mut gates = Vec::with_capacity(num_gates);
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let token = fields
                .next()
                .and_then(|t| t.chars().next())
                .ok_or_else(|| Error::MalformedDag("missing gate kind token".into()))?;
            let kind = GateKind::from_token(token)
                .ok_or_else(|| Error::MalformedDag(format!("unknown gate token {:?}", token)))?;
            let output: u32 = parse_field(fields.next(), "gate output")?;
            let inputs = fields
                .map(|f| {
                    f.parse::<i32>()
                        .map_err(|_| Error::MalformedDag(format!("bad literal {:?}", f)))
                })
                .collect::<Result<Vec<i32>, Error>>()?;
            if inputs.len() != kind.arity() {
                return Err(Error::MalformedDag(format!(
                    "gate {} has {} inputs, expected {}",
                    output,
                    inputs.len(),
                    kind.arity()
                )));
            }
            if output == 0 || inputs.iter().any(|&l| l == 0 || l.unsigned_abs() == output) {
                return Err(Error::MalformedDag(format!(
                    "gate {} has an invalid literal",
                    output
                )));
            }
            gates.push(LogicGate {
                kind,
                output,
                inputs,
            });
        }
        if gates.len() != num_gates {
            return Err(Error::MalformedDag(format!(
                "header promised {} gates, found {}",
                num_gates,
                gates.len()
            )));
        }

        Ok(SymRepresentation::new(gates, input_indices, output_indices))
    }

    /// DIMACS CNF export of the gate list.
    pub fn write_cnf(&self, path: &Path) -> Result<(), Error> {
        self.to_cnf().write(path)
    }

    /// LP-format 0/1 integer program; one constraint group per gate with
    /// negated literals substituted as `1 - x`.
    pub fn write_mip(&self, path: &Path) -> Result<(), Error> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "\\ 0/1 program over {} variables", self.num_vars)?;
        writeln!(w, "Minimize")?;
        writeln!(w, " obj: 0")?;
        writeln!(w, "Subject To")?;
        let mut row = 0usize;
        for gate in &self.gates {
            let y = gate.output as i32;
            let x = &gate.inputs;
            let mut constraint = |terms: &[(i64, i32)], cmp: &str, rhs: i64| {
                row += 1;
                write_lp_row(&mut w, row, terms, cmp, rhs)
            };
            match gate.kind {
                GateKind::Not => {
                    constraint(&[(1, y), (1, x[0])], "=", 1)?;
                }
                GateKind::And => {
                    constraint(&[(1, y), (-1, x[0])], "<=", 0)?;
                    constraint(&[(1, y), (-1, x[1])], "<=", 0)?;
                    constraint(&[(1, y), (-1, x[0]), (-1, x[1])], ">=", -1)?;
                }
                GateKind::Or => {
                    constraint(&[(1, y), (-1, x[0])], ">=", 0)?;
                    constraint(&[(1, y), (-1, x[1])], ">=", 0)?;
                    constraint(&[(1, y), (-1, x[0]), (-1, x[1])], "<=", 0)?;
                }
                GateKind::Xor => {
                    constraint(&[(1, y), (-1, x[0]), (-1, x[1])], "<=", 0)?;
                    constraint(&[(1, y), (-1, x[0]), (1, x[1])], ">=", 0)?;
                    constraint(&[(1, y), (1, x[0]), (-1, x[1])], ">=", 0)?;
                    constraint(&[(1, y), (1, x[0]), (1, x[1])], "<=", 2)?;
                }
                GateKind::Maj3 => {
                    for i in 0..3 {
                        for j in (i + 1)..3 {
                            constraint(&[(1, y), (-1, x[i]), (-1, x[j])], ">=", -1)?;
                            constraint(&[(1, y), (-1, x[i]), (-1, x[j])], "<=", 0)?;
                        }
                    }
                }
            }
        }
        writeln!(w, "Binary")?;
        for v in 1..=self.num_vars {
            write!(w, " x{}", v)?;
        }
        writeln!(w)?;
        writeln!(w, "End")?;
        Ok(())
    }

    /// DIMACS graph export: vertices are variables; each gate contributes
    /// edges from its output to each input and between inputs pairwise.
    pub fn write_graph_coloring(&self, path: &Path) -> Result<(), Error> {
        let mut edges: BTreeSet<(u32, u32)> = BTreeSet::new();
        let mut add = |a: u32, b: u32| {
            if a != b {
                edges.insert((a.min(b), a.max(b)));
            }
        };
        for gate in &self.gates {
            let inputs: Vec<u32> = gate.inputs.iter().map(|l| l.unsigned_abs()).collect();
            for (i, &a) in inputs.iter().enumerate() {
                add(gate.output, a);
                for &b in &inputs[i + 1..] {
                    add(a, b);
                }
            }
        }
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "p edge {} {}", self.num_vars, edges.len())?;
        for (a, b) in edges {
            writeln!(w, "e {} {}", a, b)?;
        }
        Ok(())
    }
}

fn join_indices(indices: &[i32]) -> String {
    let mut s = String::new();
    for idx in indices {
        s.push(' ');
        s.push_str(&idx.to_string());
    }
    s
}

fn parse_field<T: std::str::FromStr>(field: Option<&str>, what: &str) -> Result<T, Error> {
    field
        .and_then(|f| f.parse::<T>().ok())
        .ok_or_else(|| Error::MalformedDag(format!("missing or bad {}", what)))
}

fn parse_index_line(line: Option<&str>, keyword: &str) -> Result<Vec<i32>, Error> {
    let line = line.ok_or_else(|| Error::MalformedDag(format!("missing {} line", keyword)))?;
    let mut fields = line.split_whitespace();
    if fields.next() != Some(keyword) {
        return Err(Error::MalformedDag(format!("expected {} line", keyword)));
    }
    fields
        .map(|f| {
            f.parse::<i32>()
                .map_err(|_| Error::MalformedDag(format!("bad index {:?}", f)))
        })
        .collect()
}

fn write_lp_row<W: Write>(
    w: &mut W,
    row: usize,
    terms: &[(i64, i32)],
    cmp: &str,
    rhs: i64,
) -> Result<(), Error> {
    // Substitute negated literals: coeff * (1 - x) shifts the constant side.
    let mut rhs = rhs;
    let mut rendered: Vec<(i64, u32)> = Vec::with_capacity(terms.len());
    for &(coeff, lit) in terms {
        if lit < 0 {
            rhs -= coeff;
            rendered.push((-coeff, lit.unsigned_abs()));
        } else {
            rendered.push((coeff, lit as u32));
        }
    }
    write!(w, " c{}:", row)?;
    for (i, (coeff, var)) in rendered.iter().enumerate() {
        let sign = if *coeff < 0 {
            " - "
        } else if i == 0 {
            " "
        } else {
            " + "
        };
        let magnitude = coeff.abs();
        if magnitude == 1 {
            write!(w, "{}x{}", sign, var)?;
        } else {
            write!(w, "{}{} x{}", sign, magnitude, var)?;
        }
    }
    writeln!(w, " {} {}", cmp, rhs)?;
    Ok(())
}
