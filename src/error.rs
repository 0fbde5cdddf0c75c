// SPDX-License-Identifier: Apache-2.0

//! Crate-wide error type. Construction-time invariant violations inside the
//! bit algebra are programmer errors and assert instead; everything that can
//! be provoked by external data or an unsolvable instance surfaces here.

#[derive(Debug)]
pub enum Error {
    /// Circuit construction violation reachable from user input, e.g. a hash
    /// input that is not byte aligned or a deserialized gate with bad arity.
    Circuit(String),
    /// Implicit propagation derived two different values for one variable;
    /// the observed outputs are inconsistent with the circuit.
    InconsistentObservation { var: u32 },
    /// The SAT backend proved the instance unsatisfiable, or CNF
    /// simplification emptied a clause.
    UnsatInstance,
    /// The backend itself failed (not the instance).
    SolverFailed(String),
    /// A DAG file did not parse.
    MalformedDag(String),
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Circuit(msg) => write!(f, "circuit construction error: {}", msg),
            Error::InconsistentObservation { var } => {
                write!(f, "observed values are inconsistent at variable {}", var)
            }
            Error::UnsatInstance => write!(f, "instance is unsatisfiable"),
            Error::SolverFailed(msg) => write!(f, "solver failure: {}", msg),
            Error::MalformedDag(msg) => write!(f, "malformed DAG file: {}", msg),
            Error::Io(e) => write!(f, "i/o error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
