use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classes shared by every component.
///
/// Each crate keeps its own error enum; `kind()` on those enums maps a
/// concrete failure onto one of these classes so callers can branch on the
/// class without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or conflicting input (duplicate id, bad duration, unknown key).
    Validation,
    /// Caller lacks the capability for the operation.
    Authorization,
    /// Operation is not allowed in the current lifecycle phase.
    State,
    /// The operation cannot complete now and, at present, never will.
    TransientUnavailable,
    /// The balance ledger rejected a movement of funds.
    Ledger,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::State => "state",
            ErrorKind::TransientUnavailable => "transient-unavailable",
            ErrorKind::Ledger => "ledger",
        };
        f.write_str(name)
    }
}
