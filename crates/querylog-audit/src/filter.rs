//! Call-site filter.
//!
//! Decides from the filter matrix whether a call is audited. Groups and
//! operations match by exact equality; there are no wildcards.

use querylog_core::{CallSite, FilterMatrix, MatrixEntry};

/// Outcome of the call-site filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Log,
    Suppress,
}

impl Decision {
    fn from_flag(log: bool) -> Self {
        if log { Self::Log } else { Self::Suppress }
    }
}

/// Decide whether a call made from `site` is logged.
///
/// Untagged calls and groups absent from the matrix are logged. A
/// per-operation entry only decides for the operations it names; any other
/// operation of that group is logged.
pub fn decide(matrix: &FilterMatrix, site: Option<&CallSite>) -> Decision {
    let Some(site) = site else {
        return Decision::Log;
    };

    match matrix.get(&site.group) {
        None => Decision::Log,
        Some(MatrixEntry::Group(log)) => Decision::from_flag(*log),
        Some(MatrixEntry::Operations(ops)) => ops
            .get(&site.operation)
            .map(|log| Decision::from_flag(*log))
            .unwrap_or(Decision::Log),
    }
}
