//! Errors returned by the breakers.
//!
//! Infeasible breaks are not errors: they are reported as
//!     [Diagnostic](crate::diagnostics::Diagnostic) values attached to the output.

/// Error returned by the paragraph and page breakers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The list is longer than [Params::max_list_len](crate::Params::max_list_len).
    #[error("list of {len} nodes exceeds the budget of {max} nodes")]
    NodeBudgetExceeded { len: usize, max: usize },

    /// A typesetting parameter has a value the breakers can't work with.
    #[error("invalid value for parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn check_budget(len: usize, max: usize) -> Result<()> {
    if len > max {
        log::debug!("refusing to break a list of {len} nodes");
        return Err(Error::NodeBudgetExceeded { len, max });
    }
    Ok(())
}
