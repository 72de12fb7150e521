pub mod balance;
pub mod leave_request;
pub mod profile;
pub mod role;
pub mod session;

use std::str::FromStr;

use crate::error::LeaveError;

/// Parses a stored enum column, rejecting values outside the known set.
pub(crate) fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, LeaveError> {
    value
        .parse::<T>()
        .map_err(|_| LeaveError::validation(format!("unknown {column} value '{value}'")))
}
