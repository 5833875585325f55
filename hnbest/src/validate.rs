use hnbest_core::HnError;

const NOT_POSITIVE: &str = "Parameter 'n' must be a positive integer.";

/// Check a requested count against `[1, max_n]`.
///
/// # Errors
/// `HnError::InvalidArg` carrying the client-facing message.
pub fn check_count(n: i64, max_n: usize) -> Result<usize, HnError> {
    if n <= 0 {
        return Err(HnError::InvalidArg(NOT_POSITIVE.to_string()));
    }
    match usize::try_from(n) {
        Ok(n) if n <= max_n => Ok(n),
        _ => Err(HnError::InvalidArg(format!(
            "Parameter 'n' must be <= {max_n}."
        ))),
    }
}

/// Parse the raw `n` query value. A missing or blank value means `default_n`.
///
/// # Errors
/// `HnError::InvalidArg` when the value is not an integer or falls outside
/// `[1, max_n]`.
pub fn parse_count(raw: Option<&str>, default_n: usize, max_n: usize) -> Result<usize, HnError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default_n);
    };
    let n: i64 = raw
        .parse()
        .map_err(|_| HnError::InvalidArg(NOT_POSITIVE.to_string()))?;
    check_count(n, max_n)
}
