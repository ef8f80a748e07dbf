use ulid::Ulid;

/// Generates a new ULID-based id with the given prefix.
///
/// # Examples
/// ```
/// let id = parley_common::id::prefixed_ulid("ses");
/// assert!(id.starts_with("ses_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known id prefixes.
pub mod prefix {
    /// Gateway sessions (one per live connection).
    pub const SESSION: &str = "ses";
    /// Registered accounts.
    pub const ACCOUNT: &str = "acc";
}
