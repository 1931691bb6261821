use thiserror::Error;

/// The generic Error type covering all failures this library can return.
///
/// Errors here are boundary-level: they describe malformed or unusable input
/// handed to the analysis API, never user-program conditions (those are
/// reported through the diagnostic sink) and never engine-internal invariant
/// violations (those are programming errors and panic).
///
/// # Error Categories
///
/// ## Input Validation
/// - [`Error::EmptyFunction`] - A function with no basic blocks was submitted
/// - [`Error::InvalidBlock`] - A block index referenced a non-existent block
/// - [`Error::InvalidValue`] - A value id referenced a non-existent value
///
/// ## Analysis Lifecycle
/// - [`Error::NoResult`] - Results were queried for a function that was never
///   analyzed (or was skipped by the size policy)
#[derive(Error, Debug)]
pub enum Error {
    /// The submitted function has no basic blocks.
    ///
    /// Every analyzable CHIR function must have at least an entry block with
    /// a terminator. An empty body indicates the caller handed over a
    /// function that was never finished by the IR builder.
    #[error("Function '{0}' has no basic blocks")]
    EmptyFunction(String),

    /// A terminator or expression referenced a block index that does not
    /// exist in the owning function.
    ///
    /// # Fields
    ///
    /// * `block` - The out-of-range block index
    /// * `count` - The number of blocks the function actually has
    #[error("Block index {block} out of range (function has {count} blocks)")]
    InvalidBlock {
        /// The out-of-range block index.
        block: usize,
        /// The number of blocks the function actually has.
        count: usize,
    },

    /// An expression referenced a value id that does not exist in the owning
    /// function's value table.
    #[error("Value id {0} is not defined in the function")]
    InvalidValue(u32),

    /// Analysis results were requested for a function that has no stored
    /// result.
    ///
    /// This happens when the function was never submitted to the driver, was
    /// invalidated, or was skipped by the size policy (skipped functions
    /// deliberately store no result; consumers must assume Top everywhere).
    #[error("No analysis result available for function {0}")]
    NoResult(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidBlock { block: 7, count: 3 };
        assert_eq!(
            err.to_string(),
            "Block index 7 out of range (function has 3 blocks)"
        );

        let err = Error::EmptyFunction("main".to_string());
        assert!(err.to_string().contains("main"));
    }
}
