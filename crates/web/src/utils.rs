//! Utility macros used internally by the framework.

/// Early-returns `Err($error)` when `$predicate` does not hold.
///
/// Like `assert!`, but for validation paths that must report an error
/// instead of panicking.
///
/// ```ignore
/// ensure!(pattern.starts_with('/'), RouterError::invalid_pattern(pattern, "must start with '/'"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
