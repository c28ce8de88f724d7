//! Internal consistency failures.
//!
//! These are bugs in the compiler, never user errors: a pass that breaks its own post-condition or
//! a caller that violates a documented precondition. They are logged and then abort through a
//! panic with a message prefixed by `Internal error:`.

/// Logs and panics with an internal-consistency message.
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)+) => {{
        let message = format!($($arg)+);
        log::error!("Internal error: {}", message);
        panic!("Internal error: {}", message)
    }};
}

/// Like `assert!`, but reports through [`internal_error!`].
#[macro_export]
macro_rules! internal_assert {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::internal_error!(
                "Condition failed: {}\n{}",
                stringify!($cond),
                format!($($arg)+)
            );
        }
    };
}
