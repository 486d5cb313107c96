//! Error handling utilities
//!
//! Errors that cross the FFI boundary are strongly typed enums. Internally, code that
//! chains several fallible steps (e.g. decoding a token) may use `anyhow` for context and
//! convert at the boundary, either through the `From<anyhow::Error>` impl generated by
//! [`keystate_error`] or through [`AnyhowErrorExt`] when the target is a foreign-liftable
//! error with a plain message field.

pub use keystate_macros::keystate_error;

/// Flattens an `anyhow` error chain into a single message
pub trait AnyhowErrorExt {
    /// Renders the error and its causes as `outer (caused by: middle -> root)`
    fn to_generic_message(self) -> String;
}

impl AnyhowErrorExt for anyhow::Error {
    fn to_generic_message(self) -> String {
        let mut message = self.to_string();

        let chain: Vec<String> = self.chain().skip(1).map(ToString::to_string).collect();
        if !chain.is_empty() {
            message.push_str(" (caused by: ");
            message.push_str(&chain.join(" -> "));
            message.push(')');
        }

        message
    }
}
