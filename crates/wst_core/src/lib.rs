//! WST Core - Backend logic for workstation tools
//!
//! This crate contains the shared batch machinery used by every tool:
//! work-list building, external-process invocation, bounded fan-out and
//! result reporting. It has no CLI dependencies and can be driven by any
//! front end.

pub mod config;
pub mod logging;
pub mod process;
pub mod report;
pub mod runner;
pub mod status;
pub mod tools;
pub mod work;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
