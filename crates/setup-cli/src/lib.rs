//! CI harness for installing prebuilt Android NDK clang toolchains.
//!
//! Parses workflow inputs, runs [`setup_ndk_clang_core::Installer`], and
//! reports the result back to the runner through outputs, search-path
//! entries and error annotations.

#![expect(
    clippy::missing_errors_doc,
    reason = "Errors are reported to the runner and documented on CliError"
)]

pub mod actions;
pub mod cli;
pub mod tracing;
