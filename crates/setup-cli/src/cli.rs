//! Command-line and workflow inputs.
//!
//! Every input is a flag with an environment fallback. The `INPUT_*` names
//! are the ones the runner exports for action inputs.

use clap::{ArgAction, Parser};
use miette::{Diagnostic, Report};
use setup_ndk_clang_core::{CacheMode, ExtractMethod, InstallOptions, InstallerConfig, Platform};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

use crate::actions::error_command;
use crate::tracing::{LogLevel, TracingConfig, TracingFormat};

/// Successful execution exit code
pub const EXIT_OK: i32 = 0;
/// Exit code for every failure
pub const EXIT_FAILED: i32 = 1;

/// Errors surfaced by the binary.
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Install flow failure.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Install(#[from] setup_ndk_clang_core::Error),

    /// Invalid command line or workflow input.
    #[error("{message}")]
    #[diagnostic(code(setup_ndk_clang::cli::input))]
    Input {
        /// Error message.
        message: String,
        /// Optional help text.
        #[help]
        help: Option<String>,
    },

    /// Writing a runner command file failed.
    #[error("Failed to write {what} to {}", path.display())]
    #[diagnostic(
        code(setup_ndk_clang::cli::runner_file),
        help("Check that the runner-provided file is writable")
    )]
    RunnerFile {
        /// Which runner file.
        what: &'static str,
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Process-level failure outside the install flow.
    #[error("{context}: {source}")]
    #[diagnostic(code(setup_ndk_clang::cli::runtime))]
    Runtime {
        /// What was being done.
        context: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl CliError {
    /// Create an input error.
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: None,
        }
    }
}

/// Report a failure: a workflow error command on stdout, a miette report on stderr.
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: CliError) {
    println!("{}", error_command(&err.to_string()));
    let _ = io::stdout().flush();
    eprintln!("{:?}", Report::new(err));
    let _ = io::stderr().flush();
}

/// Install a prebuilt Android NDK clang toolchain.
#[derive(Parser, Debug)]
#[command(name = "setup-ndk-clang", version, about, long_about = None)]
pub struct Cli {
    /// NDK version to install, e.g. r27.
    #[arg(long, env = "INPUT_NDK-VERSION", value_parser = parse_version)]
    pub ndk_version: String,

    /// Report `{path}/bin` for the search path.
    #[arg(
        long,
        env = "INPUT_ADD-TO-PATH",
        default_value = "true",
        value_parser = parse_action_bool,
        action = ArgAction::Set
    )]
    pub add_to_path: bool,

    /// Enable the persistent snapshot cache.
    #[arg(
        long,
        env = "INPUT_LOCAL-CACHE",
        default_value = "false",
        value_parser = parse_action_bool,
        action = ArgAction::Set
    )]
    pub local_cache: bool,

    /// Cache policy: tiered or fresh.
    #[arg(long, env = "INPUT_CACHE-MODE", default_value = "tiered")]
    pub cache_mode: CacheMode,

    /// Decompression method: builtin or system.
    #[arg(long, env = "INPUT_EXTRACT-METHOD", default_value = "builtin")]
    pub extract_method: ExtractMethod,

    /// Override the version mapping document URL.
    #[arg(long, env = "SETUP_NDK_CLANG_MAPPING_URL")]
    pub mapping_url: Option<String>,

    /// Override the release archive base URL.
    #[arg(long, env = "SETUP_NDK_CLANG_RELEASE_BASE_URL")]
    pub release_base_url: Option<String>,

    /// Override the detected host as `{os}-{arch}`, e.g. darwin-arm64.
    #[arg(long, env = "SETUP_NDK_CLANG_PLATFORM", value_parser = parse_platform)]
    pub platform: Option<Platform>,

    /// Logging verbosity level.
    #[arg(short = 'L', long, default_value = "info", value_enum)]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}

impl Cli {
    /// Tracing settings for this invocation.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.level.into(),
        }
    }

    /// Per-call install options.
    #[must_use]
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            add_to_path: self.add_to_path,
            local_cache: self.local_cache,
        }
    }

    /// Apply overrides on top of `base`.
    #[must_use]
    pub fn installer_config(&self, base: InstallerConfig) -> InstallerConfig {
        let mut config = base
            .with_cache_mode(self.cache_mode)
            .with_extract_method(self.extract_method);
        if let Some(url) = &self.mapping_url {
            config = config.with_mapping_url(url.clone());
        }
        if let Some(url) = &self.release_base_url {
            config = config.with_release_base_url(url.clone());
        }
        if let Some(platform) = &self.platform {
            config = config.with_platform(platform.clone());
        }
        config
    }
}

/// Parse a boolean the way the runner toolkit does.
///
/// Only `true | True | TRUE | false | False | FALSE` are accepted.
pub fn parse_action_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" => Ok(false),
        _ => Err(format!(
            "Input does not meet YAML 1.2 \"Core Schema\": {value}\n\
             Support boolean input list: `true | True | TRUE | false | False | FALSE`"
        )),
    }
}

fn parse_version(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err("NDK version must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}

fn parse_platform(value: &str) -> Result<Platform, String> {
    Platform::parse(value).ok_or_else(|| format!("Expected {{os}}-{{arch}}, got {value:?}"))
}
