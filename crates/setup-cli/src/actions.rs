//! Runner workflow commands and command files.
//!
//! Outputs go to the file named by `GITHUB_OUTPUT` and search-path entries to
//! the file named by `GITHUB_PATH`, in the formats the runner parses.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::CliError;

/// Paths of the runner command files, when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionsContext {
    /// `GITHUB_OUTPUT` file.
    pub output_file: Option<PathBuf>,
    /// `GITHUB_PATH` file.
    pub path_file: Option<PathBuf>,
}

impl ActionsContext {
    /// Read the command file locations from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            output_file: non_empty_env("GITHUB_OUTPUT"),
            path_file: non_empty_env("GITHUB_PATH"),
        }
    }

    /// Set a step output.
    ///
    /// Without an output file the legacy `::set-output` command is printed.
    pub fn set_output(&self, name: &str, value: &str) -> Result<(), CliError> {
        debug!(name, value, "Setting output");
        match &self.output_file {
            Some(file) => {
                let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
                append(file, &output_entry(name, value, &delimiter)).map_err(|source| {
                    CliError::RunnerFile {
                        what: "output",
                        path: file.clone(),
                        source,
                    }
                })
            }
            None => print_command(&format!(
                "::set-output name={}::{}",
                escape_property(name),
                escape_data(value)
            )),
        }
    }

    /// Add `dir` to the search path of later steps.
    ///
    /// Without a path file this is a no-op.
    pub fn add_path(&self, dir: &Path) -> Result<(), CliError> {
        let Some(file) = &self.path_file else {
            debug!(dir = %dir.display(), "No path file; skipping");
            return Ok(());
        };
        append(file, &format!("{}\n", dir.display())).map_err(|source| CliError::RunnerFile {
            what: "path",
            path: file.clone(),
            source,
        })
    }
}

/// Format one `GITHUB_OUTPUT` entry. Multi-line values use a heredoc.
#[must_use]
pub fn output_entry(name: &str, value: &str, delimiter: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

/// The `::error::` workflow command for `message`.
#[must_use]
pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

/// Escape a workflow command message.
#[must_use]
pub fn escape_data(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a workflow command property value.
#[must_use]
pub fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

fn append(path: &Path, content: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(content.as_bytes())
}

#[allow(clippy::print_stdout)]
fn print_command(line: &str) -> Result<(), CliError> {
    println!("{line}");
    io::stdout().flush().map_err(|source| CliError::Runtime {
        context: "Failed to flush stdout",
        source,
    })
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context(temp: &TempDir) -> ActionsContext {
        ActionsContext {
            output_file: Some(temp.path().join("output")),
            path_file: Some(temp.path().join("path")),
        }
    }

    #[test]
    fn test_output_entry_single_line() {
        assert_eq!(
            output_entry("ndk-version", "r27", "EOF"),
            "ndk-version=r27\n"
        );
    }

    #[test]
    fn test_output_entry_multiline_uses_heredoc() {
        assert_eq!(
            output_entry("notes", "a\nb", "ghadelimiter_x"),
            "notes<<ghadelimiter_x\na\nb\nghadelimiter_x\n"
        );
    }

    #[test]
    fn test_set_output_appends() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);

        ctx.set_output("clang-path", "/home/ci/.setup-ndk-clang/r27/c1").unwrap();
        ctx.set_output("ndk-version", "r27").unwrap();

        assert_eq!(
            std::fs::read_to_string(temp.path().join("output")).unwrap(),
            "clang-path=/home/ci/.setup-ndk-clang/r27/c1\nndk-version=r27\n"
        );
    }

    #[test]
    fn test_add_path_appends_line() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp);

        ctx.add_path(Path::new("/opt/clang/bin")).unwrap();

        assert_eq!(
            std::fs::read_to_string(temp.path().join("path")).unwrap(),
            "/opt/clang/bin\n"
        );
    }

    #[test]
    fn test_add_path_without_file_is_noop() {
        let ctx = ActionsContext::default();
        assert!(ctx.add_path(Path::new("/opt/clang/bin")).is_ok());
    }

    #[test]
    fn test_unwritable_output_file_is_error() {
        let temp = TempDir::new().unwrap();
        let ctx = ActionsContext {
            output_file: Some(temp.path().join("missing/dir/output")),
            path_file: None,
        };
        assert!(matches!(
            ctx.set_output("a", "b"),
            Err(CliError::RunnerFile { what: "output", .. })
        ));
    }

    #[test]
    fn test_error_command_escapes() {
        assert_eq!(
            error_command("100% broken\r\nsecond line"),
            "::error::100%25 broken%0D%0Asecond line"
        );
    }

    #[test]
    fn test_escape_property() {
        assert_eq!(escape_property("a:b,c"), "a%3Ab%2Cc");
    }
}
