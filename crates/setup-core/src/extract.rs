//! Extraction of `.tar.zst` toolchain archives.
//!
//! The tar stream is either decoded in-process or piped through an external
//! decompression program picked from [`DECOMPRESS_COMMANDS`] by OS family.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tar::Archive;
use tracing::debug;

use crate::config::ExtractMethod;
use crate::fsutil::remove_quietly;
use crate::platform::OsFamily;
use crate::{Error, Result};

/// External program that reads zstd on stdin and writes the raw stream to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompressCommand {
    /// Program name, resolved through `PATH`.
    pub program: &'static str,
    /// Arguments passed before any input.
    pub args: &'static [&'static str],
}

/// Decompression programs per OS family (`win32`, `linux`, ...).
///
/// The Windows runner's tar cannot be trusted with zstd, so `zstd -d` is
/// called by name there.
pub const DECOMPRESS_COMMANDS: &[(&str, DecompressCommand)] = &[(
    "win32",
    DecompressCommand {
        program: "zstd",
        args: &["-d"],
    },
)];

/// Decompression program for OS families without an entry.
pub const DEFAULT_DECOMPRESS_COMMAND: DecompressCommand = DecompressCommand {
    program: "unzstd",
    args: &[],
};

/// Look up the decompression program for `os`.
#[must_use]
pub fn decompress_command(os: &OsFamily) -> DecompressCommand {
    let key = os.to_string();
    DECOMPRESS_COMMANDS
        .iter()
        .find(|(family, _)| *family == key)
        .map_or(DEFAULT_DECOMPRESS_COMMAND, |(_, cmd)| *cmd)
}

/// Extracts toolchain archives.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    method: ExtractMethod,
    os: OsFamily,
    temp_root: PathBuf,
}

impl ArchiveExtractor {
    /// Create an extractor.
    ///
    /// `temp_root` receives a fresh directory for every extraction that does
    /// not name a destination.
    #[must_use]
    pub fn new(method: ExtractMethod, os: OsFamily, temp_root: impl Into<PathBuf>) -> Self {
        Self {
            method,
            os,
            temp_root: temp_root.into(),
        }
    }

    /// Extract `archive` and return the directory it landed in.
    ///
    /// With `dest`, the directory must already exist. Without it, a uniquely
    /// named directory is created under the temp root and removed again if
    /// extraction fails.
    pub fn extract(&self, archive: &Path, dest: Option<&Path>) -> Result<PathBuf> {
        let (target, owned) = match dest {
            Some(dir) => {
                if !dir.is_dir() {
                    return Err(Error::extraction(
                        archive,
                        format!("destination {} does not exist", dir.display()),
                    ));
                }
                (dir.to_path_buf(), false)
            }
            None => {
                let dir = self.temp_root.join(uuid::Uuid::new_v4().to_string());
                std::fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir, "create_dir_all"))?;
                (dir, true)
            }
        };

        debug!(
            archive = %archive.display(),
            dest = %target.display(),
            method = %self.method,
            "Extracting archive"
        );

        let result = match self.method {
            ExtractMethod::Builtin => unpack_tar_zst(archive, &target),
            ExtractMethod::System => {
                extract_with_command(archive, &target, decompress_command(&self.os))
            }
        };

        match result {
            Ok(()) => Ok(target),
            Err(e) => {
                if owned {
                    remove_quietly(&target);
                }
                Err(e)
            }
        }
    }
}

fn unpack<R: Read>(reader: R, archive: &Path, dest: &Path) -> Result<()> {
    let mut tar = Archive::new(reader);
    tar.set_preserve_permissions(true);
    tar.set_overwrite(true);
    tar.unpack(dest)
        .map_err(|e| Error::extraction(archive, format!("tar unpack failed: {e}")))
}

pub(crate) fn unpack_tar_zst(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    let decoder = zstd::stream::read::Decoder::new(file)
        .map_err(|e| Error::extraction(archive, format!("zstd decoder error: {e}")))?;
    unpack(decoder, archive, dest)
}

fn extract_with_command(archive: &Path, dest: &Path, cmd: DecompressCommand) -> Result<()> {
    let input = File::open(archive).map_err(|e| Error::io(e, archive, "open"))?;
    let mut child = Command::new(cmd.program)
        .args(cmd.args)
        .stdin(Stdio::from(input))
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| {
            Error::extraction(archive, format!("failed to run {}: {e}", cmd.program))
        })?;

    let unpacked = match child.stdout.take() {
        Some(mut stdout) => unpack(&mut stdout, archive, dest).and_then(|()| {
            // tar stops at the end-of-archive marker; drain trailing padding so
            // the decompressor does not die on a closed pipe.
            std::io::copy(&mut stdout, &mut std::io::sink())
                .map(|_| ())
                .map_err(|e| Error::extraction(archive, format!("read failed: {e}")))
        }),
        None => Err(Error::extraction(archive, "decompressor has no stdout")),
    };
    if unpacked.is_err() {
        let _ = child.kill();
    }
    let status = child
        .wait()
        .map_err(|e| Error::io_no_path(e, format!("wait for {}", cmd.program)))?;
    unpacked?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::extraction(
            archive,
            format!("{} exited with {status}", cmd.program),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tar::Builder;
    use tempfile::TempDir;

    fn create_tar_zst(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("toolchain.tar.zst");
        let file = File::create(&path).unwrap();
        let encoder = zstd::Encoder::new(file, 3).unwrap();
        let mut builder = Builder::new(encoder);

        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append(&header, &content[..]).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn test_lookup_table() {
        assert_eq!(
            decompress_command(&OsFamily::Windows),
            DecompressCommand {
                program: "zstd",
                args: &["-d"]
            }
        );
        assert_eq!(decompress_command(&OsFamily::Linux).program, "unzstd");
        assert_eq!(decompress_command(&OsFamily::Darwin).program, "unzstd");
        assert_eq!(
            decompress_command(&OsFamily::Other("freebsd".into())),
            DEFAULT_DECOMPRESS_COMMAND
        );
    }

    #[test]
    fn test_builtin_extract_to_temp_root() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_zst(
            temp.path(),
            &[("bin/clang", b"#!clang"), ("lib/libc++.so", b"so")],
        );
        let extractor =
            ArchiveExtractor::new(ExtractMethod::Builtin, OsFamily::Linux, temp.path().join("t"));

        let out = extractor.extract(&archive, None)?;

        assert!(out.starts_with(temp.path().join("t")));
        assert_eq!(std::fs::read(out.join("bin/clang")).unwrap(), b"#!clang");
        assert_eq!(std::fs::read(out.join("lib/libc++.so")).unwrap(), b"so");
        Ok(())
    }

    #[test]
    fn test_builtin_extract_into_existing_dest() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_zst(temp.path(), &[("bin/clang", b"x")]);
        let dest = temp.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        let extractor = ArchiveExtractor::new(ExtractMethod::Builtin, OsFamily::Linux, temp.path());

        let out = extractor.extract(&archive, Some(&dest))?;

        assert_eq!(out, dest);
        assert!(dest.join("bin/clang").exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_builtin_extract_preserves_mode() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = create_tar_zst(temp.path(), &[("bin/clang", b"x")]);
        let extractor = ArchiveExtractor::new(ExtractMethod::Builtin, OsFamily::Linux, temp.path());

        let out = extractor.extract(&archive, None)?;

        let mode = std::fs::metadata(out.join("bin/clang"))
            .unwrap()
            .permissions()
            .mode();
        assert_ne!(mode & 0o111, 0);
        Ok(())
    }

    #[test]
    fn test_missing_dest_is_error() {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_zst(temp.path(), &[("a", b"a")]);
        let extractor = ArchiveExtractor::new(ExtractMethod::Builtin, OsFamily::Linux, temp.path());

        let result = extractor.extract(&archive, Some(&temp.path().join("missing")));
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }

    #[test]
    fn test_corrupt_archive_cleans_up_temp_dir() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("bad.tar.zst");
        std::fs::write(&archive, b"definitely not zstd").unwrap();
        let root = temp.path().join("scratch");
        std::fs::create_dir_all(&root).unwrap();
        let extractor = ArchiveExtractor::new(ExtractMethod::Builtin, OsFamily::Linux, &root);

        let result = extractor.extract(&archive, None);

        assert!(matches!(result, Err(Error::Extraction { .. })));
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    #[allow(clippy::print_stderr)]
    fn test_system_extract_when_available() -> Result<()> {
        let os = OsFamily::current();
        let cmd = decompress_command(&os);
        let available = Command::new(cmd.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success());
        if !available {
            eprintln!(
                "Skipping test_system_extract_when_available: {} not found",
                cmd.program
            );
            return Ok(());
        }

        let temp = TempDir::new().unwrap();
        let archive = create_tar_zst(temp.path(), &[("bin/clang", b"system")]);
        let extractor = ArchiveExtractor::new(ExtractMethod::System, os, temp.path());

        let out = extractor.extract(&archive, None)?;
        assert_eq!(std::fs::read(out.join("bin/clang")).unwrap(), b"system");
        Ok(())
    }

    #[test]
    fn test_system_extract_missing_program() {
        let temp = TempDir::new().unwrap();
        let archive = create_tar_zst(temp.path(), &[("a", b"a")]);
        let result = extract_with_command(
            &archive,
            temp.path(),
            DecompressCommand {
                program: "definitely-not-a-real-decompressor",
                args: &[],
            },
        );
        assert!(matches!(result, Err(Error::Extraction { .. })));
    }
}
