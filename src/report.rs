//! External report tool invocation.
//!
//! Shells out to pgbadger over the files in the scratch directory. The
//! working directory is passed explicitly to the process runner rather than
//! mutated on the ambient process, and the tool's stdout and stderr are
//! captured and relayed as one combined string.

use std::ffi::OsString;
use std::fs;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default report tool binary.
pub const DEFAULT_PGBADGER_BIN: &str = "pgbadger";

/// Default log-line prefix passed to pgbadger, matching the database's
/// `log_line_prefix` setting.
pub const DEFAULT_LOG_LINE_PREFIX: &str = "%t:%r:%u@%d:[%p]:";

/// Default scratch directory receiving downloaded log files.
pub const DEFAULT_WORK_DIR: &str = "work";

/// Report tool settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "RDSBADGER")]
pub struct ReportConfig {
    /// Path to the pgbadger executable.
    #[ortho_config(default = DEFAULT_PGBADGER_BIN.to_owned())]
    pub pgbadger_bin: String,
    /// Log-line prefix forwarded via `-p`.
    #[ortho_config(default = DEFAULT_LOG_LINE_PREFIX.to_owned())]
    pub log_line_prefix: String,
    /// Scratch directory for downloaded log files; relative paths resolve
    /// against the current directory.
    #[ortho_config(default = DEFAULT_WORK_DIR.to_owned())]
    pub work_dir: String,
}

impl ReportConfig {
    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ReportError> {
        Self::load_from_iter([std::ffi::OsString::from("rdsbadger")]).map_err(|err| {
            ReportError::InvalidConfig {
                field: err.to_string(),
            }
        })
    }

    /// Ensures configuration values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] when any required field is
    /// empty.
    pub fn validate(&self) -> Result<(), ReportError> {
        Self::require_value(&self.pgbadger_bin, "pgbadger_bin")?;
        Self::require_value(&self.log_line_prefix, "log_line_prefix")?;
        Self::require_value(&self.work_dir, "work_dir")?;
        Ok(())
    }

    fn require_value(value: &str, field: &str) -> Result<(), ReportError> {
        if value.trim().is_empty() {
            return Err(ReportError::InvalidConfig {
                field: field.to_owned(),
            });
        }
        Ok(())
    }
}

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Abstraction over command execution to support fakes in tests.
///
/// The working directory is an explicit parameter so callers never mutate
/// process-global state around an invocation.
pub trait CommandRunner {
    /// Runs `program` with the given arguments inside `cwd`, capturing stdout
    /// and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Spawn`] if the command cannot be started.
    fn run(
        &self,
        program: &str,
        args: &[OsString],
        cwd: &Utf8Path,
    ) -> Result<CommandOutput, ReportError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[OsString],
        cwd: &Utf8Path,
    ) -> Result<CommandOutput, ReportError> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|err| ReportError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Errors raised while generating the report.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ReportError {
    /// Raised when configuration is missing required values.
    #[error("invalid report configuration: {field}")]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when the scratch directory cannot be enumerated.
    #[error("failed to scan {path}: {message}")]
    Scan {
        /// Directory that could not be read.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the scratch directory holds no log files to analyse.
    #[error("no log files to analyse in {path}")]
    NoLogFiles {
        /// Directory that was empty.
        path: Utf8PathBuf,
    },
    /// Raised when the report tool cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the report tool completes with a non-zero exit code.
    #[error("{program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Command name used for the attempted invocation.
        program: String,
        /// Exit status as reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
}

/// Invokes the report tool over a scratch directory full of log files.
#[derive(Debug)]
pub struct ReportRunner<R: CommandRunner> {
    config: ReportConfig,
    runner: R,
}

impl ReportRunner<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: ReportConfig) -> Result<Self, ReportError> {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> ReportRunner<R> {
    /// Creates a new runner using the provided command runner and
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] when configuration validation
    /// fails.
    pub fn new(config: ReportConfig, runner: R) -> Result<Self, ReportError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Runs the report tool over every file in `scratch` and returns the
    /// combined stdout and stderr, trimmed of trailing whitespace.
    ///
    /// Files are passed by name in lexicographic order with `scratch` as the
    /// tool's working directory, so invocations are deterministic and no
    /// shell globbing is involved.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NoLogFiles`] for an empty scratch directory,
    /// [`ReportError::Spawn`] when the tool cannot start, and
    /// [`ReportError::CommandFailure`] for a non-zero exit.
    pub fn generate(&self, scratch: &Utf8Path) -> Result<String, ReportError> {
        let files = log_file_names(scratch)?;
        if files.is_empty() {
            return Err(ReportError::NoLogFiles {
                path: scratch.to_path_buf(),
            });
        }

        let mut args = vec![
            OsString::from("-p"),
            OsString::from(&self.config.log_line_prefix),
        ];
        args.extend(files.iter().map(OsString::from));

        let output = self.runner.run(&self.config.pgbadger_bin, &args, scratch)?;
        if !output.is_success() {
            let status_text = output
                .code
                .map_or_else(|| String::from("unknown"), |code| code.to_string());
            return Err(ReportError::CommandFailure {
                program: self.config.pgbadger_bin.clone(),
                status: output.code,
                status_text,
                stderr: output.stderr,
            });
        }

        let mut combined = output.stdout;
        combined.push_str(&output.stderr);
        Ok(combined.trim_end().to_owned())
    }
}

fn log_file_names(scratch: &Utf8Path) -> Result<Vec<String>, ReportError> {
    let entries = fs::read_dir(scratch).map_err(|err| ReportError::Scan {
        path: scratch.to_path_buf(),
        message: err.to_string(),
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| ReportError::Scan {
            path: scratch.to_path_buf(),
            message: err.to_string(),
        })?;
        let file_type = entry.file_type().map_err(|err| ReportError::Scan {
            path: scratch.to_path_buf(),
            message: err.to_string(),
        })?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| ReportError::Scan {
                path: scratch.to_path_buf(),
                message: format!("non-UTF-8 file name: {}", name.to_string_lossy()),
            })?;
        names.push(name);
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn scratch_with_files(tmp: &TempDir, files: &[&str]) -> Utf8PathBuf {
        let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("temp path should be utf8: {}", path.display()));
        for name in files {
            fs::write(root.join(name), "log line\n")
                .unwrap_or_else(|err| panic!("seed {name}: {err}"));
        }
        root
    }

    fn config() -> ReportConfig {
        ReportConfig {
            pgbadger_bin: String::from("pgbadger"),
            log_line_prefix: String::from(DEFAULT_LOG_LINE_PREFIX),
            work_dir: String::from(DEFAULT_WORK_DIR),
        }
    }

    #[rstest]
    fn generate_passes_sorted_files_and_scratch_cwd() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = scratch_with_files(&tmp, &["b.log", "a.log"]);
        let runner = ScriptedRunner::new();
        runner.push_output(Some(0), "report ready\n", "");

        let report =
            ReportRunner::new(config(), runner.clone()).unwrap_or_else(|err| panic!("new: {err}"));
        let text = report
            .generate(&root)
            .unwrap_or_else(|err| panic!("generate: {err}"));
        assert_eq!(text, "report ready");

        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 1);
        let invocation = invocations
            .first()
            .unwrap_or_else(|| panic!("one invocation should be recorded"));
        assert_eq!(invocation.program, "pgbadger");
        assert_eq!(invocation.cwd, root);
        let args: Vec<String> = invocation
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                String::from("-p"),
                String::from(DEFAULT_LOG_LINE_PREFIX),
                String::from("a.log"),
                String::from("b.log"),
            ]
        );
    }

    #[rstest]
    fn generate_combines_stdout_and_stderr() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = scratch_with_files(&tmp, &["a.log"]);
        let runner = ScriptedRunner::new();
        runner.push_output(Some(0), "summary\n", "3 queries ignored\n");

        let report =
            ReportRunner::new(config(), runner).unwrap_or_else(|err| panic!("new: {err}"));
        let text = report
            .generate(&root)
            .unwrap_or_else(|err| panic!("generate: {err}"));
        assert_eq!(text, "summary\n3 queries ignored");
    }

    #[rstest]
    fn generate_rejects_an_empty_scratch_directory() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = scratch_with_files(&tmp, &[]);
        let runner = ScriptedRunner::new();

        let report =
            ReportRunner::new(config(), runner.clone()).unwrap_or_else(|err| panic!("new: {err}"));
        let err = report.generate(&root).expect_err("expected NoLogFiles");
        assert_eq!(err, ReportError::NoLogFiles { path: root });
        assert!(invocation_free(&runner));
    }

    #[rstest]
    fn generate_surfaces_nonzero_exits() {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let root = scratch_with_files(&tmp, &["a.log"]);
        let runner = ScriptedRunner::new();
        runner.push_output(Some(2), "", "FATAL: bad prefix\n");

        let report =
            ReportRunner::new(config(), runner).unwrap_or_else(|err| panic!("new: {err}"));
        let err = report.generate(&root).expect_err("expected CommandFailure");
        assert_eq!(
            err,
            ReportError::CommandFailure {
                program: String::from("pgbadger"),
                status: Some(2),
                status_text: String::from("2"),
                stderr: String::from("FATAL: bad prefix\n"),
            }
        );
    }

    #[rstest]
    #[case("", DEFAULT_LOG_LINE_PREFIX, DEFAULT_WORK_DIR, "pgbadger_bin")]
    #[case(DEFAULT_PGBADGER_BIN, " ", DEFAULT_WORK_DIR, "log_line_prefix")]
    #[case(DEFAULT_PGBADGER_BIN, DEFAULT_LOG_LINE_PREFIX, "  ", "work_dir")]
    fn config_rejects_blank_fields(
        #[case] pgbadger_bin: &str,
        #[case] log_line_prefix: &str,
        #[case] work_dir: &str,
        #[case] expected_field: &str,
    ) {
        let bad = ReportConfig {
            pgbadger_bin: pgbadger_bin.to_owned(),
            log_line_prefix: log_line_prefix.to_owned(),
            work_dir: work_dir.to_owned(),
        };
        let err = bad.validate().expect_err("expected invalid config");
        assert_eq!(
            err,
            ReportError::InvalidConfig {
                field: expected_field.to_owned()
            }
        );
    }

    fn invocation_free(runner: &ScriptedRunner) -> bool {
        runner.invocations().is_empty()
    }
}
