//! Recovering version facts from a release executable.
//!
//! The executable is written to a fresh temporary file and marked
//! executable, then a fixed list of strategies is tried in order until one
//! succeeds:
//!
//! 1. **self-report**: run `<binary> --version` and parse the banner with
//!    [`parse_self_report`]. Yields version, runtime and date, but only
//!    works when the binary runs on this host.
//! 2. **build-info**: run `go version -m <binary>` and take the runtime
//!    from the first line (`/tmp/syncthing123: go1.25.7`). Works for any
//!    Go binary regardless of target platform, but yields the runtime only.
//!
//! The temporary file is removed when the probe returns, on every path.

use crate::error::ProbeError;
use crate::record::VersionRecord;
use crate::version::parse_self_report;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempPath;
use tracing::debug;

type Strategy = fn(&Prober, &Path) -> Result<VersionRecord, ProbeError>;

const STRATEGIES: &[(&str, Strategy)] = &[
    ("self-report", Prober::self_report),
    ("build-info", Prober::build_info),
];

#[derive(Debug, Clone)]
pub struct Prober {
    exe_name: String,
    version_flag: OsString,
    build_info_tool: PathBuf,
}

impl Default for Prober {
    fn default() -> Self {
        Self::new("syncthing")
    }
}

impl Prober {
    pub fn new(exe_name: impl Into<String>) -> Self {
        Self {
            exe_name: exe_name.into(),
            version_flag: OsString::from("--version"),
            build_info_tool: PathBuf::from("go"),
        }
    }

    /// Use a different runtime introspection tool than `go` on `$PATH`.
    pub fn with_build_info_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.build_info_tool = tool.into();
        self
    }

    /// Materialize the executable read from `rd` and probe it.
    pub fn probe(&self, rd: &mut dyn Read) -> Result<VersionRecord, ProbeError> {
        let exe = self.materialize(rd)?;
        self.probe_path(&exe)
    }

    /// Try each strategy against an executable already on disk.
    pub fn probe_path(&self, exe: &Path) -> Result<VersionRecord, ProbeError> {
        let mut failures = Vec::new();
        for (name, strategy) in STRATEGIES {
            match strategy(self, exe) {
                Ok(record) => {
                    debug!("{} strategy succeeded: {:?}", name, record);
                    return Ok(record);
                }
                Err(e) => {
                    debug!("{} strategy failed: {}", name, e);
                    failures.push((*name, e));
                }
            }
        }
        Err(ProbeError::Exhausted(failures))
    }

    fn materialize(&self, rd: &mut dyn Read) -> Result<TempPath, ProbeError> {
        let mut file = tempfile::Builder::new()
            .prefix(&self.exe_name)
            .tempfile()?;
        io::copy(rd, &mut file)?;
        file.flush()?;

        // Close the write handle before exec, otherwise the kernel refuses
        // to run the file (ETXTBSY).
        let path = file.into_temp_path();
        make_executable(&path)?;
        Ok(path)
    }

    fn self_report(&self, exe: &Path) -> Result<VersionRecord, ProbeError> {
        let mut cmd = Command::new(exe);
        cmd.arg(&self.version_flag);
        let stdout = run(cmd, exe)?;
        Ok(parse_self_report(&stdout)?)
    }

    fn build_info(&self, exe: &Path) -> Result<VersionRecord, ProbeError> {
        let mut cmd = Command::new(&self.build_info_tool);
        cmd.args(["version", "-m"]).arg(exe);
        let stdout = run(cmd, &self.build_info_tool)?;
        let runtime = parse_build_info(&stdout).ok_or(ProbeError::NoBuildInfo)?;
        Ok(VersionRecord {
            runtime: Some(runtime.to_string()),
            ..Default::default()
        })
    }
}

fn run(mut cmd: Command, program: &Path) -> Result<String, ProbeError> {
    let command = program.display().to_string();
    let output = cmd.output().map_err(|source| ProbeError::Spawn {
        command: command.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(ProbeError::ExitStatus {
            command,
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runtime version from the first line of `go version -m` output.
fn parse_build_info(output: &str) -> Option<&str> {
    let first = output.lines().next()?;
    let mut fields = first.split_whitespace();
    // "<path>: <runtime>": at least the path and the version
    let _path = fields.next()?;
    fields.last()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
