// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Blocking invocation of external tools (rrdtool, mencoder)

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Run `program` with `args` and wait for it.
///
/// A non-zero exit status is reported as [`Error::Renderer`] carrying the
/// tail of stderr.
pub fn run_tool<I, S>(program: &Path, args: I, cwd: Option<&Path>) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    trace!("running {:?}", cmd);

    let output = cmd
        .output()
        .map_err(|e| Error::renderer(&tool, format!("could not start: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
        return Err(Error::renderer(&tool, format!("{}: {}", output.status, tail)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!(tool = %tool, "finished ({} bytes of output)", stdout.len());
    Ok(stdout)
}
