//! Running the external command-line tools every stage wraps.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Lines of stderr kept when a tool fails
pub const STDERR_TAIL_LINES: usize = 10;

/// Install hint for the tools this crate knows about
pub fn install_hint(program: &str) -> &'static str {
    let name = std::path::Path::new(program)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(program);

    match name {
        "ffmpeg" | "ffprobe" => "Install FFmpeg (e.g. `apt install ffmpeg` or `brew install ffmpeg`).",
        "tts" => "Install Coqui TTS with `pip install TTS`.",
        "piper" => "Download Piper from https://github.com/rhasspy/piper/releases.",
        "sd" => "Build stable-diffusion.cpp and put its `sd` binary on PATH.",
        "whisper-cli" | "main" => "Build whisper.cpp and put `whisper-cli` on PATH.",
        "nvidia-smi" => "Install the NVIDIA driver utilities.",
        _ => "Check that it is installed and on PATH.",
    }
}

/// Keep the last `lines` lines of a tool's stderr
pub fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let all: Vec<&str> = text.trim_end().lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Map a spawn failure to an engine error
pub fn spawn_error(program: &str, err: std::io::Error) -> EngineError {
    if err.kind() == ErrorKind::NotFound {
        EngineError::NotFound {
            program: program.to_string(),
            hint: install_hint(program).to_string(),
        }
    } else {
        EngineError::SpawnFailed {
            program: program.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Turn a finished process into `Ok(output)` or an [`EngineError::Failed`]
pub fn check_output(program: &str, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }

    Err(EngineError::Failed {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr_tail: stderr_tail(&output.stderr, STDERR_TAIL_LINES),
    }
    .into())
}

/// Run `program` with `args` to completion, capturing stdout and stderr
pub async fn run<I, S>(program: &str, args: I) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {:?}", cmd.as_std());

    let output = cmd.output().await.map_err(|e| spawn_error(program, e))?;
    check_output(program, output)
}

/// Whether `program` can be started at all
pub async fn is_available(program: &str, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok()
}

/// Write an executable `/bin/sh` script standing in for an external tool
#[cfg(all(test, unix))]
pub(crate) fn write_test_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
