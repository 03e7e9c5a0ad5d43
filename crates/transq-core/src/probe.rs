use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Default program used to inspect media streams.
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Answers whether a media file carries an audio stream.
///
/// A failed probe is an error, never a silent "no audio".
pub trait AudioOracle {
    fn has_audio(&self, path: &Path) -> Result<bool>;
}

impl<F> AudioOracle for F
where
    F: Fn(&Path) -> Result<bool>,
{
    fn has_audio(&self, path: &Path) -> Result<bool> {
        self(path)
    }
}

/// Audio oracle backed by an `ffprobe` subprocess.
#[derive(Debug, Clone)]
pub struct FfprobeOracle {
    program: PathBuf,
}

impl Default for FfprobeOracle {
    fn default() -> Self {
        Self::new(DEFAULT_FFPROBE)
    }
}

impl FfprobeOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl AudioOracle for FfprobeOracle {
    fn has_audio(&self, path: &Path) -> Result<bool> {
        let json = run_ffprobe(
            &self.program,
            &["-v", "error", "-select_streams", "a", "-show_entries", "stream=index", "-of", "json"],
            path,
        )?;
        Ok(json["streams"]
            .as_array()
            .is_some_and(|streams| !streams.is_empty()))
    }
}

/// Container duration in seconds, as reported by ffprobe.
pub fn media_duration(program: &Path, path: &Path) -> Result<f64> {
    let json = run_ffprobe(
        program,
        &["-v", "quiet", "-show_entries", "format=duration", "-of", "json"],
        path,
    )?;
    json["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| Error::OracleFailure {
            path: path.to_path_buf(),
            reason: "no duration in ffprobe output".to_string(),
        })
}

fn run_ffprobe(program: &Path, args: &[&str], path: &Path) -> Result<serde_json::Value> {
    let failure = |reason: String| Error::OracleFailure {
        path: path.to_path_buf(),
        reason,
    };

    let output = Command::new(program)
        .args(args)
        .arg(path)
        .output()
        .map_err(|e| failure(format!("could not run {}: {}", program.display(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failure(format!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            stderr.trim()
        )));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| failure(format!("unparseable ffprobe output: {}", e)))
}
