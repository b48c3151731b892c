//! Encoder Binary Detection
//!
//! Locates ffmpeg and ffprobe on the machine. Well-known package-manager
//! locations are checked before falling back to a PATH lookup, since GUI
//! app processes frequently launch without the user's shell PATH.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{ExportError, ExportResult};
use crate::process::configure_std_command;

/// Detected encoder installation
#[derive(Debug, Clone)]
pub struct EncoderInstallation {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Reported version string, e.g. "7.0.1"
    pub version: String,
}

impl EncoderInstallation {
    /// Builds an installation from known paths (tests, user override).
    pub fn from_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf, version: &str) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            version: version.to_string(),
        }
    }

    /// Major version number, when the version string is parseable.
    pub fn version_major(&self) -> Option<u32> {
        parse_version_major(&self.version)
    }
}

/// Detect FFmpeg binaries on the system.
pub fn detect_encoder() -> ExportResult<EncoderInstallation> {
    let ffmpeg_path = locate_binary("ffmpeg")?;
    let ffprobe_path = locate_binary("ffprobe")?;
    let version = query_version(&ffmpeg_path)?;

    Ok(EncoderInstallation {
        ffmpeg_path,
        ffprobe_path,
        version,
    })
}

/// Well-known install dirs first, then a PATH search.
fn locate_binary(name: &str) -> ExportResult<PathBuf> {
    #[cfg(target_os = "windows")]
    let file_name = format!("{}.exe", name);
    #[cfg(not(target_os = "windows"))]
    let file_name = name.to_string();

    if let Some(found) = known_install_dirs()
        .into_iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.exists())
    {
        return Ok(found);
    }

    path_lookup(name)
}

/// PATH search via `where` on Windows, `which` elsewhere.
fn path_lookup(name: &str) -> ExportResult<PathBuf> {
    #[cfg(target_os = "windows")]
    let mut cmd = Command::new("where");
    #[cfg(not(target_os = "windows"))]
    let mut cmd = Command::new("which");

    configure_std_command(&mut cmd);
    let output = cmd
        .arg(name)
        .output()
        .map_err(|_| ExportError::EncoderNotAvailable)?;

    if output.status.success() {
        let listing = String::from_utf8_lossy(&output.stdout);
        // `where` may print several matches, the first wins.
        if let Some(hit) = listing.lines().map(str::trim).find(|l| !l.is_empty()) {
            return Ok(PathBuf::from(hit));
        }
    }

    Err(ExportError::EncoderNotAvailable)
}

fn known_install_dirs() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut dirs = vec![
            PathBuf::from(r"C:\ffmpeg\bin"),
            PathBuf::from(r"C:\Program Files\ffmpeg\bin"),
            PathBuf::from(r"C:\Program Files (x86)\ffmpeg\bin"),
        ];
        // Chocolatey and Scoop shims
        if let Ok(programdata) = std::env::var("ProgramData") {
            dirs.push(Path::new(&programdata).join("chocolatey").join("bin"));
        }
        if let Ok(profile) = std::env::var("USERPROFILE") {
            dirs.push(Path::new(&profile).join("scoop").join("shims"));
        }
        dirs
    }

    #[cfg(target_os = "macos")]
    {
        // Homebrew (arm64 and x86), MacPorts
        vec![
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/opt/local/bin"),
        ]
    }

    #[cfg(all(not(target_os = "windows"), not(target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/snap/bin"),
        ]
    }
}

/// Ask the binary for its version string.
fn query_version(ffmpeg_path: &Path) -> ExportResult<String> {
    let mut cmd = Command::new(ffmpeg_path);
    configure_std_command(&mut cmd);
    let output = cmd
        .arg("-version")
        .output()
        .map_err(|e| ExportError::SpawnFailed(e.to_string()))?;

    if !output.status.success() {
        return Err(ExportError::ProbeFailed(
            "FFmpeg did not report a version".to_string(),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().next().ok_or_else(|| {
        ExportError::ProbeFailed("FFmpeg produced no version output".to_string())
    })?;

    // First line reads "ffmpeg version <V> ..."; keep the raw line when
    // the layout is unexpected so the user still sees something useful.
    let version = first_line
        .strip_prefix("ffmpeg version ")
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or(first_line);
    Ok(version.to_string())
}

/// Parse the leading major number from a version string like "7.0.1"
/// or distro-flavored strings like "n7.1" and "6.1.1-3ubuntu5".
pub fn parse_version_major(version: &str) -> Option<u32> {
    let digits: String = version
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Validate that both detected binaries respond to `-version`.
pub fn validate_encoder(installation: &EncoderInstallation) -> ExportResult<()> {
    for path in [&installation.ffmpeg_path, &installation.ffprobe_path] {
        let mut cmd = Command::new(path);
        configure_std_command(&mut cmd);
        let output = cmd
            .arg("-version")
            .output()
            .map_err(|e| ExportError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(ExportError::ProbeFailed(format!(
                "Binary is not functional: {}",
                path.display()
            )));
        }
    }

    Ok(())
}
