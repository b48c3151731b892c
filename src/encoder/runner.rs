//! Encoder Invocation Runner
//!
//! Spawns a single FFmpeg process and drives it to completion: progress
//! parsing from `-progress pipe:1` on stdout, a concurrent stderr drain,
//! and prompt kill on cancellation.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::error::{ExportError, ExportResult};
use crate::process::configure_tokio_command;

/// One fully assembled encoder command, ready to spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderInvocation {
    /// Path to the ffmpeg binary
    pub program: PathBuf,
    /// All arguments, ending with the output path
    pub args: Vec<String>,
}

/// Export progress update
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    /// Current frame number
    pub frame: u64,
    /// Total frames
    pub total_frames: u64,
    /// Progress percentage (0-100, never decreases)
    pub percent: f32,
    /// Current encoding FPS
    pub fps: f32,
    /// Estimated time remaining in seconds
    pub eta_seconds: u64,
    /// Current status message
    pub message: String,
}

/// Parsed FFmpeg progress block state
#[derive(Debug, Clone, Default)]
pub struct ProgressData {
    pub frame: u64,
    pub fps: f32,
    pub time_sec: f64,
    /// Speed multiplier (e.g., 2.5x)
    pub speed: Option<f32>,
}

/// Parse one line of FFmpeg `-progress pipe:1` output into `data`.
///
/// Returns true when the line ends a progress block (`progress=` line),
/// which is the point to emit an update.
pub fn parse_progress_line(line: &str, data: &mut ProgressData) -> bool {
    let line = line.trim();

    if let Some(value) = line.strip_prefix("frame=") {
        data.frame = value.trim().parse().unwrap_or(data.frame);
        return false;
    }

    if let Some(value) = line.strip_prefix("fps=") {
        data.fps = value.trim().parse().unwrap_or(data.fps);
        return false;
    }

    if let Some(value) = line.strip_prefix("out_time_ms=") {
        // out_time_ms is in microseconds despite the name
        let microseconds: u64 = value.trim().parse().unwrap_or(0);
        data.time_sec = microseconds as f64 / 1_000_000.0;
        return false;
    }

    if let Some(value) = line.strip_prefix("speed=") {
        // Format: "2.5x" or "N/A"
        if let Some(num_str) = value.strip_suffix('x') {
            data.speed = num_str.trim().parse().ok();
        }
        return false;
    }

    line.starts_with("progress=")
}

/// Calculate a progress update from a completed progress block
pub fn calculate_progress(
    data: &ProgressData,
    total_duration_sec: f64,
    total_frames: u64,
) -> ExportProgress {
    let percent = if total_duration_sec > 0.0 {
        ((data.time_sec / total_duration_sec) * 100.0).min(100.0) as f32
    } else if total_frames > 0 {
        ((data.frame as f64 / total_frames as f64) * 100.0).min(100.0) as f32
    } else {
        0.0
    };

    let eta_seconds = if data.fps > 0.0 && total_duration_sec > 0.0 {
        let remaining_time = (total_duration_sec - data.time_sec).max(0.0);
        let remaining_frames = remaining_time * data.fps as f64;
        (remaining_frames / data.fps as f64) as u64
    } else if let Some(speed) = data.speed {
        if speed > 0.0 && total_duration_sec > 0.0 {
            let remaining_time = (total_duration_sec - data.time_sec).max(0.0);
            (remaining_time / speed as f64) as u64
        } else {
            0
        }
    } else {
        0
    };

    ExportProgress {
        frame: data.frame,
        total_frames,
        percent,
        fps: data.fps,
        eta_seconds,
        message: format!("Encoding frame {} ({:.1} fps)", data.frame, data.fps),
    }
}

/// Run an encoder invocation to completion.
///
/// Inserts `-progress pipe:1` before the output path, streams monotone
/// progress updates to `progress_tx`, and kills the child if `cancel`
/// fires.
pub async fn run_invocation(
    invocation: &EncoderInvocation,
    total_duration_sec: f64,
    total_frames: u64,
    progress_tx: Option<Sender<ExportProgress>>,
    cancel: &CancellationToken,
) -> ExportResult<()> {
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled);
    }

    let mut args = invocation.args.clone();
    let output_path_arg = args
        .pop()
        .ok_or_else(|| ExportError::InvalidSettings("Empty encoder argument list".to_string()))?;
    args.push("-progress".to_string());
    args.push("pipe:1".to_string());
    args.push(output_path_arg);

    debug!("Spawning encoder: {} {}", invocation.program.display(), args.join(" "));

    let mut cmd = tokio::process::Command::new(&invocation.program);
    configure_tokio_command(&mut cmd);
    cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| ExportError::SpawnFailed(e.to_string()))?;

    // Take stderr immediately and drain it concurrently. FFmpeg logs to
    // stderr constantly and will deadlock against a full pipe buffer.
    let stderr_handle = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            let mut stderr = stderr;
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).to_string()
        })
    });

    // Stdout must be drained whether or not anyone listens: the child
    // writes a progress block per interval and blocks once the pipe
    // buffer fills.
    if let Some(stdout) = child.stdout.take() {
        let mut tx = progress_tx;
        tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            let mut data = ProgressData::default();
            let mut max_percent = 0.0f32;

            while let Ok(Some(line)) = lines.next_line().await {
                if !parse_progress_line(&line, &mut data) {
                    continue;
                }
                let Some(sender) = &tx else {
                    continue;
                };
                let mut progress = calculate_progress(&data, total_duration_sec, total_frames);
                // Never report a lower percentage than already sent.
                max_percent = max_percent.max(progress.percent);
                progress.percent = max_percent;

                if sender.send(progress).await.is_err() {
                    // Receiver gone; keep reading so the child can exit.
                    tx = None;
                }
            }
        });
    }

    let status = tokio::select! {
        status = child.wait() => {
            status.map_err(|e| ExportError::SpawnFailed(e.to_string()))?
        }
        _ = cancel.cancelled() => {
            info!("Export cancelled, killing encoder process");
            let _ = child.kill().await;
            return Err(ExportError::Cancelled);
        }
    };

    if !status.success() {
        let diagnostic = if let Some(handle) = stderr_handle {
            let stderr = handle
                .await
                .unwrap_or_else(|_| "Failed to read stderr".to_string());
            tail(&stderr, 4000)
        } else {
            format!("Encoder exited with status: {}", status)
        };
        return Err(ExportError::EncoderFailed { diagnostic });
    }

    Ok(())
}

/// Last `max_len` characters of the encoder's stderr; the failure reason
/// is always at the end.
fn tail(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut start = s.len() - max_len;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_block() {
        let mut data = ProgressData::default();

        assert!(!parse_progress_line("frame=100", &mut data));
        assert!(!parse_progress_line("fps=30.5", &mut data));
        assert!(!parse_progress_line("out_time_ms=5000000", &mut data));
        assert!(!parse_progress_line("speed=2.5x", &mut data));
        assert!(parse_progress_line("progress=continue", &mut data));

        assert_eq!(data.frame, 100);
        assert!((data.fps - 30.5).abs() < 0.01);
        assert!((data.time_sec - 5.0).abs() < 0.001);
        assert_eq!(data.speed, Some(2.5));
    }

    #[test]
    fn test_parse_progress_na_speed() {
        let mut data = ProgressData::default();
        parse_progress_line("speed=N/A", &mut data);
        assert_eq!(data.speed, None);
    }

    #[test]
    fn test_calculate_progress_from_time() {
        let data = ProgressData {
            frame: 150,
            fps: 30.0,
            time_sec: 5.0,
            speed: None,
        };
        let progress = calculate_progress(&data, 10.0, 300);
        assert!((progress.percent - 50.0).abs() < 0.01);
        assert_eq!(progress.frame, 150);
    }

    #[test]
    fn test_calculate_progress_caps_at_100() {
        let data = ProgressData {
            frame: 400,
            fps: 30.0,
            time_sec: 12.0,
            speed: None,
        };
        let progress = calculate_progress(&data, 10.0, 300);
        assert_eq!(progress.percent, 100.0);
    }

    #[test]
    fn test_calculate_progress_falls_back_to_frames() {
        let data = ProgressData {
            frame: 75,
            fps: 0.0,
            time_sec: 0.0,
            speed: None,
        };
        let progress = calculate_progress(&data, 0.0, 300);
        assert!((progress.percent - 25.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_run_invocation_cancelled_before_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let invocation = EncoderInvocation {
            program: PathBuf::from("ffmpeg"),
            args: vec!["-y".to_string(), "out.mp4".to_string()],
        };

        let err = run_invocation(&invocation, 1.0, 30, None, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn test_run_invocation_missing_binary() {
        let cancel = CancellationToken::new();
        let invocation = EncoderInvocation {
            program: PathBuf::from("/nonexistent/reelcut-test-ffmpeg"),
            args: vec!["-y".to_string(), "out.mp4".to_string()],
        };

        let err = run_invocation(&invocation, 1.0, 30, None, &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::EncoderUnavailable);
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        let s = "aßcdef";
        let t = tail(s, 5);
        assert!(s.ends_with(&t));
    }

    #[cfg(unix)]
    fn fake_encoder(dir: &std::path::Path, script: &str) -> EncoderInvocation {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-encoder");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        EncoderInvocation {
            program: path,
            args: vec!["out.mp4".to_string()],
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = fake_encoder(
            dir.path(),
            "#!/bin/sh\necho 'Conversion failed: invalid input stream' >&2\nexit 1\n",
        );

        let cancel = CancellationToken::new();
        let err = run_invocation(&invocation, 1.0, 30, None, &cancel)
            .await
            .unwrap_err();
        match err {
            ExportError::EncoderFailed { diagnostic } => {
                assert!(diagnostic.contains("Conversion failed: invalid input stream"));
            }
            other => panic!("expected encoder failure, got {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_drained_without_progress_sink() {
        // A pipe buffer holds about 64 KB; the child writes far more
        // progress output and must still reach its exit with nobody
        // consuming updates.
        let script = "#!/bin/sh\n\
            i=0\n\
            while [ $i -lt 5000 ]; do\n\
            printf 'frame=%d\\nfps=30.0\\nout_time_ms=%d\\nprogress=continue\\n' $i $((i*33000))\n\
            i=$((i+1))\n\
            done\n\
            printf 'progress=end\\n'\n";
        let dir = tempfile::tempdir().unwrap();
        let invocation = fake_encoder(dir.path(), script);

        let cancel = CancellationToken::new();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            run_invocation(&invocation, 60.0, 1800, None, &cancel),
        )
        .await
        .expect("runner should not hang on an unread pipe");
        assert!(result.is_ok());
    }
}
