//! FFmpeg/FFprobe command utilities.
//!
//! Every video operation in the app shells out to the `ffmpeg` and
//! `ffprobe` binaries through [`tokio::process::Command`]. Arguments are
//! passed as a vector, never through a shell.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::AsyncReadExt;

use crate::progress::{ProgressSink, ThrottledProgress};

/// Codec required by the downstream video reader.
pub const REQUIRED_CODEC: &str = "h264";
/// Pixel format required by the downstream video reader.
pub const REQUIRED_PIXEL_FORMAT: &str = "yuv420p";

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("video file not found: {0}")]
    VideoNotFound(String),
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    pub streams: Vec<FfprobeStream>,
    pub format: FfprobeFormat,
}

/// A single stream from ffprobe output.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub pix_fmt: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// e.g. "30/1" or "24000/1001"
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Default, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a video file and return the parsed JSON output.
pub async fn probe_video(path: &Path) -> Result<FfprobeOutput, FfmpegError> {
    ensure_exists(path)?;

    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str::<FfprobeOutput>(&stdout)
        .map_err(|e| FfmpegError::ParseError(format!("{e}: {stdout}")))
}

/// Whether the video already uses the H.264 codec with `yuv420p` pixels.
pub async fn check_codec_format(path: &Path) -> Result<bool, FfmpegError> {
    let probe = probe_video(path).await?;
    Ok(is_reader_compatible(&probe))
}

/// Re-encode a video to H.264/yuv420p, padding odd dimensions to even.
///
/// The parent directory of `output` is created if needed; an existing
/// output file is overwritten.
pub async fn reencode_video(input: &Path, output: &Path) -> Result<(), FfmpegError> {
    ensure_exists(input)?;
    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::debug!(input = %input.display(), output = %output.display(), "Re-encoding video");

    let result = tokio::process::Command::new("ffmpeg")
        .arg("-i")
        .arg(input)
        .args([
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-c:v",
            "libx264",
            "-pix_fmt",
            REQUIRED_PIXEL_FORMAT,
            "-c:a",
            "copy",
            "-y",
        ])
        .arg(output)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    check_output(&result)
}

/// Cut `length_secs` seconds starting at `start_secs` into `dst`.
///
/// Never overwrites an existing `dst`.
pub async fn extract_clip(
    src: &Path,
    dst: &Path,
    start_secs: f64,
    length_secs: u32,
) -> Result<(), FfmpegError> {
    ensure_exists(src)?;

    let result = tokio::process::Command::new("ffmpeg")
        .args(["-ss", &format!("{start_secs}"), "-i"])
        .arg(src)
        .args(["-t", &length_secs.to_string(), "-n"])
        .arg(dst)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    check_output(&result)
}

/// Decode every `n`-th frame, downscaled to `resize_dims` x `resize_dims` RGB.
///
/// Each returned frame holds `resize_dims * resize_dims * 3` channel values.
/// Progress is reported as the share of all frames decoded so far.
pub async fn read_nth_frames(
    path: &Path,
    n: usize,
    resize_dims: u32,
    progress: &dyn ProgressSink,
) -> Result<Vec<Vec<f32>>, FfmpegError> {
    let probe = probe_video(path).await?;
    let frame_total = parse_total_frames(&probe).max(1) as f64;
    let n = n.max(1);
    let frame_len = (resize_dims * resize_dims * 3) as usize;

    let mut command = tokio::process::Command::new("ffmpeg");
    command
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vf",
            &format!("scale={resize_dims}:{resize_dims}"),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "pipe:1",
        ]);

    let (frames, frame_counter) =
        read_raw_frames(command, frame_len, n, frame_total, progress).await?;

    tracing::debug!(
        path = %path.display(),
        decoded = frame_counter,
        kept = frames.len(),
        "Decoded video frames"
    );
    Ok(frames)
}

/// Run `command`, splitting its stdout into `frame_len`-byte frames and
/// keeping every `n`-th one as channel values.
///
/// Stderr is drained on a separate task while stdout is read. Returns the
/// kept frames and the number of frames decoded.
async fn read_raw_frames(
    mut command: tokio::process::Command,
    frame_len: usize,
    n: usize,
    frame_total: f64,
    progress: &dyn ProgressSink,
) -> Result<(Vec<Vec<f32>>, usize), FfmpegError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(FfmpegError::NotFound)?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| FfmpegError::ParseError("ffmpeg stdout was not captured".into()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| FfmpegError::ParseError("ffmpeg stderr was not captured".into()))?;
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await.map(|_| buf)
    });

    let throttled = ThrottledProgress::new(progress);
    let mut frames = Vec::new();
    let mut buf = vec![0u8; frame_len];
    let mut frame_counter = 0usize;

    loop {
        match stdout.read_exact(&mut buf).await {
            Ok(_) => {
                if frame_counter % n == 0 {
                    frames.push(buf.iter().map(|&b| f32::from(b)).collect());
                }
                frame_counter += 1;
                throttled.report(frame_counter as f64 / frame_total * 100.0);
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                let _ = child.start_kill();
                return Err(e.into());
            }
        }
    }
    drop(stdout);

    let status = child.wait().await?;
    let stderr = stderr_task
        .await
        .map_err(|e| FfmpegError::IoError(std::io::Error::other(e)))??;
    check_output(&std::process::Output {
        status,
        stdout: Vec::new(),
        stderr,
    })?;

    Ok((frames, frame_counter))
}

fn ensure_exists(path: &Path) -> Result<(), FfmpegError> {
    if path.exists() {
        Ok(())
    } else {
        Err(FfmpegError::VideoNotFound(
            path.to_string_lossy().to_string(),
        ))
    }
}

fn check_output(output: &std::process::Output) -> Result<(), FfmpegError> {
    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Find the first video stream in the ffprobe output.
fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Whether the first video stream matches [`REQUIRED_CODEC`] and
/// [`REQUIRED_PIXEL_FORMAT`].
pub fn is_reader_compatible(probe: &FfprobeOutput) -> bool {
    parse_video_codec(probe) == REQUIRED_CODEC
        && parse_pixel_format(probe) == REQUIRED_PIXEL_FORMAT
}

/// Parse the video duration in seconds from ffprobe output.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    // Try format-level duration first.
    if let Some(secs) = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
    {
        return secs;
    }
    first_video_stream(probe)
        .and_then(|s| s.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse the video framerate from ffprobe output.
///
/// The `r_frame_rate` field is a fraction like `"30/1"` or `"24000/1001"`.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    first_video_stream(probe)
        .and_then(|s| s.r_frame_rate.as_deref())
        .map(parse_fraction)
        .unwrap_or(0.0)
}

/// Parse a fraction string like `"30/1"` into a float.
fn parse_fraction(s: &str) -> f64 {
    if let Some((num, den)) = s.split_once('/') {
        let num = num.parse::<f64>().unwrap_or(0.0);
        let den = den.parse::<f64>().unwrap_or(1.0);
        return if den > 0.0 { num / den } else { 0.0 };
    }
    s.parse::<f64>().unwrap_or(0.0)
}

/// Count total frames from ffprobe output.
pub fn parse_total_frames(probe: &FfprobeOutput) -> i64 {
    if let Some(n) = first_video_stream(probe)
        .and_then(|s| s.nb_frames.as_deref())
        .and_then(|nb| nb.parse::<i64>().ok())
    {
        return n;
    }
    // Estimate from duration * framerate.
    let duration = parse_duration(probe);
    let fps = parse_framerate(probe);
    if duration > 0.0 && fps > 0.0 {
        return (duration * fps).round() as i64;
    }
    0
}

/// Find the first video stream's codec name.
pub fn parse_video_codec(probe: &FfprobeOutput) -> String {
    first_video_stream(probe)
        .and_then(|s| s.codec_name.clone())
        .unwrap_or_default()
}

/// Find the first video stream's pixel format.
pub fn parse_pixel_format(probe: &FfprobeOutput) -> String {
    first_video_stream(probe)
        .and_then(|s| s.pix_fmt.clone())
        .unwrap_or_default()
}

/// Find the first video stream's resolution.
pub fn parse_resolution(probe: &FfprobeOutput) -> (i32, i32) {
    first_video_stream(probe)
        .map(|s| (s.width.unwrap_or(0), s.height.unwrap_or(0)))
        .unwrap_or((0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_stream(codec: &str, pix_fmt: &str) -> FfprobeStream {
        FfprobeStream {
            index: 0,
            codec_name: Some(codec.into()),
            codec_type: Some("video".into()),
            pix_fmt: Some(pix_fmt.into()),
            width: Some(640),
            height: Some(480),
            r_frame_rate: Some("30/1".into()),
            ..Default::default()
        }
    }

    fn probe_with(streams: Vec<FfprobeStream>, duration: Option<&str>) -> FfprobeOutput {
        FfprobeOutput {
            streams,
            format: FfprobeFormat {
                duration: duration.map(str::to_string),
                format_name: None,
            },
        }
    }

    #[test]
    fn test_parse_fraction_standard() {
        assert!((parse_fraction("30/1") - 30.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_fraction_ntsc() {
        let fps = parse_fraction("24000/1001");
        assert!((fps - 23.976).abs() < 0.01);
    }

    #[test]
    fn test_parse_fraction_plain_number() {
        assert!((parse_fraction("25") - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_fraction_zero_denominator() {
        assert_eq!(parse_fraction("30/0"), 0.0);
    }

    #[test]
    fn test_parse_duration_falls_back_to_stream() {
        let mut stream = video_stream("h264", "yuv420p");
        stream.duration = Some("60.0".into());
        let probe = probe_with(vec![stream], None);
        assert!((parse_duration(&probe) - 60.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_total_frames_from_nb_frames() {
        let mut stream = video_stream("h264", "yuv420p");
        stream.nb_frames = Some("300".into());
        let probe = probe_with(vec![stream], Some("12.0"));
        assert_eq!(parse_total_frames(&probe), 300);
    }

    #[test]
    fn test_parse_total_frames_estimated() {
        let probe = probe_with(vec![video_stream("h264", "yuv420p")], Some("10.0"));
        assert_eq!(parse_total_frames(&probe), 300);
    }

    #[test]
    fn test_compatible_requires_codec_and_pixel_format() {
        let ok = probe_with(vec![video_stream("h264", "yuv420p")], None);
        assert!(is_reader_compatible(&ok));

        let wrong_pix = probe_with(vec![video_stream("h264", "yuv444p")], None);
        assert!(!is_reader_compatible(&wrong_pix));

        let wrong_codec = probe_with(vec![video_stream("mpeg4", "yuv420p")], None);
        assert!(!is_reader_compatible(&wrong_codec));
    }

    #[test]
    fn test_audio_stream_is_ignored() {
        let audio = FfprobeStream {
            index: 0,
            codec_name: Some("h264".into()),
            codec_type: Some("audio".into()),
            ..Default::default()
        };
        let mut video = video_stream("hevc", "yuv420p");
        video.index = 1;
        let probe = probe_with(vec![audio, video], None);
        assert_eq!(parse_video_codec(&probe), "hevc");
        assert_eq!(parse_resolution(&probe), (640, 480));
    }

    #[test]
    fn test_no_video_stream_defaults() {
        let probe = probe_with(vec![], None);
        assert_eq!(parse_video_codec(&probe), "");
        assert_eq!(parse_framerate(&probe), 0.0);
        assert_eq!(parse_total_frames(&probe), 0);
        assert!(!is_reader_compatible(&probe));
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_video_not_found() {
        let err = probe_video(Path::new("/definitely/not/here.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, FfmpegError::VideoNotFound(_)));
    }

    #[tokio::test]
    async fn test_reencode_missing_input_is_video_not_found() {
        let err = reencode_video(
            Path::new("/definitely/not/here.avi"),
            Path::new("/tmp/out.mp4"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FfmpegError::VideoNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_raw_frames_with_large_stderr_output() {
        // 256 KiB of stderr is far more than a pipe buffer holds.
        let mut command = tokio::process::Command::new("sh");
        command.args(["-c", "head -c 262144 /dev/zero >&2; printf abcdefghijkl"]);

        let (frames, decoded) = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            read_raw_frames(command, 6, 2, 2.0, &crate::progress::NoProgress),
        )
        .await
        .expect("frame reader stalled on stderr")
        .unwrap();

        assert_eq!(decoded, 2);
        assert_eq!(frames.len(), 1);
        let expected: Vec<f32> = b"abcdef".iter().map(|&b| f32::from(b)).collect();
        assert_eq!(frames[0], expected);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_raw_frames_failed_exit_reports_stderr() {
        let mut command = tokio::process::Command::new("sh");
        command.args(["-c", "echo 'corrupt input' >&2; exit 3"]);

        let err = read_raw_frames(command, 6, 1, 1.0, &crate::progress::NoProgress)
            .await
            .unwrap_err();
        match err {
            FfmpegError::ExecutionFailed { exit_code, stderr } => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("corrupt input"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
