//! Video import and snippet extraction.
//!
//! Imported videos must be H.264/yuv420p `.mp4` files for the downstream
//! video reader; anything else is re-encoded on the way in. Snippets are
//! short clips cut around the stretch of highest motion so annotators label
//! informative frames.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CoreError;
use crate::ffmpeg::{self, FfmpegError};
use crate::motion;
use crate::predictions::PosePredictions;
use crate::progress::ProgressSink;

/// Default snippet length in seconds.
pub const DEFAULT_CLIP_LENGTH_SECS: u32 = 30;
/// Default likelihood threshold for prediction-based motion energy.
pub const DEFAULT_LIKELIHOOD_THRESH: f64 = 0.9;
/// Frames are downscaled to this square size for pixel motion energy.
pub const MOTION_ENERGY_RESIZE_DIMS: u32 = 32;

/// Extensions treated as videos during directory import.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi"];

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to each entry of an imported directory.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryImportReport {
    /// Files copied unchanged (already-compatible videos and non-video files).
    pub copied: Vec<String>,
    /// Videos re-encoded to H.264 `.mp4`.
    pub reencoded: Vec<String>,
    /// Subdirectories that were not descended into.
    pub skipped_dirs: Vec<String>,
    /// Entries whose destination was already present and left untouched.
    pub existing: Vec<String>,
}

/// Options for [`make_video_snippet`].
#[derive(Debug, Clone)]
pub struct SnippetOptions {
    /// Pose predictions; when set, motion is measured on keypoints instead of pixels.
    pub preds_file: Option<PathBuf>,
    pub clip_length_secs: u32,
    pub likelihood_thresh: f64,
    /// Output directory. Defaults to the predictions file's directory, then
    /// the video's.
    pub save_dir: Option<PathBuf>,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        Self {
            preds_file: None,
            clip_length_secs: DEFAULT_CLIP_LENGTH_SECS,
            likelihood_thresh: DEFAULT_LIKELIHOOD_THRESH,
            save_dir: None,
        }
    }
}

/// A produced snippet and where it starts in the source video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetResult {
    pub path: PathBuf,
    pub start_frame: usize,
    pub start_secs: f64,
}

/// File name of a video after import: `.avi` becomes `.mp4`.
pub fn reformatted_name(video_file: &Path) -> Option<PathBuf> {
    let name = PathBuf::from(video_file.file_name()?);
    if has_extension(&name, "avi") {
        Some(name.with_extension("mp4"))
    } else {
        Some(name)
    }
}

/// File name of the snippet cut from `video_file`.
pub fn snippet_name(video_file: &Path) -> Option<PathBuf> {
    let stem = video_file.file_stem()?.to_string_lossy();
    Some(PathBuf::from(format!("{stem}.short.mp4")))
}

/// Frames in a `clip_length_secs` window, or `None` when the whole video
/// fits in one clip.
pub fn snippet_window_len(fps: f64, clip_length_secs: u32, n_frames: usize) -> Option<usize> {
    let win_len = (fps * f64::from(clip_length_secs)) as usize;
    (win_len < n_frames).then_some(win_len)
}

/// First frame of the highest-motion window and its start in whole seconds.
///
/// Falls back to the start of the video when no window is free of `NaN`.
pub fn snippet_start(me: &[f64], win_len: usize, fps: f64) -> (usize, f64) {
    match motion::best_window_start(me, win_len) {
        Some(start_frame) => (start_frame, (start_frame as f64 / fps).floor()),
        None => {
            tracing::warn!(win_len, frames = me.len(), "No valid motion window, snippet starts at 0");
            (0, 0.0)
        }
    }
}

/// Copy one video into `dst_dir`, re-encoding if the format is unsupported.
///
/// Returns the existing destination untouched if it is already present, and
/// `Ok(None)` if the source does not exist. With `remove_old` the source is
/// moved (or deleted after re-encoding) instead of copied.
pub async fn copy_and_reformat_video(
    video_file: &Path,
    dst_dir: &Path,
    remove_old: bool,
) -> Result<Option<PathBuf>, VideoError> {
    let name = reformatted_name(video_file).ok_or_else(|| {
        CoreError::Validation(format!("'{}' has no file name", video_file.display()))
    })?;
    let dst = dst_dir.join(name);

    if dst.is_file() {
        return Ok(Some(dst));
    }
    if !video_file.exists() {
        tracing::info!(src = %video_file.display(), "Source video does not exist, skipping");
        return Ok(None);
    }

    if !ffmpeg::check_codec_format(video_file).await? {
        tracing::info!(src = %video_file.display(), "Re-encoding video for the video reader");
        ffmpeg::reencode_video(video_file, &dst).await?;
        if remove_old {
            tokio::fs::remove_file(video_file).await?;
        }
    } else {
        tokio::fs::create_dir_all(dst_dir).await?;
        if remove_old {
            tokio::fs::rename(video_file, &dst).await?;
        } else {
            tokio::fs::copy(video_file, &dst).await?;
        }
    }

    Ok(Some(dst))
}

/// Copy the top level of `src_dir` into `dst_dir`, re-encoding videos as needed.
///
/// Entries whose destination already exists are left untouched.
pub async fn copy_and_reformat_video_directory(
    src_dir: &Path,
    dst_dir: &Path,
) -> Result<DirectoryImportReport, VideoError> {
    if !src_dir.is_dir() {
        return Err(CoreError::NotFound {
            entity: "Video directory",
            id: src_dir.display().to_string(),
        }
        .into());
    }
    tokio::fs::create_dir_all(dst_dir).await?;

    let mut report = DirectoryImportReport::default();
    let mut entries = tokio::fs::read_dir(src_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let src = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();

        if entry.file_type().await?.is_dir() {
            report.skipped_dirs.push(file_name);
            continue;
        }

        let is_video = VIDEO_EXTENSIONS.iter().any(|ext| has_extension(&src, ext));
        let dst = if is_video {
            dst_dir.join(reformatted_name(&src).unwrap_or_else(|| file_name.clone().into()))
        } else {
            dst_dir.join(&file_name)
        };
        if dst.exists() {
            tracing::debug!(dst = %dst.display(), "Destination exists, skipping");
            report.existing.push(file_name);
            continue;
        }

        if is_video && !ffmpeg::check_codec_format(&src).await? {
            tracing::info!(src = %src.display(), "Re-encoding video for the video reader");
            ffmpeg::reencode_video(&src, &dst).await?;
            report.reencoded.push(file_name);
        } else {
            tokio::fs::copy(&src, &dst).await?;
            report.copied.push(file_name);
        }
    }

    report.copied.sort();
    report.reencoded.sort();
    report.skipped_dirs.sort();
    report.existing.sort();
    Ok(report)
}

/// Cut a `clip_length_secs` clip containing the most movement from a video.
///
/// Videos no longer than the clip are copied whole. Existing snippet files
/// are reused rather than regenerated.
pub async fn make_video_snippet(
    video_file: &Path,
    options: &SnippetOptions,
    progress: &dyn ProgressSink,
) -> Result<SnippetResult, VideoError> {
    let probe = ffmpeg::probe_video(video_file).await?;
    let fps = ffmpeg::parse_framerate(&probe);
    if fps <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Could not determine the frame rate of '{}'",
            video_file.display()
        ))
        .into());
    }
    let n_frames = ffmpeg::parse_total_frames(&probe).max(0) as usize;

    let save_dir = options
        .save_dir
        .clone()
        .or_else(|| options.preds_file.as_deref().and_then(Path::parent).map(Path::to_path_buf))
        .or_else(|| video_file.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let name = snippet_name(video_file).ok_or_else(|| {
        CoreError::Validation(format!("'{}' has no file name", video_file.display()))
    })?;
    let dst = save_dir.join(name);
    tokio::fs::create_dir_all(&save_dir).await?;

    let window = snippet_window_len(fps, options.clip_length_secs, n_frames);
    let (start_frame, start_secs) = match window {
        None => {
            // Short video, use all of it.
            if !dst.exists() {
                tokio::fs::copy(video_file, &dst).await?;
            }
            (0, 0.0)
        }
        Some(win_len) => {
            let me = match &options.preds_file {
                None => {
                    let frames = ffmpeg::read_nth_frames(
                        video_file,
                        1,
                        MOTION_ENERGY_RESIZE_DIMS,
                        progress,
                    )
                    .await?;
                    motion::video_motion_energy(&frames)
                }
                Some(preds_file) => {
                    let preds = PosePredictions::from_csv_path(preds_file)?;
                    motion::predictions_motion_energy(&preds, options.likelihood_thresh)
                }
            };

            let (start_frame, start_secs) = snippet_start(&me, win_len, fps);
            if !dst.exists() {
                ffmpeg::extract_clip(video_file, &dst, start_secs, options.clip_length_secs)
                    .await?;
            }
            (start_frame, start_secs)
        }
    };

    progress.report(100.0);
    tracing::info!(
        video = %video_file.display(),
        snippet = %dst.display(),
        start_frame,
        start_secs,
        "Video snippet ready"
    );

    Ok(SnippetResult {
        path: dst,
        start_frame,
        start_secs,
    })
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::progress::NoProgress;

    #[test]
    fn avi_is_renamed_to_mp4() {
        assert_eq!(
            reformatted_name(Path::new("/data/mouse.avi")),
            Some(PathBuf::from("mouse.mp4"))
        );
        assert_eq!(
            reformatted_name(Path::new("/data/mouse.mp4")),
            Some(PathBuf::from("mouse.mp4"))
        );
        // only the extension counts
        assert_eq!(
            reformatted_name(Path::new("avi.clips/run.avi.mov")),
            Some(PathBuf::from("run.avi.mov"))
        );
    }

    #[test]
    fn snippet_name_uses_stem() {
        assert_eq!(
            snippet_name(Path::new("/v/mouse.avi")),
            Some(PathBuf::from("mouse.short.mp4"))
        );
    }

    #[tokio::test]
    async fn existing_destination_is_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let dst_dir = tmp.path().join("videos");
        std::fs::create_dir_all(&dst_dir).unwrap();
        std::fs::write(dst_dir.join("mouse.mp4"), b"already here").unwrap();

        let dst = copy_and_reformat_video(&tmp.path().join("mouse.avi"), &dst_dir, true)
            .await
            .unwrap();
        assert_eq!(dst, Some(dst_dir.join("mouse.mp4")));
    }

    #[tokio::test]
    async fn missing_source_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dst = copy_and_reformat_video(&tmp.path().join("ghost.mp4"), tmp.path(), false)
            .await
            .unwrap();
        assert_eq!(dst, None);
    }

    #[tokio::test]
    async fn directory_import_copies_non_videos_and_skips_subdirs() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("notes.txt"), b"hello").unwrap();
        std::fs::write(src.join("calib.yaml"), b"k: v").unwrap();
        let dst = tmp.path().join("dst");

        let report = copy_and_reformat_video_directory(&src, &dst).await.unwrap();
        assert_eq!(report.copied, ["calib.yaml", "notes.txt"]);
        assert!(report.reencoded.is_empty());
        assert_eq!(report.skipped_dirs, ["nested"]);
        assert_eq!(std::fs::read(dst.join("notes.txt")).unwrap(), b"hello");
        assert!(!dst.join("nested").exists());
    }

    #[tokio::test]
    async fn directory_import_leaves_existing_destinations() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(src.join("run.avi"), b"raw").unwrap();
        std::fs::write(src.join("notes.txt"), b"new notes").unwrap();
        std::fs::write(src.join("extra.txt"), b"extra").unwrap();
        std::fs::write(dst.join("run.mp4"), b"imported earlier").unwrap();
        std::fs::write(dst.join("notes.txt"), b"old notes").unwrap();

        let report = copy_and_reformat_video_directory(&src, &dst).await.unwrap();
        assert_eq!(report.existing, ["notes.txt", "run.avi"]);
        assert_eq!(report.copied, ["extra.txt"]);
        assert_eq!(std::fs::read(dst.join("run.mp4")).unwrap(), b"imported earlier");
        assert_eq!(std::fs::read(dst.join("notes.txt")).unwrap(), b"old notes");
    }

    #[tokio::test]
    async fn directory_import_of_missing_dir_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = copy_and_reformat_video_directory(&tmp.path().join("nope"), tmp.path())
            .await
            .unwrap_err();
        assert_matches!(err, VideoError::Core(CoreError::NotFound { .. }));
    }

    #[test]
    fn window_len_truncates_fractional_fps() {
        // 29.97 * 30 = 899.1
        assert_eq!(snippet_window_len(29.97, 30, 900), Some(899));
        assert_eq!(snippet_window_len(30.0, 30, 5_000), Some(900));
    }

    #[test]
    fn whole_video_when_clip_covers_it() {
        assert_eq!(snippet_window_len(29.97, 30, 899), None);
        assert_eq!(snippet_window_len(30.0, 30, 900), None);
        assert_eq!(snippet_window_len(30.0, 30, 10), None);
    }

    #[test]
    fn snippet_starts_at_first_frame_of_busiest_window() {
        let mut me = vec![0.0; 200];
        for v in &mut me[100..150] {
            *v = 5.0;
        }
        let (start_frame, start_secs) = snippet_start(&me, 50, 29.97);
        assert_eq!(start_frame, 100);
        // 100 / 29.97 = 3.34
        assert_eq!(start_secs, 3.0);
    }

    #[test]
    fn snippet_start_falls_back_to_zero_without_valid_window() {
        let me = vec![f64::NAN; 120];
        assert_eq!(snippet_start(&me, 30, 30.0), (0, 0.0));
    }

    #[tokio::test]
    async fn snippet_of_missing_video_fails() {
        let err = make_video_snippet(
            Path::new("/no/such/video.mp4"),
            &SnippetOptions::default(),
            &NoProgress,
        )
        .await
        .unwrap_err();
        assert_matches!(err, VideoError::Ffmpeg(FfmpegError::VideoNotFound(_)));
    }
}
