//! Motion energy and best-window selection for video snippets.
//!
//! Motion energy is a per-frame scalar describing how much changed since the
//! previous frame, either in raw pixels or in predicted keypoint positions.
//! The snippet shown to annotators is the window with the highest mean
//! motion energy.

use crate::predictions::PosePredictions;

/// Motion energy from decoded frames: summed absolute pixel difference.
///
/// The first frame has zero energy. All frames must have the same length.
pub fn video_motion_energy(frames: &[Vec<f32>]) -> Vec<f64> {
    let mut me = Vec::with_capacity(frames.len());
    if frames.is_empty() {
        return me;
    }
    me.push(0.0);
    for pair in frames.windows(2) {
        let energy: f64 = pair[0]
            .iter()
            .zip(&pair[1])
            .map(|(prev, cur)| f64::from((cur - prev).abs()))
            .sum();
        me.push(energy);
    }
    me
}

/// Motion energy from pose predictions: mean keypoint displacement.
///
/// Observations with a likelihood below `likelihood_thresh` are ignored. A
/// frame where no keypoint is confidently observed in both it and the
/// previous frame gets `NaN`.
pub fn predictions_motion_energy(preds: &PosePredictions, likelihood_thresh: f64) -> Vec<f64> {
    let frames = preds.frames();
    let mut me = Vec::with_capacity(frames.len());
    if frames.is_empty() {
        return me;
    }
    me.push(0.0);
    for pair in frames.windows(2) {
        let (sum, count) = pair[0]
            .iter()
            .zip(&pair[1])
            .filter(|(prev, cur)| {
                prev.is_confident(likelihood_thresh) && cur.is_confident(likelihood_thresh)
            })
            .map(|(prev, cur)| (cur.x - prev.x).hypot(cur.y - prev.y))
            .filter(|d| !d.is_nan())
            .fold((0.0, 0usize), |(s, c), d| (s + d, c + 1));
        me.push(if count == 0 { f64::NAN } else { sum / count as f64 });
    }
    me
}

/// First frame of the `win_len`-frame window with the highest mean energy.
///
/// Windows that run off the start of the series or contain `NaN` are not
/// candidates. Ties resolve to the earliest window. Returns `None` when
/// there is no candidate window at all.
pub fn best_window_start(me: &[f64], win_len: usize) -> Option<usize> {
    if win_len == 0 || win_len > me.len() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (start, window) in me.windows(win_len).enumerate() {
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / win_len as f64;
        match best {
            Some((_, best_mean)) if mean <= best_mean => {}
            _ => best = Some((start, mean)),
        }
    }
    best.map(|(start, _)| start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictions::Observation;

    fn obs(x: f64, y: f64, likelihood: f64) -> Observation {
        Observation { x, y, likelihood }
    }

    #[test]
    fn pixel_energy_is_abs_diff_sum() {
        let frames = vec![vec![0.0, 0.0], vec![1.0, -2.0], vec![1.0, -2.0]];
        assert_eq!(video_motion_energy(&frames), vec![0.0, 3.0, 0.0]);
    }

    #[test]
    fn pixel_energy_of_empty_video() {
        assert!(video_motion_energy(&[]).is_empty());
    }

    #[test]
    fn keypoint_energy_averages_confident_keypoints() {
        let preds = PosePredictions::new(
            vec!["nose".into(), "tail".into()],
            vec![
                vec![obs(0.0, 0.0, 1.0), obs(0.0, 0.0, 1.0)],
                vec![obs(3.0, 4.0, 1.0), obs(0.0, 1.0, 1.0)],
                vec![obs(3.0, 4.0, 1.0), obs(100.0, 100.0, 0.1)],
            ],
        );
        let me = predictions_motion_energy(&preds, 0.9);
        assert_eq!(me[0], 0.0);
        assert!((me[1] - 3.0).abs() < 1e-9);
        // tail is below threshold in the last frame, nose did not move
        assert_eq!(me[2], 0.0);
    }

    #[test]
    fn keypoint_energy_nan_when_nothing_confident() {
        let preds = PosePredictions::new(
            vec!["nose".into()],
            vec![vec![obs(0.0, 0.0, 0.2)], vec![obs(1.0, 1.0, 0.2)]],
        );
        let me = predictions_motion_energy(&preds, 0.9);
        assert!(me[1].is_nan());
    }

    #[test]
    fn best_window_picks_highest_mean() {
        let me = [0.0, 1.0, 1.0, 5.0, 6.0, 0.0, 0.0];
        assert_eq!(best_window_start(&me, 2), Some(3));
        assert_eq!(best_window_start(&me, 3), Some(2));
    }

    #[test]
    fn best_window_skips_nan_windows() {
        let me = [0.0, f64::NAN, 9.0, 1.0, 1.0];
        assert_eq!(best_window_start(&me, 2), Some(2));
    }

    #[test]
    fn best_window_none_when_no_candidates() {
        assert_eq!(best_window_start(&[f64::NAN, f64::NAN], 1), None);
        assert_eq!(best_window_start(&[1.0], 2), None);
        assert_eq!(best_window_start(&[1.0], 0), None);
    }

    #[test]
    fn best_window_ties_resolve_to_earliest() {
        assert_eq!(best_window_start(&[2.0, 2.0, 2.0], 1), Some(0));
    }
}
