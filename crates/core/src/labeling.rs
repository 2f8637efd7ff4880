//! Label Studio labeling configuration for keypoint annotation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Default file name of the labeling config inside a project directory.
pub const LABELING_CONFIG_FILENAME: &str = "label_config.xml";

/// Separator used when keypoints are passed as a single string.
pub const KEYPOINT_SEPARATOR: char = '/';

/// Split a `/`-separated keypoint list such as `"nose/ear_l/ear_r"`.
pub fn parse_keypoints_list(list: &str) -> Result<Vec<String>, CoreError> {
    let keypoints: Vec<String> = list
        .split(KEYPOINT_SEPARATOR)
        .map(|k| k.trim().to_string())
        .collect();
    validate_keypoints(&keypoints)?;
    Ok(keypoints)
}

/// Keypoint names must be non-empty and unique, and there must be at least one.
pub fn validate_keypoints(keypoints: &[String]) -> Result<(), CoreError> {
    if keypoints.is_empty() {
        return Err(CoreError::Validation(
            "At least one keypoint is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for name in keypoints {
        if name.trim().is_empty() {
            return Err(CoreError::Validation(
                "Keypoint names must not be empty".to_string(),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate keypoint name: '{name}'"
            )));
        }
    }
    Ok(())
}

/// Build the keypoint labeling interface XML for the given body parts.
pub fn build_labeling_config(keypoints: &[String]) -> String {
    let mut xml = String::from(
        "<!--Basic keypoint image labeling configuration for multiple regions-->",
    );
    xml.push_str("\n<View>");
    xml.push_str(
        "\n<Header value=\"Select keypoint name with the cursor/number button, \
         then click on the image.\"/>",
    );
    xml.push_str("\n<Text name=\"text1\" value=\"Save annotations: click Submit (or CTRL+ENTER)\"/>");
    xml.push_str(
        "\n<Text name=\"text2\" value=\"Manipulate image: press H for hand tool, \
         \nCTRL+ to zoom in and CTRL- to zoom out\"/>",
    );
    xml.push_str("\n<Text name=\"text3\" value=\"Next frame: SHIFT+DOWN, then SHIFT+RIGHT\"/>");
    xml.push_str(
        "\n<Text name=\"text4\" value=\"To copy keypoints to another frame: hold CTRL \
         and select all keypoints; CTRL+c to copy; move to new frame; CTRL+v to paste\"/>",
    );
    xml.push_str("\n  <KeyPointLabels name=\"kp-1\" toName=\"img-1\" strokeWidth=\"3\">");
    for keypoint in keypoints {
        xml.push_str(&format!(
            "\n    <Label value=\"{}\" />",
            escape_attribute(keypoint)
        ));
    }
    xml.push_str("\n  </KeyPointLabels>");
    xml.push_str("\n  <Image name=\"img-1\" value=\"$img\" />");
    xml.push_str("\n</View>");
    xml
}

/// Validate `keypoints`, then write the config to `proj_dir/filename`.
pub fn write_labeling_config(
    proj_dir: &Path,
    filename: &str,
    keypoints: &[String],
) -> Result<PathBuf, CoreError> {
    validate_keypoints(keypoints)?;
    std::fs::create_dir_all(proj_dir)?;
    let path = proj_dir.join(filename);
    std::fs::write(&path, build_labeling_config(keypoints))?;
    tracing::info!(path = %path.display(), n_keypoints = keypoints.len(), "Wrote labeling config");
    Ok(path)
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
