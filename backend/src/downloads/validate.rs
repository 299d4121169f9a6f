//! Sanity checks for generated media

use image::ImageFormat;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// True when `path` is a file larger than `min_bytes`
pub fn validate_file_exists(path: &Path, min_bytes: u64) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > min_bytes)
        .unwrap_or(false)
}

fn path_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Path> {
    fields.get(key).and_then(Value::as_str).map(Path::new)
}

/// Size thresholds used when validating generated files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputValidator {
    /// Smallest acceptable storyboard image, exclusive
    pub min_image_bytes: u64,
    /// Smallest acceptable video, exclusive
    pub min_video_bytes: u64,
}

impl Default for OutputValidator {
    // Placeholder media is tiny, so the defaults only reject empty files.
    fn default() -> Self {
        Self {
            min_image_bytes: 64,
            min_video_bytes: 16,
        }
    }
}

impl OutputValidator {
    /// Thresholds for real rendered media
    pub fn strict() -> Self {
        Self {
            min_image_bytes: 20_000,
            min_video_bytes: 1_000_000,
        }
    }

    pub fn validate_storyboard_image(&self, path: &Path) -> bool {
        if !validate_file_exists(path, self.min_image_bytes) {
            return false;
        }
        match fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                image::load_from_memory_with_format(&bytes, ImageFormat::Png)
                    .map_err(|e| e.to_string())
            }) {
            Ok(image) => image.height() > 0,
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "Storyboard image failed to decode");
                false
            }
        }
    }

    pub fn validate_video_output(&self, path: &Path) -> bool {
        if !validate_file_exists(path, self.min_video_bytes) {
            return false;
        }
        match fs::read(path) {
            Ok(bytes) => bytes.len() >= 8 && &bytes[4..8] == b"ftyp",
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "Video output unreadable");
                false
            }
        }
    }

    /// Check an agent's result
    ///
    /// Results that name an output file (`storyboard_image`, `output_video`) have
    /// that file checked. Other results only need to be JSON objects.
    pub fn validate_agent_output(&self, agent_id: &str, result: &Value) -> bool {
        let Value::Object(fields) = result else {
            return false;
        };
        match agent_id {
            "storyboard-agent" => path_field(fields, "storyboard_image")
                .map(|path| self.validate_storyboard_image(path))
                .unwrap_or(true),
            "video-agent" => path_field(fields, "output_video")
                .map(|path| self.validate_video_output(path))
                .unwrap_or(true),
            _ => true,
        }
    }
}
