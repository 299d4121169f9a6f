//! Downloadable exports
//!
//! Turns a job's results into files a client can fetch: data exports (JSON, CSV,
//! XML, a text report, a ZIP bundle) and placeholder media (MP4, WAV, PNG).
//! Generated files live in the downloads directory until they expire.

pub mod formats;
pub mod media;
pub mod service;
pub mod validate;

pub use service::{format_file_size, DownloadItem, DownloadService, DownloadStatus};
pub use validate::OutputValidator;

use crate::agents::MediaClass;
use crate::state::ProcessingJob;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while generating a download
#[derive(Error, Debug)]
pub enum ExportError {
    /// Format is unknown or not offered for the job
    #[error("Unsupported format: {0}")]
    Unsupported(String),

    /// CSV writer failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XML writer failed
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive failed
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// PNG encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// WAV encoding failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// JSON encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generated file did not pass output validation
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Every format a download can be generated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadFormat {
    /// Full results as JSON
    Json,
    /// Flattened results as CSV
    Csv,
    /// Results as XML
    Xml,
    /// Text report
    Report,
    /// Bundle of every data format plus a README
    Zip,
    /// Placeholder enhanced MP4
    EnhancedVideo,
    /// Placeholder enhanced WAV
    EnhancedAudio,
    /// Placeholder enhanced PNG
    EnhancedImage,
    /// Storyboard grid PNG
    Storyboard,
}

impl DownloadFormat {
    pub const ALL: [DownloadFormat; 9] = [
        DownloadFormat::Json,
        DownloadFormat::Csv,
        DownloadFormat::Xml,
        DownloadFormat::Report,
        DownloadFormat::Zip,
        DownloadFormat::EnhancedVideo,
        DownloadFormat::EnhancedAudio,
        DownloadFormat::EnhancedImage,
        DownloadFormat::Storyboard,
    ];

    /// Wire name, e.g. `enhanced_video`
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFormat::Json => "json",
            DownloadFormat::Csv => "csv",
            DownloadFormat::Xml => "xml",
            DownloadFormat::Report => "report",
            DownloadFormat::Zip => "zip",
            DownloadFormat::EnhancedVideo => "enhanced_video",
            DownloadFormat::EnhancedAudio => "enhanced_audio",
            DownloadFormat::EnhancedImage => "enhanced_image",
            DownloadFormat::Storyboard => "storyboard",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::Json => "json",
            DownloadFormat::Csv => "csv",
            DownloadFormat::Xml => "xml",
            DownloadFormat::Report => "txt",
            DownloadFormat::Zip => "zip",
            DownloadFormat::EnhancedVideo => "mp4",
            DownloadFormat::EnhancedAudio => "wav",
            DownloadFormat::EnhancedImage | DownloadFormat::Storyboard => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DownloadFormat::Json => "application/json",
            DownloadFormat::Csv => "text/csv",
            DownloadFormat::Xml => "application/xml",
            DownloadFormat::Report => "text/plain",
            DownloadFormat::Zip => "application/zip",
            DownloadFormat::EnhancedVideo => "video/mp4",
            DownloadFormat::EnhancedAudio => "audio/wav",
            DownloadFormat::EnhancedImage | DownloadFormat::Storyboard => "image/png",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DownloadFormat::Json => "JSON Data",
            DownloadFormat::Csv => "CSV Data",
            DownloadFormat::Xml => "XML Data",
            DownloadFormat::Report => "Processing Report",
            DownloadFormat::Zip => "Complete Package",
            DownloadFormat::EnhancedVideo => "Enhanced Video",
            DownloadFormat::EnhancedAudio => "Enhanced Audio",
            DownloadFormat::EnhancedImage => "Enhanced Image",
            DownloadFormat::Storyboard => "Storyboard",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DownloadFormat::Json => "Complete processing results in JSON format",
            DownloadFormat::Csv => "Processing metrics in spreadsheet format",
            DownloadFormat::Xml => "Structured data in XML format",
            DownloadFormat::Report => "Human-readable processing summary",
            DownloadFormat::Zip => "All files and data in one ZIP archive",
            DownloadFormat::EnhancedVideo => "AI-enhanced video with improvements",
            DownloadFormat::EnhancedAudio => "AI-optimized audio with noise reduction",
            DownloadFormat::EnhancedImage => "AI-enhanced image with improvements",
            DownloadFormat::Storyboard => "Generated storyboard with key frames",
        }
    }

    /// `source`, `data` or `archive`
    pub fn category(&self) -> &'static str {
        match self {
            DownloadFormat::Zip => "archive",
            f if f.is_media() => "source",
            _ => "data",
        }
    }

    /// Placeholder media rather than a results export
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            DownloadFormat::EnhancedVideo
                | DownloadFormat::EnhancedAudio
                | DownloadFormat::EnhancedImage
                | DownloadFormat::Storyboard
        )
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "complete_package" => Ok(DownloadFormat::Zip),
            "pdf" | "txt" => Ok(DownloadFormat::Report),
            other => DownloadFormat::ALL
                .into_iter()
                .find(|f| f.as_str() == other)
                .ok_or_else(|| ExportError::Unsupported(s.to_string())),
        }
    }
}

/// One entry of the download menu for a job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOption {
    /// Format offered
    pub format: DownloadFormat,
    /// Menu label
    pub label: &'static str,
    pub description: &'static str,
    /// `data`, `archive` or `source`
    pub category: &'static str,
    pub mime_type: &'static str,
    pub file_extension: &'static str,
}

impl From<DownloadFormat> for DownloadOption {
    fn from(format: DownloadFormat) -> Self {
        Self {
            format,
            label: format.label(),
            description: format.description(),
            category: format.category(),
            mime_type: format.mime_type(),
            file_extension: format.extension(),
        }
    }
}

/// Formats offered for a job, media first
pub fn download_options(job: &ProcessingJob) -> Vec<DownloadOption> {
    let mut formats = Vec::new();
    match MediaClass::from_mime(&job.file_type) {
        MediaClass::Video => {
            formats.push(DownloadFormat::EnhancedVideo);
            formats.push(DownloadFormat::EnhancedAudio);
            if job.results.contains_key("storyboard-agent") {
                formats.push(DownloadFormat::Storyboard);
            }
        }
        MediaClass::Audio => formats.push(DownloadFormat::EnhancedAudio),
        MediaClass::Image if job.file_type.starts_with("image/") => {
            formats.push(DownloadFormat::EnhancedImage)
        }
        MediaClass::Image => {}
    }
    formats.extend([
        DownloadFormat::Json,
        DownloadFormat::Csv,
        DownloadFormat::Xml,
        DownloadFormat::Report,
        DownloadFormat::Zip,
    ]);
    formats.into_iter().map(DownloadOption::from).collect()
}

fn default_true() -> bool {
    true
}

/// Body of a download generation request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Requested format
    pub format: DownloadFormat,
    /// Add job metadata to data exports (default true)
    #[serde(default = "default_true")]
    pub include_metadata: bool,
    /// Only export these agents' results
    #[serde(default)]
    pub selected_agents: Option<Vec<String>>,
}

impl DownloadRequest {
    /// Request for `format` with metadata and every agent
    pub fn new(format: DownloadFormat) -> Self {
        Self {
            format,
            include_metadata: true,
            selected_agents: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FileSubmission;
    use serde_json::json;

    fn job(file_type: &str) -> ProcessingJob {
        ProcessingJob::new(FileSubmission {
            file_name: "input.bin".to_string(),
            file_type: file_type.to_string(),
            file_size: None,
            file_path: None,
        })
    }

    fn formats(job: &ProcessingJob) -> Vec<DownloadFormat> {
        download_options(job).into_iter().map(|o| o.format).collect()
    }

    #[test]
    fn test_video_options() {
        let mut video = job("video/mp4");
        assert_eq!(
            formats(&video)[..2],
            [DownloadFormat::EnhancedVideo, DownloadFormat::EnhancedAudio]
        );
        assert!(!formats(&video).contains(&DownloadFormat::Storyboard));

        video
            .results
            .insert("storyboard-agent".to_string(), json!({ "scenes": 9 }));
        assert!(formats(&video).contains(&DownloadFormat::Storyboard));
    }

    #[test]
    fn test_audio_and_image_options() {
        assert_eq!(formats(&job("audio/wav"))[0], DownloadFormat::EnhancedAudio);
        assert_eq!(formats(&job("image/png"))[0], DownloadFormat::EnhancedImage);
        // Every job gets the five data exports
        let other = formats(&job("application/pdf"));
        assert_eq!(other.len(), 5);
        assert_eq!(other[4], DownloadFormat::Zip);
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(
            "complete_package".parse::<DownloadFormat>().unwrap(),
            DownloadFormat::Zip
        );
        assert_eq!(
            "Enhanced_Video".parse::<DownloadFormat>().unwrap(),
            DownloadFormat::EnhancedVideo
        );
        assert!("gif".parse::<DownloadFormat>().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request: DownloadRequest = serde_json::from_value(json!({ "format": "csv" })).unwrap();
        assert!(request.include_metadata);
        assert_eq!(request.selected_agents, None);
    }

    #[test]
    fn test_option_serialization() {
        let option = DownloadOption::from(DownloadFormat::Report);
        let value = serde_json::to_value(&option).unwrap();
        assert_eq!(value["format"], "report");
        assert_eq!(value["fileExtension"], "txt");
        assert_eq!(value["mimeType"], "text/plain");
        assert_eq!(value["category"], "data");
    }
}
