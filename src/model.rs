use serde::Deserialize;

/// The five download targets offered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Q360,
    Q480,
    Q720,
    Q1080,
    Mp3,
}

impl Format {
    /// All targets, in the order the buttons are laid out.
    pub const ALL: [Format; 5] = [
        Format::Q360,
        Format::Q480,
        Format::Q720,
        Format::Q1080,
        Format::Mp3,
    ];

    /// Button label shown in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Format::Q360 => "360p",
            Format::Q480 => "480p",
            Format::Q720 => "720p",
            Format::Q1080 => "1080p",
            Format::Mp3 => "MP3",
        }
    }

    /// Vertical resolution ceiling for video targets; `None` for audio.
    pub fn height_ceiling(self) -> Option<u32> {
        match self {
            Format::Q360 => Some(360),
            Format::Q480 => Some(480),
            Format::Q720 => Some(720),
            Format::Q1080 => Some(1080),
            Format::Mp3 => None,
        }
    }
}

/// One accepted download request. Created on button press, handed to the
/// dispatcher, not retained anywhere.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub format: Format,
}

/// Terminal state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// The single result value produced per request, success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub status: OutcomeStatus,
    /// Resolved video title; present on success.
    pub title: Option<String>,
    pub message: String,
}

impl DownloadOutcome {
    pub fn success(title: String) -> Self {
        Self {
            status: OutcomeStatus::Success,
            title: Some(title),
            message: "Download complete".to_string(),
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            title: None,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Messages a worker sends back to the UI. The UI drains these once per
/// frame; workers never touch view state directly.
#[derive(Debug)]
pub enum UiEvent {
    /// Metadata resolved; the actual transfer is about to start.
    Metadata(VideoMeta),
    /// Fraction of the file transferred so far (0.0 to 1.0).
    Progress(f32),
    /// Terminal result for the request.
    Finished(DownloadOutcome),
}

/// Subset of yt-dlp's `--dump-json` output that the UI cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoMeta {
    #[serde(default = "default_title")]
    pub title: String,
    pub thumbnail: Option<String>,
}

fn default_title() -> String {
    "video".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn labels_match_the_buttons() {
        let labels: Vec<&str> = Format::ALL.iter().map(|f| f.label()).collect();
        assert_eq!(labels, vec!["360p", "480p", "720p", "1080p", "MP3"]);
    }

    #[test]
    fn video_targets_carry_their_numeric_ceiling() {
        assert_eq!(Format::Q360.height_ceiling(), Some(360));
        assert_eq!(Format::Q480.height_ceiling(), Some(480));
        assert_eq!(Format::Q720.height_ceiling(), Some(720));
        assert_eq!(Format::Q1080.height_ceiling(), Some(1080));
        assert_eq!(Format::Mp3.height_ceiling(), None);
    }

    #[test]
    fn success_outcome_carries_title_and_fixed_message() {
        let outcome = DownloadOutcome::success("Demo Song".to_string());
        assert!(outcome.is_success());
        assert_eq!(outcome.title.as_deref(), Some("Demo Song"));
        assert_eq!(outcome.message, "Download complete");
    }

    #[test]
    fn failure_outcome_keeps_the_error_text_verbatim() {
        let outcome = DownloadOutcome::failure("ERROR: Unsupported URL".to_string());
        assert!(!outcome.is_success());
        assert_eq!(outcome.title, None);
        assert_eq!(outcome.message, "ERROR: Unsupported URL");
    }

    #[test]
    fn metadata_decodes_title_and_thumbnail() {
        let json = r#"{"title": "Demo Song", "thumbnail": "https://example.com/t.jpg", "duration": 212}"#;
        let meta: VideoMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.title, "Demo Song");
        assert_eq!(meta.thumbnail.as_deref(), Some("https://example.com/t.jpg"));
    }

    #[test]
    fn metadata_title_falls_back_when_missing() {
        let meta: VideoMeta = serde_json::from_str("{}").unwrap();
        assert_eq!(meta.title, "video");
        assert!(meta.thumbnail.is_none());
    }
}
