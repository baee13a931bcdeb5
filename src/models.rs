use bytes::Bytes;
use base64::Engine;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Chat-side identifier of a user. Private chats share the id of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Handle to a message we sent, used to edit or delete it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Idle,
    AwaitingPlatform,
    AwaitingTone,
    AwaitingServices,
    AwaitingContext,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::AwaitingPlatform => "awaiting_platform",
            Step::AwaitingTone => "awaiting_tone",
            Step::AwaitingServices => "awaiting_services",
            Step::AwaitingContext => "awaiting_context",
        }
    }
}

// --- Choice sets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub key: &'static str,
    pub label: &'static str,
}

pub const PLATFORMS: &[Choice] = &[
    Choice { key: "LinkedIn", label: "LinkedIn" },
    Choice { key: "Instagram", label: "Instagram" },
    Choice { key: "Facebook", label: "Facebook" },
    Choice { key: "X", label: "X (Twitter)" },
];

pub const TONES: &[Choice] = &[
    Choice { key: "Professional", label: "Professional" },
    Choice { key: "Enthusiastic", label: "Enthusiastic" },
    Choice { key: "Luxury", label: "Luxury" },
    Choice { key: "Technical", label: "Technical" },
];

pub const SERVICES: &[Choice] = &[
    Choice { key: "OEM", label: "OEM / Private Label" },
    Choice { key: "Custom", label: "Custom Branding" },
    Choice { key: "Bulk", label: "Bulk Manufacturing" },
    Choice { key: "Fabric", label: "Premium Fabric" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Platform,
    Tone,
    Service,
}

impl Category {
    /// Prefix used in button payloads, e.g. `platform:LinkedIn`.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::Platform => "platform",
            Category::Tone => "tone",
            Category::Service => "service",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "platform" => Some(Category::Platform),
            "tone" => Some(Category::Tone),
            "service" => Some(Category::Service),
            _ => None,
        }
    }

    pub fn choices(self) -> &'static [Choice] {
        match self {
            Category::Platform => PLATFORMS,
            Category::Tone => TONES,
            Category::Service => SERVICES,
        }
    }

    pub fn contains(self, key: &str) -> bool {
        self.choices().iter().any(|c| c.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    DoneServices,
    SkipContext,
}

impl ControlAction {
    pub fn key(self) -> &'static str {
        match self {
            ControlAction::DoneServices => "done_services",
            ControlAction::SkipContext => "skip_context",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "done_services" => Some(ControlAction::DoneServices),
            "skip_context" => Some(ControlAction::SkipContext),
            _ => None,
        }
    }
}

// --- Image ---

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,
    #[error("unrecognized image format")]
    UnknownFormat,
}

/// Raw photo bytes plus the media type sniffed from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Bytes,
    pub media_type: String,
}

impl ImageData {
    pub fn detect(bytes: Bytes) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let format = image::guess_format(&bytes).map_err(|_| ImageError::UnknownFormat)?;
        Ok(Self {
            media_type: format.to_mime_type().to_string(),
            bytes,
        })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

// --- Per-user conversation record ---

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identifies one generation run so a late result can be matched to the cycle that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
    pub fn next() -> Self {
        Self(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub step: Step,
    pub image: Option<ImageData>,
    pub platform: Option<String>,
    pub tone: Option<String>,
    pub services: Vec<String>,
    /// Empty means the user skipped the step.
    pub freeform_context: String,
    pub pending_prompt: Option<MessageRef>,
    pub in_flight: Option<GenerationTicket>,
}

impl UserState {
    /// Adds the service if absent, removes it if present.
    pub fn toggle_service(&mut self, key: &str) {
        if let Some(pos) = self.services.iter().position(|s| s == key) {
            self.services.remove(pos);
        } else {
            self.services.push(key.to_string());
        }
    }

    pub fn brief(&self) -> Option<ContentBrief> {
        Some(ContentBrief {
            platform: self.platform.clone()?,
            tone: self.tone.clone()?,
            services: self.services.clone(),
            context: self.freeform_context.clone(),
        })
    }
}

/// The answers collected during one guided cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBrief {
    pub platform: String,
    pub tone: String,
    pub services: Vec<String>,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub ticket: GenerationTicket,
    pub image: ImageData,
    pub brief: ContentBrief,
}

// --- Generation output ---

/// Shape the structured call is constrained to return.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaptionSet {
    pub caption1: String,
    pub caption2: String,
    pub caption3: String,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub captions: [String; 3],
    pub hashtags: Vec<String>,
    pub feedback: String,
}

impl GenerationResult {
    pub fn new(set: CaptionSet, feedback: String) -> Self {
        Self {
            captions: [set.caption1, set.caption2, set.caption3],
            hashtags: set.hashtags,
            feedback,
        }
    }
}
