use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{SELECTED_TEXT_LIMIT, UNTITLED};
use crate::normalize::{detect_type, normalize_url};

/// The kind of resource a Context tracks. Drives recovery-summary dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Code,
    Document,
    Note,
    Video,
    Email,
    #[default]
    Tab,
}

impl ActivityType {
    pub const ALL: [ActivityType; 6] = [
        ActivityType::Code,
        ActivityType::Document,
        ActivityType::Note,
        ActivityType::Video,
        ActivityType::Email,
        ActivityType::Tab,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Code => "code",
            ActivityType::Document => "document",
            ActivityType::Note => "note",
            ActivityType::Video => "video",
            ActivityType::Email => "email",
            ActivityType::Tab => "tab",
        }
    }

    /// Parse a type tag. Unknown tags fall back to [`ActivityType::Tab`].
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "code" => ActivityType::Code,
            "document" => ActivityType::Document,
            "note" => ActivityType::Note,
            "video" => ActivityType::Video,
            "email" => ActivityType::Email,
            _ => ActivityType::Tab,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a Context.
///
/// ```text
/// Active ──recover──▶ Recovered
///   ▲                    │
///   └──────revisit───────┘
/// Active | Recovered ──archive──▶ Archived (terminal)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    #[default]
    Active,
    Recovered,
    Archived,
}

impl ContextStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextStatus::Active => "active",
            ContextStatus::Recovered => "recovered",
            ContextStatus::Archived => "archived",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "active" => Some(ContextStatus::Active),
            "recovered" => Some(ContextStatus::Recovered),
            "archived" => Some(ContextStatus::Archived),
            _ => None,
        }
    }

    pub fn is_archived(self) -> bool {
        self == ContextStatus::Archived
    }

    pub fn is_recovered(self) -> bool {
        self == ContextStatus::Recovered
    }

    /// Explicit recovery action. Recovering twice is a no-op.
    pub fn recover(self) -> Option<Self> {
        match self {
            ContextStatus::Active | ContextStatus::Recovered => Some(ContextStatus::Recovered),
            ContextStatus::Archived => None,
        }
    }

    /// A fresh visit clears any recovered mark.
    pub fn revisit(self) -> Option<Self> {
        match self {
            ContextStatus::Active | ContextStatus::Recovered => Some(ContextStatus::Active),
            ContextStatus::Archived => None,
        }
    }

    pub fn archive(self) -> Option<Self> {
        match self {
            ContextStatus::Active | ContextStatus::Recovered => Some(ContextStatus::Archived),
            ContextStatus::Archived => None,
        }
    }
}

impl fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page details scraped by the capturing client. Only `headings` is read by
/// the summary templates; everything else is carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub headings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PageMetadata {
    pub fn first_heading(&self) -> Option<&str> {
        self.headings
            .first()
            .map(String::as_str)
            .filter(|h| !h.is_empty())
    }
}

/// One incoming activity sample as delivered by the request layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySample {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub scroll_position: Option<u64>,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub page_metadata: Option<PageMetadata>,
}

impl ActivitySample {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_type(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn with_scroll(mut self, position: u64) -> Self {
        self.scroll_position = Some(position);
        self
    }

    pub fn with_selection(mut self, text: &str) -> Self {
        self.selected_text = Some(text.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: PageMetadata) -> Self {
        self.page_metadata = Some(metadata);
        self
    }

    pub fn normalized_url(&self) -> String {
        normalize_url(&self.url)
    }

    /// Explicit type, or one inferred from the URL's host.
    pub fn resolved_type(&self) -> ActivityType {
        self.activity_type.unwrap_or_else(|| detect_type(&self.url))
    }

    pub fn resolved_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => UNTITLED.to_string(),
        }
    }

    /// Selected text clipped to the stored limit.
    pub fn clipped_selection(&self) -> String {
        clip_chars(self.selected_text.as_deref().unwrap_or(""), SELECTED_TEXT_LIMIT)
    }
}

/// A tracked unit of activity on one logical resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: Option<String>,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub raw_url: String,
    pub normalized_url: String,
    pub title: String,
    pub scroll_position: u64,
    pub selected_text: String,
    pub page_metadata: PageMetadata,
    pub summary: String,
    pub key_points: Vec<String>,
    pub next_steps: Vec<String>,
    pub status: ContextStatus,
    pub enriched: bool,
    pub visit_count: u32,
    pub total_duration: u64,
    pub captured_at: i64,
    pub last_visited: i64,
}

impl Context {
    /// Build the first record for a resource from a sample, stamped `now`.
    /// Derived fields stay empty until enrichment fills them.
    pub fn from_sample(
        user_id: &str,
        session_id: Option<&str>,
        sample: &ActivitySample,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            session_id: session_id.map(str::to_string),
            activity_type: sample.resolved_type(),
            raw_url: sample.url.clone(),
            normalized_url: sample.normalized_url(),
            title: sample.resolved_title(),
            scroll_position: sample.scroll_position.unwrap_or(0),
            selected_text: sample.clipped_selection(),
            page_metadata: sample.page_metadata.clone().unwrap_or_default(),
            summary: String::new(),
            key_points: Vec::new(),
            next_steps: Vec::new(),
            status: ContextStatus::Active,
            enriched: false,
            visit_count: 1,
            total_duration: 0,
            captured_at: now,
            last_visited: now,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status.is_archived()
    }

    pub fn is_recovered(&self) -> bool {
        self.status.is_recovered()
    }

    /// Key used when counting distinct resources: the normalized URL, or the
    /// raw URL for samples that could not be deduplicated.
    pub fn resource_key(&self) -> &str {
        if self.normalized_url.is_empty() {
            &self.raw_url
        } else {
            &self.normalized_url
        }
    }
}

/// Result of a capture: which record absorbed the sample and whether it existed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutcome {
    pub context_id: Uuid,
    pub was_update: bool,
}

/// Truncate to at most `limit` characters on a char boundary.
pub fn clip_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
