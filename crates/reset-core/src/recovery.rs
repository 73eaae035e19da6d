//! Templated recovery summaries, one generator per activity type.
//!
//! Each generator reads only the title, URL and first page heading, so the
//! output is deterministic for a given Context. Provider special cases cover
//! code hosting (`/pull/`, `/issues/`, `/blob/`) and hosted documents
//! (`/spreadsheets/`, `/presentation/`).

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::EXCERPT_LIMIT;
use crate::context::{ActivityType, Context, PageMetadata, clip_chars};
use crate::normalize::domain_or_unknown;

/// `/owner/repo` at the start of a code-host path.
static REPO_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([^/]+)/([^/]+)").unwrap());

/// The three summary fields written onto a Context at creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySummary {
    pub summary: String,
    pub key_points: Vec<String>,
    pub next_steps: Vec<String>,
}

impl RecoverySummary {
    /// Last-resort summary when nothing about the Context can be templated.
    pub fn minimal(title: Option<&str>) -> Self {
        let title = title.filter(|t| !t.is_empty()).unwrap_or("a page");
        Self {
            summary: format!("You were viewing: {title}"),
            key_points: vec!["Continue where you left off".to_string()],
            next_steps: vec!["Review your previous work".to_string()],
        }
    }
}

/// URL pieces the templates branch on.
struct Target<'a> {
    title: &'a str,
    domain: String,
    path: String,
    metadata: &'a PageMetadata,
}

impl<'a> Target<'a> {
    fn new(ctx: &'a Context) -> Self {
        let path = Url::parse(&ctx.raw_url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();
        Self {
            title: &ctx.title,
            domain: domain_or_unknown(&ctx.raw_url),
            path,
            metadata: &ctx.page_metadata,
        }
    }

    fn on(&self, host: &str) -> bool {
        self.domain == host || self.domain.ends_with(&format!(".{host}"))
    }

    fn path_has(&self, segment: &str) -> bool {
        self.path.contains(segment)
    }
}

/// Generate the summary triple for a Context, dispatched on its type.
///
/// Never fails: a Context with an unparseable URL still gets a generic,
/// domain-based summary.
pub fn generate_recovery(ctx: &Context) -> RecoverySummary {
    let target = Target::new(ctx);
    let mut result = match ctx.activity_type {
        ActivityType::Code => code_summary(&target),
        ActivityType::Document => document_summary(&target),
        ActivityType::Note => note_summary(&target),
        ActivityType::Video => video_summary(&target),
        ActivityType::Email => email_summary(&target),
        ActivityType::Tab => tab_summary(&target),
    };

    if !ctx.selected_text.is_empty() {
        let excerpt = clip_chars(&ctx.selected_text, EXCERPT_LIMIT);
        result
            .key_points
            .push(format!("Selected text: \"{excerpt}...\""));
    }

    result
}

fn code_summary(t: &Target) -> RecoverySummary {
    let mut summary = format!("Working on code at {}", t.domain);
    let mut key_points = Vec::new();
    let mut next_steps = Vec::new();

    if t.on("github.com") {
        let repo = REPO_PATH
            .captures(&t.path)
            .map(|c| (c[1].to_string(), c[2].to_string()));
        if let Some((owner, name)) = &repo {
            summary = format!("Working on {owner}/{name}");
            key_points.push(format!("Repository: {name}"));
        }
        let in_repo = repo
            .as_ref()
            .map(|(owner, name)| format!(" in {owner}/{name}"))
            .unwrap_or_default();

        let activity = if t.path_has("/pull/") {
            Some(("Reviewing a pull request", "Complete code review"))
        } else if t.path_has("/issues/") {
            Some(("Working on an issue", "Continue issue resolution"))
        } else if t.path_has("/blob/") {
            Some(("Viewing source code", "Continue code review"))
        } else {
            None
        };
        if let Some((point, step)) = activity {
            summary = format!("{point}{in_repo}");
            key_points.push(point.to_string());
            next_steps.push(step.to_string());
        }
    } else if t.on("stackoverflow.com") {
        summary = "Researching a coding solution".to_string();
        key_points.push("Looking up Stack Overflow".to_string());
        next_steps.push("Apply the solution to your code".to_string());
    }

    if let Some(heading) = t.metadata.first_heading() {
        key_points.push(format!("Topic: {heading}"));
    }
    if key_points.is_empty() {
        key_points.push(format!("Page: {}", t.title));
    }
    if next_steps.is_empty() {
        next_steps.push("Continue your coding task".to_string());
    }

    RecoverySummary {
        summary,
        key_points,
        next_steps,
    }
}

fn document_summary(t: &Target) -> RecoverySummary {
    let mut summary = format!("Editing document: {}", t.title);
    let mut key_points = vec![format!("Document: {}", t.title)];
    let mut next_step = "Continue editing your document";

    if t.on("docs.google.com") {
        summary = format!("Working in Google Docs: {}", t.title);
        if t.path_has("/spreadsheets/") {
            key_points.push("Google Sheet".to_string());
            next_step = "Continue your spreadsheet work";
        } else if t.path_has("/presentation/") {
            key_points.push("Google Slides".to_string());
            next_step = "Continue your presentation";
        }
    } else if t.on("notion.so") {
        summary = format!("Working in Notion: {}", t.title);
        key_points.push("Notion page".to_string());
    }

    RecoverySummary {
        summary,
        key_points,
        next_steps: vec![next_step.to_string()],
    }
}

fn note_summary(t: &Target) -> RecoverySummary {
    RecoverySummary {
        summary: format!("Taking notes: {}", t.title),
        key_points: vec![format!("Note: {}", t.title)],
        next_steps: vec!["Continue adding to your notes".to_string()],
    }
}

fn video_summary(t: &Target) -> RecoverySummary {
    RecoverySummary {
        summary: format!("Watching video: {}", t.title),
        key_points: vec![format!("Video: {}", t.title)],
        next_steps: vec!["Continue watching or take notes".to_string()],
    }
}

fn email_summary(t: &Target) -> RecoverySummary {
    RecoverySummary {
        summary: format!("Email: {}", t.title),
        key_points: vec!["Managing email".to_string()],
        next_steps: vec!["Respond or follow up on email".to_string()],
    }
}

fn tab_summary(t: &Target) -> RecoverySummary {
    let mut key_points = vec![format!("Site: {}", t.domain)];
    if let Some(heading) = t.metadata.first_heading() {
        key_points.push(format!("Topic: {heading}"));
    }
    RecoverySummary {
        summary: format!("Browsing: {}", t.title),
        key_points,
        next_steps: vec!["Continue reading".to_string()],
    }
}
