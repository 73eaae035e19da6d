//! Narrative "where was I" resume built from a user's most recent Contexts.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::context::{ActivityType, Context};
use crate::normalize::domain_or_unknown;
use crate::predict::Confidence;

/// Number of Contexts echoed back as workspaces.
const WORKSPACE_LIMIT: usize = 5;

/// Tab-typed Contexts needed before the absence reads as broad research.
const RESEARCH_TAB_THRESHOLD: usize = 3;

/// More Contexts than this makes the resume high confidence.
const HIGH_CONFIDENCE_CONTEXTS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRef {
    pub title: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub url: String,
    pub visit_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInsights {
    pub unique_domains: usize,
    pub total_workspaces: usize,
    pub recovered_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveResume {
    pub what_you_were_doing: String,
    pub why_you_were_doing_it: String,
    pub next_logical_step: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absence_duration: Option<String>,
    pub workspaces: Vec<WorkspaceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<ResumeInsights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl CognitiveResume {
    fn no_activity() -> Self {
        Self {
            what_you_were_doing: "No recent activity found".to_string(),
            why_you_were_doing_it: "Start a new task".to_string(),
            next_logical_step: "Begin your work session".to_string(),
            absence_duration: None,
            workspaces: Vec::new(),
            insights: None,
            confidence: None,
        }
    }
}

/// "3 hours" for absences of at least an hour, otherwise whole minutes.
pub fn absence_label(absence_ms: u64) -> String {
    let hours = absence_ms / 3_600_000;
    if hours > 0 {
        format!("{hours} hours")
    } else {
        format!("{} minutes", absence_ms / 60_000)
    }
}

fn infer_purpose(contexts: &[Context]) -> &'static str {
    let has = |ty: ActivityType| contexts.iter().any(|c| c.activity_type == ty);
    let tabs = contexts
        .iter()
        .filter(|c| c.activity_type == ActivityType::Tab)
        .count();

    if has(ActivityType::Code) {
        "You were likely debugging or implementing a feature"
    } else if has(ActivityType::Document) {
        "You were working on documentation or writing"
    } else if tabs > RESEARCH_TAB_THRESHOLD {
        "You were researching across multiple sources"
    } else {
        "Based on your workflow pattern"
    }
}

/// Build the resume. `contexts` is most-recent first; the first one is the
/// primary Context the narrative is anchored on.
pub fn deep_cognitive_resume(contexts: &[Context], absence_ms: u64) -> CognitiveResume {
    let Some(primary) = contexts.first() else {
        return CognitiveResume::no_activity();
    };

    let what = [primary.summary.as_str(), primary.title.as_str()]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("Working on multiple tasks");
    let next = primary
        .next_steps
        .first()
        .filter(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or("Continue where you left off");

    let domains: HashSet<String> = contexts
        .iter()
        .map(|c| domain_or_unknown(&c.raw_url))
        .collect();

    CognitiveResume {
        what_you_were_doing: what.to_string(),
        why_you_were_doing_it: infer_purpose(contexts).to_string(),
        next_logical_step: next.to_string(),
        absence_duration: Some(absence_label(absence_ms)),
        workspaces: contexts
            .iter()
            .take(WORKSPACE_LIMIT)
            .map(|c| WorkspaceRef {
                title: c.title.clone(),
                activity_type: c.activity_type,
                url: c.raw_url.clone(),
                visit_count: c.visit_count.max(1),
            })
            .collect(),
        insights: Some(ResumeInsights {
            unique_domains: domains.len(),
            total_workspaces: contexts.len(),
            recovered_count: contexts.iter().filter(|c| c.is_recovered()).count(),
        }),
        confidence: Some(if contexts.len() > HIGH_CONFIDENCE_CONTEXTS {
            Confidence::High
        } else {
            Confidence::Medium
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ActivitySample, ContextStatus};

    fn ctx(url: &str, ty: ActivityType) -> Context {
        let sample = ActivitySample::new(url).with_type(ty).with_title("Page");
        Context::from_sample("u1", None, &sample, 0)
    }

    #[test]
    fn test_empty_input_is_fixed() {
        let r = deep_cognitive_resume(&[], 10_000);
        assert_eq!(r.what_you_were_doing, "No recent activity found");
        assert_eq!(r.why_you_were_doing_it, "Start a new task");
        assert_eq!(r.next_logical_step, "Begin your work session");
        assert!(r.workspaces.is_empty());
        assert!(r.insights.is_none());
        let json = serde_json::to_value(&r).unwrap();
        assert!(json.get("confidence").is_none());
        assert_eq!(json["workspaces"], serde_json::json!([]));
    }

    #[test]
    fn test_code_wins_purpose() {
        let contexts = vec![
            ctx("https://a.com", ActivityType::Tab),
            ctx("https://b.com", ActivityType::Document),
            ctx("https://github.com/x/y", ActivityType::Code),
        ];
        let r = deep_cognitive_resume(&contexts, 0);
        assert_eq!(
            r.why_you_were_doing_it,
            "You were likely debugging or implementing a feature"
        );
    }

    #[test]
    fn test_document_purpose_without_code() {
        let contexts = vec![
            ctx("https://docs.google.com/document/d/1", ActivityType::Document),
            ctx("https://a.com", ActivityType::Tab),
        ];
        let r = deep_cognitive_resume(&contexts, 0);
        assert_eq!(
            r.why_you_were_doing_it,
            "You were working on documentation or writing"
        );
    }

    #[test]
    fn test_research_needs_more_than_three_tabs() {
        let three: Vec<Context> = ["a", "b", "c"]
            .iter()
            .map(|h| ctx(&format!("https://{h}.com"), ActivityType::Tab))
            .collect();
        let r = deep_cognitive_resume(&three, 0);
        assert_eq!(r.why_you_were_doing_it, "Based on your workflow pattern");
        assert_eq!(r.confidence, Some(Confidence::Medium));

        let mut four = three.clone();
        four.push(ctx("https://d.com", ActivityType::Tab));
        let r = deep_cognitive_resume(&four, 0);
        assert_eq!(
            r.why_you_were_doing_it,
            "You were researching across multiple sources"
        );
        assert_eq!(r.confidence, Some(Confidence::High));
    }

    #[test]
    fn test_primary_fields_and_insights() {
        let mut primary = ctx("https://www.github.com/acme/widgets", ActivityType::Code);
        primary.summary = "Reviewing acme/widgets".into();
        primary.next_steps = vec!["Run the tests".into()];
        primary.visit_count = 4;
        let mut recovered = ctx("https://github.com/acme/other", ActivityType::Code);
        recovered.status = ContextStatus::Recovered;
        let broken = ctx("not a url", ActivityType::Note);

        let r = deep_cognitive_resume(&[primary, recovered, broken], 2 * 3_600_000 + 5);
        assert_eq!(r.what_you_were_doing, "Reviewing acme/widgets");
        assert_eq!(r.next_logical_step, "Run the tests");
        assert_eq!(r.absence_duration.as_deref(), Some("2 hours"));
        assert_eq!(r.workspaces[0].visit_count, 4);
        let insights = r.insights.unwrap();
        // github.com twice plus "unknown"
        assert_eq!(insights.unique_domains, 2);
        assert_eq!(insights.total_workspaces, 3);
        assert_eq!(insights.recovered_count, 1);
    }

    #[test]
    fn test_fallbacks_when_not_enriched() {
        let r = deep_cognitive_resume(&[ctx("https://a.com", ActivityType::Tab)], 0);
        assert_eq!(r.what_you_were_doing, "Page");
        assert_eq!(r.next_logical_step, "Continue where you left off");
    }

    #[test]
    fn test_workspaces_capped_at_five() {
        let contexts: Vec<Context> = (0..8)
            .map(|i| ctx(&format!("https://site{i}.com"), ActivityType::Tab))
            .collect();
        let r = deep_cognitive_resume(&contexts, 0);
        assert_eq!(r.workspaces.len(), 5);
        assert_eq!(r.workspaces[0].url, "https://site0.com");
        assert_eq!(r.insights.unwrap().total_workspaces, 8);
    }

    #[test]
    fn test_absence_label() {
        assert_eq!(absence_label(0), "0 minutes");
        assert_eq!(absence_label(59 * 60_000), "59 minutes");
        assert_eq!(absence_label(3_600_000), "1 hours");
    }
}
