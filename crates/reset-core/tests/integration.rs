//! Integration tests exercising the pure pipeline end to end:
//! sample → Context → recovery summary → day score / resume / prediction.

use reset_core::{
    ActivitySample, ActivitySnapshot, ActivityType, Context, ContextStatus, DayActivity,
    FlowLevel, PageMetadata, RiskLevel, deep_cognitive_resume, detect_context_loss, focus_streak,
    generate_recovery, normalize_url, predict_distraction, score_day,
};

const PR_URL: &str = "https://github.com/acme/widgets/pull/42";

fn enriched(sample: &ActivitySample, at: i64) -> Context {
    let mut ctx = Context::from_sample("user-1", Some("session-1"), sample, at);
    let recovery = generate_recovery(&ctx);
    ctx.summary = recovery.summary;
    ctx.key_points = recovery.key_points;
    ctx.next_steps = recovery.next_steps;
    ctx.enriched = true;
    ctx
}

#[test]
fn test_pull_request_capture_is_summarized() {
    let sample = ActivitySample::new(PR_URL).with_title("Add widget caching #42");
    let ctx = enriched(&sample, 1_000);

    assert_eq!(ctx.activity_type, ActivityType::Code);
    assert_eq!(ctx.normalized_url, PR_URL);
    assert!(ctx.summary.contains("Reviewing a pull request"));
    assert!(ctx.key_points.contains(&"Repository: widgets".to_string()));
    assert_eq!(ctx.next_steps, vec!["Complete code review"]);
}

#[test]
fn test_variants_of_one_resource_share_a_key() {
    let keys: Vec<String> = [
        "https://GitHub.com/acme/widgets/pull/42/",
        "https://github.com/acme/widgets/pull/42?w=1",
        "https://github.com/acme/widgets/pull/42#issuecomment-1",
    ]
    .iter()
    .map(|u| normalize_url(u))
    .collect();
    assert!(keys.iter().all(|k| k == PR_URL));
}

#[test]
fn test_resume_over_enriched_contexts() {
    let contexts = vec![
        enriched(&ActivitySample::new(PR_URL).with_title("PR"), 3_000),
        enriched(
            &ActivitySample::new("https://docs.google.com/document/d/abc").with_title("Spec"),
            2_000,
        ),
        enriched(&ActivitySample::new("https://news.ycombinator.com").with_title("HN"), 1_000),
    ];
    let resume = deep_cognitive_resume(&contexts, 45 * 60_000);

    assert_eq!(resume.what_you_were_doing, contexts[0].summary);
    assert_eq!(resume.next_logical_step, "Complete code review");
    assert_eq!(
        resume.why_you_were_doing_it,
        "You were likely debugging or implementing a feature"
    );
    assert_eq!(resume.absence_duration.as_deref(), Some("45 minutes"));
    assert_eq!(resume.workspaces.len(), 3);
    assert_eq!(resume.insights.unwrap().unique_domains, 3);
}

#[test]
fn test_day_score_and_streak_together() {
    let today: Vec<Context> = (0..6)
        .map(|i| {
            let sample = ActivitySample::new(&format!("https://example.com/doc/{}", i % 3));
            let mut ctx = Context::from_sample("user-1", None, &sample, i);
            if i == 0 {
                ctx.status = ContextStatus::Recovered;
            }
            ctx
        })
        .collect();

    let history = [
        DayActivity::from_contexts(&today),
        DayActivity {
            switch_count: 12,
            unique_urls: 6,
        },
        DayActivity::default(),
    ];
    let score = score_day(&today, focus_streak(&history));

    assert_eq!(score.score, 100);
    assert_eq!(score.level, FlowLevel::DeepFocus);
    assert_eq!(score.unique_workspaces, 3);
    assert_eq!(score.recoveries, 1);
    assert_eq!(score.focus_streak, 2);
}

#[test]
fn test_prediction_and_detection_agree_on_shared_factors() {
    let snapshot: ActivitySnapshot = serde_json::from_value(serde_json::json!({
        "recentTabSwitches": 11,
        "uniqueDomains": 10,
        "domainChanged": true,
        "timeSinceLastInteractionMs": 90_000,
    }))
    .unwrap();

    let prediction = predict_distraction(&snapshot, 10);
    let detection = detect_context_loss(&snapshot, 10);

    // 0.30 + 0.20 + 0.20 + 0.20, no idle contribution
    assert_eq!(prediction.probability, 0.9);
    assert_eq!(detection.probability, 0.9);
    assert_eq!(prediction.risk_level, RiskLevel::High);
    assert!(detection.detected);
    assert_eq!(prediction.triggers, detection.factors);
}

#[test]
fn test_scraped_heading_feeds_the_summary() {
    let metadata = PageMetadata {
        headings: vec!["Serialization".to_string()],
        ..Default::default()
    };
    let sample = ActivitySample::new("https://crates.io/crates/serde")
        .with_title("serde")
        .with_type(ActivityType::Code)
        .with_metadata(metadata);
    let ctx = enriched(&sample, 0);

    assert_eq!(ctx.summary, "Working on code at crates.io");
    assert_eq!(ctx.key_points, vec!["Topic: Serialization"]);
}
