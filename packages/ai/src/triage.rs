//! Per-issue triage: category, priority and owning department.
//!
//! The classifier asks an LLM provider once, bounded by a timeout. Whatever
//! comes back is parsed field by field, so a sloppy answer still yields a
//! usable result. When there is no answer at all (no provider, HTTP error,
//! timeout, empty text) a keyword scan over the title and description takes
//! over.

use std::fmt::Write as _;
use std::str::FromStr as _;
use std::time::Duration;

use civic_triage_issue_models::{
    Department, IssueCategory, IssuePriority, TriageResult, TriageSource,
};

use crate::AiError;
use crate::providers::{CompletionRequest, ContentPart, LlmProvider, create_provider_from_env};

/// Reasoning attached to every keyword-fallback result.
pub const FALLBACK_REASONING: &str = "Fallback rule-based analysis";

/// Confidence attached to every keyword-fallback result.
pub const FALLBACK_CONFIDENCE: u8 = 30;

const DEFAULT_CONFIDENCE: u8 = 50;
const DEFAULT_REASONING: &str = "Classified from the issue description";
const MAX_ANSWER_TOKENS: u32 = 1024;

/// Keyword groups scanned in order; the first group with a match wins.
const KEYWORD_RULES: &[(&[&str], IssueCategory, IssuePriority)] = &[
    (
        &["pothole", "road", "street"],
        IssueCategory::RoadPothole,
        IssuePriority::High,
    ),
    (
        &["water", "leak", "pipe"],
        IssueCategory::WaterSupply,
        IssuePriority::High,
    ),
    (
        &["electricity", "power", "light"],
        IssueCategory::Streetlight,
        IssuePriority::High,
    ),
    (
        &["garbage", "waste", "trash"],
        IssueCategory::WasteManagement,
        IssuePriority::Medium,
    ),
    (
        &["safety", "danger", "hazard"],
        IssueCategory::PublicSafety,
        IssuePriority::Urgent,
    ),
];

/// Classifies citizen reports.
pub struct TriageClassifier {
    provider: Option<Box<dyn LlmProvider>>,
    timeout: Duration,
}

impl TriageClassifier {
    /// Provider timeout when `AI_TIMEOUT_SECS` is not set.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Creates a classifier backed by `provider`.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    /// Creates a classifier that always uses the keyword fallback.
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            provider: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Creates a classifier from `AI_*` environment variables.
    ///
    /// A missing or invalid provider configuration is logged and leaves the
    /// classifier offline.
    #[must_use]
    pub fn from_env() -> Self {
        let timeout = std::env::var("AI_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.trim().parse::<u64>().ok())
            .map_or(Self::DEFAULT_TIMEOUT, Duration::from_secs);

        match create_provider_from_env() {
            Ok(provider) => Self::new(provider, timeout),
            Err(e) => {
                log::warn!("AI provider unavailable, triage will use keyword fallback: {e}");
                Self::offline()
            }
        }
    }

    /// Whether a provider is configured.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.provider.is_some()
    }

    /// Classifies one report. Never fails: every provider problem ends in
    /// the keyword fallback with the cause in `error`.
    pub async fn classify(
        &self,
        title: &str,
        description: &str,
        image: Option<&[u8]>,
    ) -> TriageResult {
        let Some(provider) = &self.provider else {
            return fallback_classification(
                title,
                description,
                Some("No AI provider configured".to_string()),
            );
        };

        let request = build_request(title, description, image);
        log::debug!(
            "Classifying {title:?} with {} ({} parts)",
            provider.name(),
            request.parts.len()
        );

        let outcome = match tokio::time::timeout(self.timeout, provider.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(AiError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
        };

        match outcome {
            Ok(answer) if !answer.trim().is_empty() => {
                let result = parse_oracle_response(&answer);
                log::info!(
                    "Triaged {title:?} as {} / {} ({}%)",
                    result.category,
                    result.priority,
                    result.confidence
                );
                result
            }
            Ok(_) => {
                log::warn!("{} returned an empty answer, using keyword fallback", provider.name());
                fallback_classification(
                    title,
                    description,
                    Some(format!("{} returned an empty answer", provider.name())),
                )
            }
            Err(e) => {
                log::warn!("{} failed, using keyword fallback: {e}", provider.name());
                fallback_classification(title, description, Some(e.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for TriageClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageClassifier")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn build_request(title: &str, description: &str, image: Option<&[u8]>) -> CompletionRequest {
    let mut parts = vec![ContentPart::Text(build_prompt(title, description))];
    if let Some(bytes) = image {
        parts.push(ContentPart::image(bytes));
    }
    CompletionRequest {
        parts,
        max_tokens: MAX_ANSWER_TOKENS,
    }
}

/// Builds the classification instruction for one report.
#[must_use]
pub fn build_prompt(title: &str, description: &str) -> String {
    let mut prompt = String::from(
        "You are triaging a civic issue reported by a citizen to their municipality.\n\n",
    );
    let _ = writeln!(prompt, "Title: {title}");
    let _ = writeln!(prompt, "Description: {description}\n");

    prompt.push_str("Choose exactly one category:\n");
    for category in IssueCategory::all() {
        let _ = writeln!(prompt, "- {category} (handled by {})", category.department());
    }

    let priorities: Vec<&str> = IssuePriority::all().iter().map(AsRef::as_ref).collect();
    let _ = writeln!(prompt, "\nChoose one priority: {}.", priorities.join(", "));

    prompt.push_str(
        "\nIf an image is attached, use it as additional evidence.\n\
         Respond with only a JSON object of this shape:\n\
         {\"category\": \"...\", \"priority\": \"...\", \"confidence\": 0-100, \
         \"reasoning\": \"one or two sentences\", \"department\": \"...\"}\n",
    );

    prompt
}

/// Returns the first balanced `{...}` block in `text`. Braces inside JSON
/// string literals are ignored.
#[must_use]
pub fn extract_json_block(text: &str) -> Option<&str> {
    text.match_indices('{')
        .find_map(|(start, _)| balanced_end(&text[start..]).map(|len| &text[start..start + len]))
}

/// Length of the balanced block at the start of `s`, which begins with `{`.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Turns a provider answer into a result, validating each field on its own.
///
/// Unknown or missing values fall back to `Other`, `medium`, confidence 50,
/// and the category's own department.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_oracle_response(text: &str) -> TriageResult {
    let fields = extract_json_block(text)
        .and_then(|block| serde_json::from_str::<serde_json::Value>(block).ok())
        .and_then(|value| match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_else(|| {
            log::warn!("Provider answer has no JSON object, using field defaults");
            serde_json::Map::new()
        });

    let text_field = |key: &str| {
        fields
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let category = text_field("category")
        .and_then(|value| IssueCategory::from_str(value).ok())
        .unwrap_or(IssueCategory::Other);
    let priority = text_field("priority")
        .and_then(|value| IssuePriority::from_str(value).ok())
        .unwrap_or_default();
    let department = text_field("department")
        .and_then(|value| Department::from_str(value).ok())
        .unwrap_or_else(|| category.department());
    let reasoning = text_field("reasoning").unwrap_or(DEFAULT_REASONING).to_string();

    let confidence = fields
        .get("confidence")
        .and_then(|value| match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
            _ => None,
        })
        .filter(|value: &f64| value.is_finite())
        .map_or(DEFAULT_CONFIDENCE, |value| value.clamp(0.0, 100.0).round() as u8);

    TriageResult {
        category,
        priority,
        confidence,
        reasoning,
        department,
        source: TriageSource::Oracle,
        error: None,
    }
}

/// Keyword classification over the lower-cased title and description.
#[must_use]
pub fn fallback_classification(
    title: &str,
    description: &str,
    error: Option<String>,
) -> TriageResult {
    let haystack = format!("{title} {description}").to_lowercase();

    let (category, priority) = KEYWORD_RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| haystack.contains(k)))
        .map_or((IssueCategory::Other, IssuePriority::Medium), |&(_, c, p)| {
            (c, p)
        });

    TriageResult {
        category,
        priority,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: FALLBACK_REASONING.to_string(),
        department: category.department(),
        source: TriageSource::Fallback,
        error,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    enum Answer {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct MockProvider {
        answer: Answer,
        seen: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl MockProvider {
        fn new(answer: Answer) -> Self {
            Self {
                answer,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.answer {
                Answer::Text(text) => Ok(text.to_string()),
                Answer::Fail => Err(AiError::Provider {
                    message: "quota exceeded".to_string(),
                }),
                Answer::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn classifier(answer: Answer) -> TriageClassifier {
        TriageClassifier::new(
            Box::new(MockProvider::new(answer)),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn offline_pothole_is_road_high() {
        let result = TriageClassifier::offline()
            .classify("Pothole on Main St", "Large pothole causing accidents", None)
            .await;

        assert_eq!(result.category, IssueCategory::RoadPothole);
        assert_eq!(result.priority, IssuePriority::High);
        assert_eq!(result.confidence, 30);
        assert_eq!(result.reasoning, "Fallback rule-based analysis");
        assert_eq!(result.department, Department::PublicWorks);
        assert_eq!(result.source, TriageSource::Fallback);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn oracle_answer_is_parsed() {
        let result = classifier(Answer::Text(
            "Sure! Here is the classification:\n```json\n{\"category\": \"Water Supply\", \
             \"priority\": \"urgent\", \"confidence\": 88, \"reasoning\": \"Burst main {flooding}\", \
             \"department\": \"Water Works\"}\n```",
        ))
        .classify("Burst pipe", "Water everywhere", None)
        .await;

        assert_eq!(result.category, IssueCategory::WaterSupply);
        assert_eq!(result.priority, IssuePriority::Urgent);
        assert_eq!(result.confidence, 88);
        assert_eq!(result.reasoning, "Burst main {flooding}");
        assert_eq!(result.department, Department::WaterWorks);
        assert_eq!(result.source, TriageSource::Oracle);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn provider_error_falls_back() {
        let result = classifier(Answer::Fail)
            .classify("Garbage pile", "Trash not collected for a week", None)
            .await;

        assert_eq!(result.category, IssueCategory::WasteManagement);
        assert_eq!(result.priority, IssuePriority::Medium);
        assert_eq!(result.source, TriageSource::Fallback);
        assert!(result.error.unwrap().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn timeout_falls_back() {
        let result = classifier(Answer::Hang)
            .classify("Exposed wires", "Danger near the school", None)
            .await;

        assert_eq!(result.category, IssueCategory::PublicSafety);
        assert_eq!(result.priority, IssuePriority::Urgent);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_answer_falls_back() {
        let result = classifier(Answer::Text("   "))
            .classify("Noise", "Loud music at night", None)
            .await;

        assert_eq!(result.category, IssueCategory::Other);
        assert_eq!(result.source, TriageSource::Fallback);
    }

    #[tokio::test]
    async fn image_is_attached_after_text() {
        let provider = MockProvider::new(Answer::Text("{\"category\": \"Parks & Recreation\"}"));
        let seen = Arc::clone(&provider.seen);
        let png = b"\x89PNG\r\n\x1a\n0000";

        let result = TriageClassifier::new(Box::new(provider), Duration::from_secs(1))
            .classify("Broken bench", "In the park", Some(png))
            .await;

        assert_eq!(result.category, IssueCategory::ParksRecreation);
        assert_eq!(result.department, Department::Parks);

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let parts = &requests[0].parts;
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[0], ContentPart::Text(text) if text.contains("Broken bench")));
        assert!(matches!(
            &parts[1],
            ContentPart::Image { media_type, .. } if media_type == "image/png"
        ));
    }

    #[test]
    fn prompt_lists_categories_and_priorities() {
        let prompt = build_prompt("Dark street", "Lamp out for days");

        assert!(prompt.contains("Title: Dark street"));
        assert!(prompt.contains("Description: Lamp out for days"));
        for category in IssueCategory::all() {
            assert!(prompt.contains(category.as_ref()), "{category}");
        }
        assert!(prompt.contains("low, medium, high, urgent"));
        assert!(prompt.contains("\"department\""));
    }

    #[test]
    fn json_block_ignores_braces_in_strings() {
        let text = r#"prefix {"reasoning": "a } inside \" quote {", "n": {"x": 1}} suffix {"b": 2}"#;

        assert_eq!(
            extract_json_block(text),
            Some(r#"{"reasoning": "a } inside \" quote {", "n": {"x": 1}}"#)
        );
    }

    #[test]
    fn json_block_skips_unbalanced_opener() {
        assert_eq!(extract_json_block("{ oops {\"a\": 1}"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_block("no json here"), None);
        assert_eq!(extract_json_block("{ never closed"), None);
    }

    #[test]
    fn no_json_gives_field_defaults() {
        let result = parse_oracle_response("I think this is a road problem.");

        assert_eq!(result.category, IssueCategory::Other);
        assert_eq!(result.priority, IssuePriority::Medium);
        assert_eq!(result.confidence, 50);
        assert_eq!(result.department, Department::GeneralAdministration);
        assert_eq!(result.source, TriageSource::Oracle);
    }

    #[test]
    fn fields_are_validated_independently() {
        let result = parse_oracle_response(
            r#"{"category": "road & pothole issues", "priority": "critical",
                "confidence": 140, "department": "Ministry of Roads"}"#,
        );

        assert_eq!(result.category, IssueCategory::RoadPothole);
        assert_eq!(result.priority, IssuePriority::Medium);
        assert_eq!(result.confidence, 100);
        assert_eq!(result.department, Department::PublicWorks);
        assert_eq!(result.reasoning, DEFAULT_REASONING);
    }

    #[test]
    fn confidence_accepts_strings_and_clamps_negative() {
        assert_eq!(parse_oracle_response(r#"{"confidence": "72%"}"#).confidence, 72);
        assert_eq!(parse_oracle_response(r#"{"confidence": -5}"#).confidence, 0);
        assert_eq!(parse_oracle_response(r#"{"confidence": 61.6}"#).confidence, 62);
        assert_eq!(parse_oracle_response(r#"{"confidence": null}"#).confidence, 50);
    }

    #[test]
    fn fallback_keywords_first_match_wins() {
        let cases = [
            ("Street light broken", "", IssueCategory::RoadPothole),
            ("Leaking pipe", "", IssueCategory::WaterSupply),
            ("Power cut", "whole block dark", IssueCategory::Streetlight),
            ("Overflowing bin", "garbage everywhere", IssueCategory::WasteManagement),
            ("Fire HAZARD", "", IssueCategory::PublicSafety),
            ("Stray dogs", "", IssueCategory::Other),
        ];

        for (title, description, expected) in cases {
            let result = fallback_classification(title, description, None);
            assert_eq!(result.category, expected, "{title}");
            assert_eq!(result.department, expected.department());
            assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
        }
    }
}
