//! Recovering a JSON payload from free-form model output
//!
//! Models wrap JSON in code fences, surround it with prose, or answer with a
//! refusal instead. [`robust_json_parse`] tells these cases apart so a caller
//! can decide between retrying and failing the stage.

use crate::{GatewayError, GatewayResult};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

/// Lowercase fragments that mark a response as a refusal or provider error
pub const REFUSAL_PHRASES: &[&str] = &[
    "i apologize",
    "i cannot",
    "i can't assist",
    "api key not valid",
    "rate limit",
];

/// Characters of a refused response quoted in the error
const EXCERPT_CHARS: usize = 100;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid fenced block pattern")
});

/// A stage output with a fixed, named key set
pub trait Envelope: DeserializeOwned {
    /// Names the payload in error messages
    const CONTEXT: &'static str;

    /// Checks constraints a derive cannot express
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Parses model output into an envelope
pub fn parse_envelope<T: Envelope>(text: &str) -> GatewayResult<T> {
    parse_envelope_as(text, T::CONTEXT)
}

/// Parses model output into an envelope, naming it `context` in errors
pub fn parse_envelope_as<T: Envelope>(text: &str, context: &str) -> GatewayResult<T> {
    robust_json_parse(text, context, |value| {
        let parsed: T = serde_json::from_value(value).map_err(|e| e.to_string())?;
        parsed.validate()?;
        Ok(parsed)
    })
}

/// Extracts, parses and validates a JSON object from model output
///
/// # Steps
///
/// 1. Empty or whitespace-only text fails with `EmptyResponse`
/// 2. Text containing a [`REFUSAL_PHRASES`] entry fails with `Blocked`
/// 3. [`extract_json`] locates the object, or the call fails with `NoJson`
/// 4. The object is parsed, or the call fails with `MalformedJson`
/// 5. `validator` runs, and its message becomes `WrongShape`
///
/// # Example
///
/// ```
/// use seo_orchestrator::gateway::robust_json_parse;
///
/// let text = "Here you go: {\"sitemaps\": [\"https://a.com/sitemap.xml\"]} Enjoy!";
/// let count = robust_json_parse(text, "CompetitorSitemaps", |value| {
///     value["sitemaps"].as_array().map(Vec::len).ok_or("sitemaps missing".to_string())
/// })
/// .unwrap();
/// assert_eq!(count, 1);
/// ```
pub fn robust_json_parse<T, F>(text: &str, context: &str, validator: F) -> GatewayResult<T>
where
    F: FnOnce(Value) -> Result<T, String>,
{
    if text.trim().is_empty() {
        return Err(GatewayError::EmptyResponse {
            context: context.to_string(),
        });
    }

    let lowered = text.to_lowercase();
    if REFUSAL_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return Err(GatewayError::Blocked {
            excerpt: text.chars().take(EXCERPT_CHARS).collect(),
        });
    }

    let json = extract_json(text).ok_or_else(|| GatewayError::NoJson {
        context: context.to_string(),
    })?;

    let value: Value =
        serde_json::from_str(json).map_err(|source| GatewayError::MalformedJson {
            context: context.to_string(),
            source,
        })?;

    validator(value).map_err(|detail| GatewayError::WrongShape {
        context: context.to_string(),
        detail,
    })
}

/// Locates a JSON object in model output
///
/// Fenced code blocks are tried first, in order; the first one whose content
/// parses to an object wins. Otherwise the text is scanned for the first balanced `{...}`
/// span that parses, with string literals and escapes respected during
/// brace matching.
pub fn extract_json(text: &str) -> Option<&str> {
    for captures in FENCED_BLOCK.captures_iter(text) {
        if let Some(body) = captures.get(1) {
            let body = body.as_str().trim();
            if matches!(serde_json::from_str::<Value>(body), Ok(Value::Object(_))) {
                return Some(body);
            }
        }
    }

    scan_for_object(text)
}

fn scan_for_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = bytes[search_from..].iter().position(|&b| b == b'{') {
        let start = search_from + offset;
        if let Some(end) = matching_brace(bytes, start) {
            let candidate = &text[start..=end];
            if serde_json::from_str::<Value>(candidate).is_ok() {
                return Some(candidate);
            }
        }
        search_from = start + 1;
    }

    None
}

/// Index of the brace closing the one at `start`
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sitemaps {
        sitemaps: Vec<String>,
    }

    impl Envelope for Sitemaps {
        const CONTEXT: &'static str = "CompetitorSitemaps";

        fn validate(&self) -> Result<(), String> {
            if self.sitemaps.len() > 5 {
                return Err("at most five sitemaps".to_string());
            }
            Ok(())
        }
    }

    fn keys(value: Value) -> Result<usize, String> {
        value
            .as_object()
            .map(|o| o.len())
            .ok_or_else(|| "not an object".to_string())
    }

    #[test]
    fn test_fenced_block() {
        let text = "Sure!\n```json\n{\"a\": 1, \"b\": [1, 2]}\n```\nLet me know.";
        assert_eq!(extract_json(text), Some("{\"a\": 1, \"b\": [1, 2]}"));
        assert_eq!(robust_json_parse(text, "Test", keys).unwrap(), 2);
    }

    #[test]
    fn test_unlabelled_fence_and_invalid_first_fence() {
        let text = "```\nnot json\n```\nthen\n```\n{\"ok\": true}\n```";
        assert_eq!(extract_json(text), Some("{\"ok\": true}"));
    }

    #[test]
    fn test_fenced_non_object_is_skipped() {
        let text = "```json\n[1, 2]\n```\nOr as an object: {\"a\": 1}";
        assert_eq!(extract_json(text), Some("{\"a\": 1}"));

        let err = robust_json_parse("```json\n\"done\"\n```", "Test", keys).unwrap_err();
        assert!(matches!(err, GatewayError::NoJson { .. }));
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let text = "The analysis is {\"pageActions\": [], \"keywords\": []} as requested.";
        assert_eq!(
            extract_json(text),
            Some("{\"pageActions\": [], \"keywords\": []}")
        );
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"Result: {"note": "use } and { freely", "n": 2} done"#;
        assert_eq!(
            extract_json(text),
            Some(r#"{"note": "use } and { freely", "n": 2}"#)
        );
    }

    #[test]
    fn test_scan_restarts_after_invalid_span() {
        let text = r#"Sets look like {a, b}. Answer: {"a": 1}"#;
        assert_eq!(extract_json(text), Some(r#"{"a": 1}"#));

        let nested = r#"{oops {"inner": true}"#;
        assert_eq!(extract_json(nested), Some(r#"{"inner": true}"#));
    }

    #[test]
    fn test_empty_response() {
        let err = robust_json_parse("  \n ", "SitewideAnalysis", keys).unwrap_err();
        assert!(matches!(err, GatewayError::EmptyResponse { context } if context == "SitewideAnalysis"));
    }

    #[test]
    fn test_refusal_is_blocked() {
        let err = robust_json_parse(
            "I apologize, but I cannot help with that request.",
            "SitewideAnalysis",
            keys,
        )
        .unwrap_err();
        match err {
            GatewayError::Blocked { excerpt } => assert!(excerpt.starts_with("I apologize")),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_refusal_excerpt_is_bounded() {
        let text = format!("API key not valid. {}", "x".repeat(500));
        match robust_json_parse(&text, "Test", keys).unwrap_err() {
            GatewayError::Blocked { excerpt } => assert_eq!(excerpt.chars().count(), 100),
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_no_json() {
        let err = robust_json_parse("Nothing structured here.", "ExecutiveSummary", keys).unwrap_err();
        assert!(matches!(err, GatewayError::NoJson { .. }));
    }

    #[test]
    fn test_wrong_shape_names_context() {
        let err = parse_envelope::<Sitemaps>(r#"{"urls": []}"#).unwrap_err();
        match err {
            GatewayError::WrongShape { context, .. } => assert_eq!(context, "CompetitorSitemaps"),
            other => panic!("expected WrongShape, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_validation_failure_is_wrong_shape() {
        let text = r#"{"sitemaps": ["a", "b", "c", "d", "e", "f"]}"#;
        assert!(matches!(
            parse_envelope::<Sitemaps>(text),
            Err(GatewayError::WrongShape { .. })
        ));
    }

    #[test]
    fn test_envelope_success_and_context_override() {
        let parsed = parse_envelope::<Sitemaps>(r#"{"sitemaps": ["https://a.com/sitemap.xml"]}"#).unwrap();
        assert_eq!(parsed.sitemaps.len(), 1);

        let err = parse_envelope_as::<Sitemaps>("{}", "Competitors for a.com").unwrap_err();
        assert!(matches!(err, GatewayError::WrongShape { context, .. } if context == "Competitors for a.com"));
    }
}
