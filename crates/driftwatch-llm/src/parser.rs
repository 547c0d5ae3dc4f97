//! Parse LLM output into a deep verdict

use crate::LlmError;
use driftwatch_domain::{DeepVerdict, Severity, Verdict};
use serde_json::{Map, Value};
use tracing::warn;

/// Parse a model response into a [`DeepVerdict`]
///
/// Accepts a bare JSON object, one wrapped in a markdown code block, or one
/// surrounded by prose. `verdict`, `confidence` and `reasoning` are
/// required; a drifted verdict without a severity is treated as medium.
pub fn parse_verdict(response: &str) -> Result<DeepVerdict, LlmError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| LlmError::InvalidResponse(format!("JSON parse error: {}", e)))?;
    let obj = json
        .as_object()
        .ok_or_else(|| LlmError::InvalidResponse("Expected a JSON object".to_string()))?;

    let verdict_text = required_str(obj, "verdict")?;
    let verdict = Verdict::parse(&verdict_text.to_ascii_lowercase())
        .ok_or_else(|| LlmError::InvalidResponse(format!("Unknown verdict '{}'", verdict_text)))?;

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| LlmError::InvalidResponse("Missing or invalid 'confidence'".to_string()))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(LlmError::InvalidResponse(format!(
            "confidence {} is outside [0, 1]",
            confidence
        )));
    }

    let reasoning = required_str(obj, "reasoning")?.to_string();

    let severity = match optional_str(obj, "severity") {
        Some(s) => match Severity::parse(&s.to_ascii_lowercase()) {
            Some(severity) => Some(severity),
            None => {
                warn!(severity = s, "Ignoring unknown severity");
                None
            }
        },
        None => None,
    };
    let severity = match verdict {
        Verdict::Drifted => Some(severity.unwrap_or(Severity::Medium)),
        _ => None,
    };

    let mut evidence_files: Vec<String> = Vec::new();
    if let Some(files) = obj.get("evidence_files").and_then(Value::as_array) {
        for file in files.iter().filter_map(Value::as_str) {
            let file = file.trim();
            if !file.is_empty() && !evidence_files.iter().any(|f| f == file) {
                evidence_files.push(file.to_string());
            }
        }
    }

    Ok(DeepVerdict {
        verdict,
        confidence,
        severity,
        reasoning,
        specific_mismatch: optional_str(obj, "specific_mismatch").map(str::to_string),
        suggested_fix: optional_str(obj, "suggested_fix").map(str::to_string),
        evidence_files,
    })
}

fn required_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, LlmError> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::InvalidResponse(format!("Missing or invalid '{}'", key)))
}

fn optional_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extract JSON from response, handling markdown code blocks and prose
fn extract_json(response: &str) -> Result<String, LlmError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(LlmError::InvalidResponse("Empty code block".to_string()));
        }
        // Skip the opening fence and a closing one if present
        let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
            lines.len() - 1
        } else {
            lines.len()
        };
        return Ok(lines[1..end].join("\n"));
    }

    if trimmed.starts_with('{') {
        return Ok(trimmed.to_string());
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(trimmed[start..=end].to_string()),
        _ => Err(LlmError::InvalidResponse("No JSON object in response".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_verdict() {
        let response = r#"{
            "verdict": "drifted",
            "confidence": 0.8,
            "severity": "high",
            "reasoning": "getUser returns 500, not 404",
            "specific_mismatch": "status code",
            "suggested_fix": "getUser returns 500 for unknown ids",
            "evidence_files": ["src/app.ts", "src/app.ts", " "]
        }"#;

        let verdict = parse_verdict(response).unwrap();
        assert_eq!(verdict.verdict, Verdict::Drifted);
        assert_eq!(verdict.confidence, 0.8);
        assert_eq!(verdict.severity, Some(Severity::High));
        assert_eq!(verdict.specific_mismatch.as_deref(), Some("status code"));
        assert_eq!(verdict.evidence_files, vec!["src/app.ts".to_string()]);
    }

    #[test]
    fn test_parse_with_markdown_wrapper() {
        let response = "```json\n{\"verdict\": \"verified\", \"confidence\": 0.9, \"reasoning\": \"ok\"}\n```";
        let verdict = parse_verdict(response).unwrap();
        assert_eq!(verdict.verdict, Verdict::Verified);
        assert!(verdict.evidence_files.is_empty());
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let response = "Here is my answer:\n{\"verdict\": \"Uncertain\", \"confidence\": 0.4, \"reasoning\": \"not enough code\"}\nHope this helps.";
        let verdict = parse_verdict(response).unwrap();
        assert_eq!(verdict.verdict, Verdict::Uncertain);
    }

    #[test]
    fn test_severity_only_for_drift() {
        let verified = parse_verdict(
            r#"{"verdict": "verified", "confidence": 1.0, "severity": "high", "reasoning": "ok"}"#,
        )
        .unwrap();
        assert_eq!(verified.severity, None);

        let drifted = parse_verdict(
            r#"{"verdict": "drifted", "confidence": 0.7, "severity": null, "reasoning": "off", "evidence_files": ["a.ts"]}"#,
        )
        .unwrap();
        assert_eq!(drifted.severity, Some(Severity::Medium));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_verdict("This is not JSON").is_err());
        assert!(parse_verdict("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_missing_field() {
        let result = parse_verdict(r#"{"verdict": "verified", "reasoning": "ok"}"#);
        assert!(matches!(result, Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_unknown_verdict() {
        let result = parse_verdict(r#"{"verdict": "maybe", "confidence": 0.5, "reasoning": "?"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_out_of_range_confidence() {
        let result = parse_verdict(r#"{"verdict": "verified", "confidence": 1.5, "reasoning": "ok"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_json_from_markdown_without_language() {
        let response = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(response).unwrap(), "{\"key\": \"value\"}");
    }
}
