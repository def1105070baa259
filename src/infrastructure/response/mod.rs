use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

static INTERNAL_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<internal>[\s\S]*?</internal>").unwrap());

static MULTIPLE_NEWLINES_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Opening fence anywhere in the text, with an optional language tag.
static FENCE_OPEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n?").unwrap());

/// Removes reasoning blocks some models emit ahead of the answer.
pub fn clean_llm_response(response: &str) -> String {
    let mut cleaned = THINK_TAG_PATTERN.replace_all(response, "").to_string();
    cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned = INTERNAL_TAG_PATTERN.replace_all(&cleaned, "").to_string();
    cleaned = cleaned.trim().to_string();
    MULTIPLE_NEWLINES_PATTERN
        .replace_all(&cleaned, "\n\n")
        .to_string()
}

/// Returns the body of the first fenced block, or the trimmed input when
/// there is none. An unterminated fence keeps everything after the marker,
/// since that is what truncated output looks like.
pub fn strip_code_fence(value: &str) -> String {
    let trimmed = value.trim();
    let Some(open) = FENCE_OPEN_PATTERN.find(trimmed) else {
        return trimmed.to_string();
    };
    let body = &trimmed[open.end()..];
    match body.find("```") {
        Some(close) => body[..close].trim().to_string(),
        None => body.trim().to_string(),
    }
}

/// Full cleanup applied before structural recovery.
pub fn normalize_structured_text(response: &str) -> String {
    strip_code_fence(&clean_llm_response(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_think_tags() {
        let input = "<think>Some reasoning here</think>The actual response";
        assert_eq!(clean_llm_response(input), "The actual response");
    }

    #[test]
    fn test_clean_self_closing_think() {
        assert_eq!(clean_llm_response("<think />{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_reasoning_and_internal() {
        let input = "<reasoning>why</reasoning><internal>debug</internal>Final";
        assert_eq!(clean_llm_response(input), "Final");
    }

    #[test]
    fn test_clean_multiple_newlines() {
        assert_eq!(clean_llm_response("A\n\n\n\n\nB"), "A\n\nB");
    }

    #[test]
    fn test_strip_leading_json_fence() {
        let input = "```json\n{\"screen_type\": \"Form\"}\n```";
        assert_eq!(strip_code_fence(input), "{\"screen_type\": \"Form\"}");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fence("```\n[1, 2]\n```"), "[1, 2]");
    }

    #[test]
    fn test_strip_fence_mid_text() {
        let input = "Here is the analysis:\n```json\n{\"a\": 1}\n```\nLet me know.";
        assert_eq!(strip_code_fence(input), "{\"a\": 1}");
    }

    #[test]
    fn test_unterminated_fence_keeps_body() {
        assert_eq!(strip_code_fence("```json\n{\"a\": [1,"), "{\"a\": [1,");
    }

    #[test]
    fn test_no_fence_is_trimmed_input() {
        assert_eq!(strip_code_fence("  plain text  "), "plain text");
    }
}
