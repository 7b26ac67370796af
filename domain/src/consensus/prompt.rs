//! Synthesis prompt construction for the delegated arbiter.

use crate::response::ModelResponse;

/// Build the arbiter prompt from the original query and the qualifying
/// responses (non-empty text, `Completed` or `Timeout`).
///
/// Each response is labeled with its backend id and delimited so the
/// arbiter can cross-reference sources. When nothing qualifies, the prompt
/// says so explicitly instead of fabricating content.
pub fn synthesis_prompt(original_prompt: &str, responses: &[ModelResponse]) -> String {
    let qualifying: Vec<&ModelResponse> = responses
        .iter()
        .filter(|r| r.qualifies_for_consensus())
        .collect();

    let mut prompt = format!("USER QUERY: \"{original_prompt}\"\n\n");
    prompt.push_str(
        "Below are independent responses to this query from separate AI models.\n\
         Analyze and cross-reference them, resolve conflicts, and merge their\n\
         insights into a single, superior answer.\n\n",
    );

    if qualifying.is_empty() {
        prompt.push_str("[WARNING: no valid responses were received]\n");
        return prompt;
    }

    for response in qualifying {
        prompt.push_str(&format!(
            "--- BEGIN RESPONSE FROM {id} ---\n{text}\n--- END RESPONSE FROM {id} ---\n\n",
            id = response.backend,
            text = response.text,
        ));
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::BackendId;
    use crate::response::BackendStatus;

    fn response(id: &str, text: &str, status: BackendStatus) -> ModelResponse {
        let mut r = ModelResponse::idle(BackendId::new(id));
        r.text = text.to_string();
        r.status = status;
        r
    }

    #[test]
    fn labels_and_delimits_each_qualifying_response() {
        let responses = vec![
            response("openai", "Answer one", BackendStatus::Completed),
            response("anthropic", "Answer two", BackendStatus::Timeout),
            response("grok", "", BackendStatus::Completed),
            response("gemini", "dead", BackendStatus::Error),
        ];
        let prompt = synthesis_prompt("What is 2+2?", &responses);

        assert!(prompt.contains("USER QUERY: \"What is 2+2?\""));
        assert!(prompt.contains("--- BEGIN RESPONSE FROM openai ---\nAnswer one"));
        assert!(prompt.contains("--- BEGIN RESPONSE FROM anthropic ---\nAnswer two"));
        // Empty and errored responses are excluded
        assert!(!prompt.contains("grok"));
        assert!(!prompt.contains("gemini"));
    }

    #[test]
    fn empty_pool_is_flagged_not_fabricated() {
        let prompt = synthesis_prompt("query", &[]);
        assert!(prompt.contains("no valid responses"));
        assert!(!prompt.contains("BEGIN RESPONSE"));
    }
}
