//! Prompt heuristics: plain-text rewriting, output schemas and the canned
//! insurance answers used when the backend is unavailable

use serde_json::{json, Map, Value};

const PROCESSING_VERBS: &[&str] = &[
    "summarize",
    "summarise",
    "translate",
    "rewrite",
    "rephrase",
    "extract",
    "classify",
    "correct",
    "proofread",
    "analyze",
    "analyse",
    "convert",
    "format",
];

const GENERATION_NOUNS: &[&str] = &["component", "code", "html", "function", "app", "ui", "widget"];

const PLAIN_TEXT_INSTRUCTION: &str = "Return only the plain processed text. Do not return code, \
markdown fences or explanations.";

/// Whether a system prompt asks to process text rather than generate code
pub fn is_text_processing(system_prompt: &str) -> bool {
    let lower = system_prompt.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let processes = words
        .iter()
        .any(|w| PROCESSING_VERBS.iter().any(|verb| w.starts_with(verb)));
    let generates = words.iter().any(|w| GENERATION_NOUNS.contains(w));

    processes && !generates
}

/// System prompt as sent to the backend
pub fn prepare_system_prompt(system_prompt: &str) -> String {
    if is_text_processing(system_prompt) {
        format!("{}\n\n{}", system_prompt.trim_end(), PLAIN_TEXT_INSTRUCTION)
    } else {
        system_prompt.to_string()
    }
}

/// Schema requiring `{rows: [...]}` where every row has each column as a string
pub fn rows_schema(columns: &[String]) -> Value {
    let properties: Map<String, Value> = columns
        .iter()
        .map(|c| (c.clone(), json!({ "type": "string" })))
        .collect();

    json!({
        "type": "object",
        "properties": {
            "rows": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": properties,
                    "required": columns,
                    "additionalProperties": false
                }
            }
        },
        "required": ["rows"],
        "additionalProperties": false
    })
}

/// Ordered most specific first; the first keyword present picks the answer
const INSURANCE_ANSWERS: &[(&str, &str)] = &[
    (
        "claim",
        "To file a claim, contact your insurer as soon as possible, provide your policy number, \
         a description of the incident and any supporting documents such as photos or receipts. \
         An adjuster will review the claim and follow up on next steps.",
    ),
    (
        "deductible",
        "A deductible is the amount you pay out of pocket before your insurance coverage starts \
         paying. A higher deductible usually lowers your premium.",
    ),
    (
        "premium",
        "Your premium is the amount you pay for your policy, usually monthly or annually. It \
         depends on the coverage level, your deductible and your risk profile.",
    ),
    (
        "coverage",
        "Coverage describes which events and costs your policy pays for and up to what limits. \
         Review the declarations page of your policy for the exact limits and exclusions.",
    ),
];

const INSURANCE_KEYWORDS: &[&str] = &[
    "insurance",
    "insured",
    "insurer",
    "policy",
    "premium",
    "deductible",
    "claim",
    "coverage",
    "underwriting",
];

const INSURANCE_GENERAL: &str = "Insurance protects you against financial loss in exchange for a \
premium. For questions about your specific policy, please contact your insurance provider.";

/// Canned answer when the input is recognizably about insurance
pub fn insurance_fallback(input: &str) -> Option<&'static str> {
    let lower = input.to_lowercase();
    if !INSURANCE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return None;
    }

    let answer = INSURANCE_ANSWERS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, answer)| *answer)
        .unwrap_or(INSURANCE_GENERAL);
    Some(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_processing_detection() {
        assert!(is_text_processing("Summarize the following article"));
        assert!(is_text_processing("Translate the input to French."));
        assert!(!is_text_processing("Generate a React component that shows a chart"));
        assert!(!is_text_processing("Summarize this and write the code for an app"));
        assert!(!is_text_processing("You are a helpful assistant"));
    }

    #[test]
    fn test_prepare_system_prompt() {
        let prepared = prepare_system_prompt("Rewrite the text politely");
        assert!(prepared.starts_with("Rewrite the text politely"));
        assert!(prepared.contains(PLAIN_TEXT_INSTRUCTION));

        assert_eq!(prepare_system_prompt("Build a widget"), "Build a widget");
    }

    #[test]
    fn test_rows_schema_requires_every_column() {
        let schema = rows_schema(&["Status".to_string(), "Score".to_string()]);
        let items = &schema["properties"]["rows"]["items"];

        assert_eq!(items["required"], json!(["Status", "Score"]));
        assert_eq!(items["properties"]["Score"]["type"], "string");
        assert_eq!(schema["required"], json!(["rows"]));
    }

    #[test]
    fn test_insurance_fallback() {
        assert!(insurance_fallback("What is the weather?").is_none());

        let claim = insurance_fallback("How do I file a claim on my car insurance?").unwrap();
        assert!(claim.starts_with("To file a claim"));

        let general = insurance_fallback("Tell me about insurance").unwrap();
        assert_eq!(general, INSURANCE_GENERAL);
    }
}
