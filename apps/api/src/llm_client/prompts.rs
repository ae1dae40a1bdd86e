// Shared prompt fragments.
// Each operation's own prompt lives in extraction/prompts.rs; this file holds
// cross-cutting rules that every extraction prompt appends.

/// Rule enforcing JSON-only output.
pub const JSON_ONLY_RULE: &str = "\
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Rule forbidding invented values.
pub const NO_FABRICATION_RULE: &str = "\
    CRITICAL: Never invent information that is not present in the user's input. \
    If a value is missing or unclear, use null (or an empty list for list fields).";

/// Sign convention shared by every money field.
pub const SIGN_CONVENTION_RULE: &str = "\
    Amounts are integers in VND. Income is POSITIVE, spending is NEGATIVE. \
    Convert shorthand units: 10k = 10000, 1tr = 1000000, 1 tỷ = 1000000000.";

/// Builds a system prompt from an operation-specific body plus the shared rules.
pub fn with_shared_rules(body: &str, rules: &[&str]) -> String {
    let mut prompt = String::from(body.trim());
    for rule in rules {
        prompt.push_str("\n\n");
        prompt.push_str(rule);
    }
    prompt
}
