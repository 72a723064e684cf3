// Shared prompt fragments. Each feature that calls the LLM keeps its own
// prompts.rs next to it; this file only holds cross-cutting pieces.

/// Appended to every prompt that expects machine-readable output.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    Respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT include explanations or apologies.";

/// Keeps the model from inventing facts that are not in the source text.
pub const GROUNDING_INSTRUCTION: &str = "\
    Use only information present in the document text. \
    If a field is not supported by the text, leave it as an empty string or empty list. \
    Do NOT infer, interpolate, or invent details.";
