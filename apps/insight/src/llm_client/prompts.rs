// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps numeric fields on the 0-100 scale the UI draws.
pub const PERCENT_SCALE_INSTRUCTION: &str = "\
    Every score and importance value is an integer from 0 to 100 inclusive. \
    Never emit percentages as strings, fractions, or values outside that range.";
