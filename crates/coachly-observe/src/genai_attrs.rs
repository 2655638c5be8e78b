//! OpenTelemetry GenAI Semantic Convention attribute names.
//!
//! Spans declare these fields with dotted literals (`gen_ai.request.model = ..`);
//! the constants are for recording values once a response arrives, e.g.
//! `span.record(GEN_AI_USAGE_INPUT_TOKENS, n)`.

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reason reported for the response (e.g., "end_turn").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// The unique response/message ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

/// Value of `gen_ai.provider.name` for Anthropic.
pub const PROVIDER_ANTHROPIC: &str = "anthropic";
