// The proxy surface: a provider-agnostic orchestrator (`engine`) plus
// wire-format translation shared by the two provider modules
// (`wire`), and the two concrete routes (`anthropic`, `openai`).

pub mod anthropic;
pub mod engine;
pub mod openai;
pub mod wire;
