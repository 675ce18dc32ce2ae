// OpenAI-compatible driver implementation.
//
// Implements `gateway_core::llm::LlmDriver` against the chat/completions
// wire format. This protocol is also the base other OpenAI-compatible
// upstreams speak, so a custom `base_url` covers those too.

mod driver;

#[cfg(test)]
mod tests;

pub use driver::OpenAiDriver;
