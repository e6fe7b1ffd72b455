//! OpenAI LLM provider for webpilot.
//!
//! Speaks the chat completions API, so any compatible endpoint works through
//! [`OpenAIProvider::with_url`].

mod api;
mod converter;
mod provider;

pub use provider::OpenAIProvider;
