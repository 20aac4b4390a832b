//! Chat completion providers for parley
//!
//! This crate defines the [`LLMProvider`] abstraction and an HTTP client for
//! OpenAI-compatible chat completion endpoints.

pub mod base;
pub mod openai;

pub use base::{to_wire_messages, LLMProvider, LLMResponse, Message, ProviderError, ProviderResult};
pub use openai::{OpenAIClient, DEFAULT_API_BASE};
