//! Agent runtime: the LLM-backed crew that writes quote narratives.
//!
//! The crew follows a constrained loop:
//! 1. **Tools** (`tools`) - deterministic pricing calculators whose results are handed to
//!    the agents as JSON context
//! 2. **Crew** (`crew`) - four sequential `LlmClient` calls, one per specialist profile
//! 3. **Guardrails** (`guardrails`) - the narrative must quote the deterministic total
//! 4. **Runtime** (`runtime`) - cache lookup, metrics and fallback to the generated document
//!
//! `transport` carries A2A messages to external agents over HTTP.
//!
//! # Safety Principle
//!
//! The LLM is strictly a writer. It NEVER decides prices; those come from the pricing
//! engine in `transpak-core`, and the persisted total is always the deterministic one.

pub mod crew;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod tools;
pub mod transport;

pub use llm::{client_from_config, LlmClient, OpenAiCompatibleClient};
pub use runtime::{AgentRuntime, Narration, NarrativeSource};
pub use transport::HttpExternalTransport;
