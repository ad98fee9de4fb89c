//! AI Council: a five-member persona advisor panel backed by the Gemini API.
//! Server side: member registry, document upload cache, fan-out dispatcher,
//! in-memory chat store, HTTP router. Client side: session controller,
//! response tokenizer and animation scheduler.

pub mod animate;
pub mod config;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod registry;
pub mod router;
pub mod session;
pub mod store;
pub mod tokens;
