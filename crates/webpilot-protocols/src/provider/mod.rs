//! LLM Provider protocol definitions.
//!
//! Providers connect to chat completion APIs. The recovery pipeline uses them
//! to ask for a holistic workflow rewrite.

mod request;
mod response;
mod traits;

pub use request::*;
pub use response::*;
pub use traits::*;
