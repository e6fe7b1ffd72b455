//! Error types for the webpilot protocol layer.

mod driver;
mod engine;
mod node;
mod provider;
mod recovery;

pub use driver::*;
pub use engine::*;
pub use node::*;
pub use provider::*;
pub use recovery::*;
