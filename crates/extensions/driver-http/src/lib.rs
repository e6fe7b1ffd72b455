//! # webpilot HTTP driver
//!
//! An [`AutomationDriver`](webpilot_protocols::AutomationDriver) for pages
//! that work without scripts. Pages are fetched over HTTP and selectors are
//! evaluated against the parsed document; clicking a link follows it and
//! typed values are remembered per selector.

mod driver;
mod page;

pub use driver::HttpDriver;
