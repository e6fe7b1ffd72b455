//! DOM-aware selector inference.

mod hints;
mod index;
mod updater;

pub use index::{Candidate, DomIndex, Resolution};
pub use updater::{same_page, update_page, update_selectors_for_page, PageUpdate, SelectorUpdate};
