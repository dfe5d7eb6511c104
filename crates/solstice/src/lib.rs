//! An out-of-the-box assistant that assembles the tool loop, built-in
//! tools and model providers.
//!
//! The crate includes a CLI binary for chatting in the terminal, and can
//! also be used as a library to embed the assistant in a host app.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod assistant;
pub mod tools;

pub use assistant::{Assistant, AssistantBuilder};

/// Re-exports of [`solstice_core`] crate.
pub mod core {
    pub use solstice_core::*;
}
