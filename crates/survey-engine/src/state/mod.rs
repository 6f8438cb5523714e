//! Shared engine state.

mod store;

pub use store::AppState;
