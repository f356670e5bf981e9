//! Pattern snapshot adapters.

mod swap_store;

pub use swap_store::ArcSwapPatternStore;
