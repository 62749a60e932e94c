// crates/core/src/lib.rs
pub mod context;
pub mod display;
pub mod error;
pub mod render;

pub use context::*;
pub use display::*;
pub use error::*;
pub use render::*;
