pub mod item;
pub mod site;
pub mod stats;

// Re-exports for convenience
pub use item::*;
pub use site::*;
pub use stats::*;
