/*!
 * Core Module
 * Address-space geometry and shared types
 */

pub mod limits;
pub mod types;

// Re-export for convenience
pub use limits::*;
pub use types::*;
