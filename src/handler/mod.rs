//! Request handler module
//!
//! Routes requests to the welcome, metadata, probe and prediction handlers.

pub mod predict;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
