// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod history;
pub mod plan;
pub mod runtime;
pub mod session;
pub mod util;

pub use error::{Error, Result};
