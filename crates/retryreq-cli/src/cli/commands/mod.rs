//! CLI command handlers, one per file.

mod classify;
mod config;
mod render;
mod send;

pub use classify::run_classify;
pub use config::run_config;
pub use render::run_render;
pub use send::run_send;
