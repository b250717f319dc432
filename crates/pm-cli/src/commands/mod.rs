//! CLI subcommand implementations.

pub mod dfg;
pub mod import;
pub mod queue_map;
pub mod render;
pub mod status;
pub mod summary;
pub mod util;
pub mod variants;
