//! CLI library components for `nanolab`.

pub mod logging;
pub mod pipeline;
