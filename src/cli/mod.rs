mod commands;

pub use commands::{Cli, Commands, GlobalArgs, heatmap_text, run};
