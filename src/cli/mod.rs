pub mod args;
pub mod display;
pub mod menu;

pub use args::CliArgs;
pub use menu::run_interactive_mode;
