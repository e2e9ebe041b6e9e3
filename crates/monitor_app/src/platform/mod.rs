mod app;
mod cli;
mod config;
mod console;
mod logging;

pub use app::run_app;
pub use cli::Cli;
