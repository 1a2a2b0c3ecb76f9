mod cli;
mod config;
mod records;

pub use cli::Args;
pub use cli::Command;
pub use config::Config;
pub use records::load_static_records;
