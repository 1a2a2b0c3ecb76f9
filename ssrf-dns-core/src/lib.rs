pub mod audit;
pub mod engine;
pub mod records;
pub mod server;
pub mod state;
pub mod upstream;

pub use audit::*;
pub use engine::*;
pub use records::*;
pub use server::*;
pub use state::*;
pub use upstream::*;
