pub mod addon;
pub mod checker;
pub mod connectors;
pub mod settings;
pub mod transport;
pub mod utils;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
