// Utilities module
pub mod config_loader;
pub mod errors;
pub mod incremental;
pub mod logging;

pub use config_loader::*;
pub use errors::*;
pub use incremental::*;
pub use logging::*;
