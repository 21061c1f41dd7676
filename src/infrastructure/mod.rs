// Infrastructure layer
pub mod adapter;
pub mod engine;
pub mod file_system;
pub mod html;
pub mod node_resolver;
pub mod path_resolver;
pub mod processors;

pub use adapter::*;
pub use engine::*;
pub use file_system::*;
pub use html::*;
pub use node_resolver::*;
pub use path_resolver::*;
pub use processors::*;
