pub mod errors;
pub mod merge;
pub mod models;
pub mod ports;
pub mod upload;
pub mod workflow;

pub use errors::*;
pub use merge::*;
pub use models::*;
pub use ports::*;
pub use upload::*;
pub use workflow::*;
