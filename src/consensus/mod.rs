pub mod justification;
pub mod message;
pub mod processor;
pub mod qc;
pub mod quorum;
pub mod store;

pub use message::*;
pub use processor::*;
pub use qc::*;
pub use quorum::*;
pub use store::*;
