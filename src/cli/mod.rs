pub mod resolve;
pub mod sync;
