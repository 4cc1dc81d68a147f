pub mod catalog;
pub mod export;

pub use catalog::*;
pub use export::*;
