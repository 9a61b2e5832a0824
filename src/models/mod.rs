pub mod catalog;
pub mod prediction;
pub mod request;

pub use catalog::*;
pub use prediction::*;
pub use request::*;
