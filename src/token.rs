//! Token generation contracts and the records stores keep for issued tokens.

pub mod generator;
pub mod record;

pub use generator::*;
pub use record::*;
