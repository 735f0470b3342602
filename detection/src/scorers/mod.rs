pub mod lexical;
pub mod risk;

pub use risk::*;
