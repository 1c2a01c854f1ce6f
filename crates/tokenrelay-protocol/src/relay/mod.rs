pub mod error;
pub mod generate;
