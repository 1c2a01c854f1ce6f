pub mod client;
pub mod provider;
pub mod upstream;

pub use provider::huggingface::{HuggingFaceConfig, HuggingFaceProvider};
