pub mod huggingface;
pub mod relay;
