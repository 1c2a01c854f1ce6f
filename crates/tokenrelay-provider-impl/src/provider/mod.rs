pub mod huggingface;

pub use huggingface::HuggingFaceProvider;
