mod client;

pub use client::{OpenAIClient, DEFAULT_API_BASE};
