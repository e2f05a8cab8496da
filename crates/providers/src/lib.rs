pub mod backend;
pub mod gemini;
pub mod policy;
