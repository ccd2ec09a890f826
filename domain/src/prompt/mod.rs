//! Prompt construction for every model call the pipeline makes.

pub mod template;

pub use template::PromptTemplate;
