//! Grounded answer generation

pub mod composer;
pub mod prompt;

pub use composer::{AnswerComposer, SORRY_ANSWER};
pub use prompt::PromptBuilder;
