//! Language-model completion port trait.

use crate::domain::error::FinpromptError;

/// Opaque completion seam: prompt text in, completion text or error out.
/// No concrete network adapter ships; embedders and tests supply their
/// own.
pub trait LlmPort {
    fn complete(&self, prompt: &str) -> Result<String, FinpromptError>;
}
