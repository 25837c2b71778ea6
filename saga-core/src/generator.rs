//! The narrative generation seam.
//!
//! The engine never talks to a text-generation service directly. It hands a
//! prompt to a [`NarrativeGenerator`] and gets prose back (or a failure).
//! Closures work too:
//!
//! ```
//! use saga_core::generator::{GenerationError, NarrativeGenerator};
//!
//! let mut echo = |prompt: &str| -> Result<String, GenerationError> {
//!     Ok(format!("You said: {prompt}"))
//! };
//! assert_eq!(echo.generate_text("hi").unwrap(), "You said: hi");
//! ```

use thiserror::Error;

/// Errors from the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Generation service error: {0}")]
    Service(String),

    #[error("Generation service returned no text")]
    Empty,
}

/// A text-generation service: prompt in, prose out.
pub trait NarrativeGenerator {
    /// Generate raw text for a prompt.
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError>;

    /// Generate and trim text, treating a blank answer as a failure.
    fn generate_text(&mut self, prompt: &str) -> Result<String, GenerationError> {
        let text = self.generate(prompt)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text.to_string())
    }
}

impl<F> NarrativeGenerator for F
where
    F: FnMut(&str) -> Result<String, GenerationError>,
{
    fn generate(&mut self, prompt: &str) -> Result<String, GenerationError> {
        self(prompt)
    }
}
