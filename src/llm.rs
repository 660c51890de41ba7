use crate::error::Result;

/// A text-completion model.
///
/// Implementations block until the whole completion is available. Failures
/// are returned to the caller as-is; nothing is retried.
pub trait LanguageModel {
    fn complete(&self, prompt: &str) -> Result<String>;

    /// Model name for diagnostics.
    fn name(&self) -> &str;
}

impl<L: LanguageModel + ?Sized> LanguageModel for Box<L> {
    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
