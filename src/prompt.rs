use crate::loader::DocumentChunk;

/// Placed between the texts of consecutive context chunks.
pub const CONTEXT_SEPARATOR: &str = "\n\n - -\n\n";

/// Prompt sent to the language model; `{context}` and `{question}` are
/// substituted by [`assemble`].
pub const PROMPT_TEMPLATE: &str = "
Answer the question based only on the following context:
{context}
 - -
Answer the question based on the above context: {question}
";

/// Join the chunk texts into a context block and fill in the template.
///
/// The context is not truncated to fit any context window.
///
/// # Examples
///
/// ```
/// use docchat::{DocumentChunk, prompt::assemble};
///
/// let chunks = vec![
///     DocumentChunk::new("Onions".into(), "a.txt".into(), 0),
///     DocumentChunk::new("Stock".into(), "a.txt".into(), 1),
/// ];
/// let prompt = assemble(&chunks, "What goes in the soup?");
/// assert!(prompt.contains("Onions\n\n - -\n\nStock"));
/// assert!(prompt.ends_with("above context: What goes in the soup?\n"));
/// ```
pub fn assemble(chunks: &[DocumentChunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(DocumentChunk::text)
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    // Substitute the question first so a `{question}` inside the context
    // is left alone.
    PROMPT_TEMPLATE
        .replace("{question}", question)
        .replacen("{context}", &context, 1)
}
