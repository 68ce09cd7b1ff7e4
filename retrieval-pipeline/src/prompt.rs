use common::index::ScoredChunk;

/// The grounded-answer prompt. Context and question are substituted
/// verbatim; an empty corpus leaves the context blank but still asks.
pub const PROMPT_TEMPLATE: &str =
    "Using the following context, answer the question:\n\nContext: {context}\n\nQuestion: {query}\nAnswer:";

/// Chunk texts in relevance order, separated by blank lines.
pub fn assemble_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(context: &str, query: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{query}", query)
}
