use common::{
    document::{Document, DocumentFormat},
    error::AppError,
};
use tokenizers::Tokenizer;
use tracing::debug;

use crate::markup;

/// Splits documents into token-bounded, overlapping chunks.
///
/// Markdown is split into heading-delimited sections first so a window never
/// spans two sections; HTML is readability-extracted to markdown before that.
/// Within a section, and in plain text, blank lines delimit paragraphs and
/// each paragraph is windowed on its own.
#[derive(Debug)]
pub struct TokenChunker {
    tokenizer: Tokenizer,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TokenChunker {
    pub fn new(
        tokenizer: Tokenizer,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, AppError> {
        if chunk_overlap == 0 {
            return Err(AppError::Config(
                "chunk_overlap must be greater than zero".to_string(),
            ));
        }
        if chunk_size <= chunk_overlap {
            return Err(AppError::Config(format!(
                "chunk_size ({chunk_size}) must be greater than chunk_overlap ({chunk_overlap})"
            )));
        }
        Ok(Self {
            tokenizer,
            chunk_size,
            chunk_overlap,
        })
    }

    /// Loads the tokenizer vocabulary from the HuggingFace hub.
    pub fn from_pretrained(
        identifier: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, AppError> {
        let tokenizer = Tokenizer::from_pretrained(identifier, None)
            .map_err(|e| AppError::Config(format!("failed to load tokenizer '{identifier}': {e}")))?;
        Self::new(tokenizer, chunk_size, chunk_overlap)
    }

    /// Chunks a document. Never errors past this boundary: an unreadable
    /// document yields a single diagnostic chunk instead.
    pub fn process(&self, document: &Document) -> Vec<String> {
        match self.try_process(document) {
            Ok(chunks) => chunks,
            Err(e) => vec![format!(
                "Failed to process document '{}': {e}",
                document.file_name
            )],
        }
    }

    fn try_process(&self, document: &Document) -> Result<Vec<String>, AppError> {
        let text = String::from_utf8(document.data.clone()).map_err(|e| {
            AppError::DocumentRead(format!("document is not valid UTF-8: {e}"))
        })?;

        let chunks = match document.format {
            DocumentFormat::Markdown => self.chunk_markdown(&text)?,
            DocumentFormat::Html => {
                let markdown = markup::html_to_markdown(&text)?;
                self.chunk_markdown(&markdown)?
            }
            // Rich-note parsing is stubbed: the raw content becomes a single
            // chunk, oversized or not.
            DocumentFormat::RichNote => vec![text],
            DocumentFormat::PlainText => self.chunk_paragraphs(&text)?,
        };

        debug!(
            file_name = %document.file_name,
            format = ?document.format,
            chunk_count = chunks.len(),
            "Chunked document"
        );
        Ok(chunks)
    }

    /// Splits on heading lines, then windows each section's paragraphs with
    /// the heading kept at the front of its section.
    fn chunk_markdown(&self, text: &str) -> Result<Vec<String>, AppError> {
        let mut chunks = Vec::new();
        for section in split_sections(text) {
            chunks.extend(self.chunk_paragraphs(&section)?);
        }
        Ok(chunks)
    }

    /// Windows each blank-line-delimited paragraph on its own, so unrelated
    /// paragraphs never share a chunk. Continuous text is one paragraph.
    fn chunk_paragraphs(&self, text: &str) -> Result<Vec<String>, AppError> {
        let mut chunks = Vec::new();
        for paragraph in split_paragraphs(text) {
            chunks.extend(self.window(&paragraph)?);
        }
        Ok(chunks)
    }

    /// Token-windows one stretch of text: window `chunk_size`, stride
    /// `chunk_size - chunk_overlap`, final window may be short.
    fn window(&self, text: &str) -> Result<Vec<String>, AppError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| AppError::DocumentRead(format!("tokenization failed: {e}")))?;
        let ids = encoding.get_ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let stride = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = usize::min(start + self.chunk_size, ids.len());
            let window = ids.get(start..end).unwrap_or_default();
            let piece = self
                .tokenizer
                .decode(window, true)
                .map_err(|e| AppError::DocumentRead(format!("detokenization failed: {e}")))?;
            chunks.push(piece);
            if end == ids.len() {
                break;
            }
            start += stride;
        }
        Ok(chunks)
    }
}

/// Splits markdown into sections delimited by heading lines (1-6 `#`
/// followed by a space). The heading stays with the section it opens;
/// content before the first heading forms its own section.
fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if is_heading(line) && !current.is_empty() {
            sections.push(current.join("\n"));
            current = Vec::new();
        }
        current.push(line);
    }
    if !current.is_empty() {
        sections.push(current.join("\n"));
    }
    sections
}

/// Splits text into paragraphs at blank-line boundaries. Whitespace-only
/// lines count as blank; leading and trailing blank runs produce nothing.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current = Vec::new();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && line.chars().nth(hashes) == Some(' ')
}

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use serde_json::json;
    use tokenizers::Tokenizer;

    use super::TokenChunker;

    /// Builds an offline whitespace word-level tokenizer over the given
    /// vocabulary, so chunker tests need no model downloads.
    pub fn word_tokenizer(words: &[String]) -> Tokenizer {
        let mut vocab = serde_json::Map::new();
        vocab.insert("[UNK]".to_string(), json!(0));
        for (position, word) in words.iter().enumerate() {
            vocab.insert(word.clone(), json!(position + 1));
        }

        let definition = json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let bytes = serde_json::to_vec(&definition).expect("tokenizer definition");
        Tokenizer::from_bytes(&bytes).expect("word-level tokenizer")
    }

    pub fn word_chunker(
        words: &[String],
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> TokenChunker {
        TokenChunker::new(word_tokenizer(words), chunk_size, chunk_overlap).expect("chunker")
    }

    /// `count` distinct single-word tokens: `w0 w1 w2 ...`.
    pub fn numbered_words(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("w{i}")).collect()
    }
}
