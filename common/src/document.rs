use serde::{Deserialize, Serialize};

/// Source format of an uploaded document, resolved once from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Markdown,
    Html,
    /// OneNote-style rich notes. Parsing is stubbed: the raw content is
    /// indexed as a single chunk.
    RichNote,
    PlainText,
}

impl DocumentFormat {
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("md" | "markdown") => Self::Markdown,
            Some("html" | "htm") => Self::Html,
            Some("one") => Self::RichNote,
            // Unknown extensions and extension-less names are treated as
            // plain text rather than rejected.
            _ => Self::PlainText,
        }
    }
}

/// An uploaded document before chunking.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub data: Vec<u8>,
    pub format: DocumentFormat,
}

impl Document {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let format = DocumentFormat::from_file_name(&file_name);
        Self {
            file_name,
            data,
            format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_markdown_extensions() {
        assert_eq!(
            DocumentFormat::from_file_name("notes.md"),
            DocumentFormat::Markdown
        );
        assert_eq!(
            DocumentFormat::from_file_name("notes.MARKDOWN"),
            DocumentFormat::Markdown
        );
    }

    #[test]
    fn resolves_html_extensions() {
        assert_eq!(
            DocumentFormat::from_file_name("page.html"),
            DocumentFormat::Html
        );
        assert_eq!(
            DocumentFormat::from_file_name("page.htm"),
            DocumentFormat::Html
        );
    }

    #[test]
    fn resolves_rich_note_extension() {
        assert_eq!(
            DocumentFormat::from_file_name("journal.one"),
            DocumentFormat::RichNote
        );
    }

    #[test]
    fn falls_back_to_plain_text() {
        assert_eq!(
            DocumentFormat::from_file_name("README.txt"),
            DocumentFormat::PlainText
        );
        assert_eq!(
            DocumentFormat::from_file_name("no_extension"),
            DocumentFormat::PlainText
        );
        assert_eq!(
            DocumentFormat::from_file_name("archive.xyz"),
            DocumentFormat::PlainText
        );
    }

    #[test]
    fn document_new_resolves_format() {
        let document = Document::new("guide.md", b"# Title".to_vec());
        assert_eq!(document.format, DocumentFormat::Markdown);
        assert_eq!(document.file_name, "guide.md");
    }
}
