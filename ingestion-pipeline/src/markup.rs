use common::error::AppError;
use dom_smoothie::{Article, Readability, TextMode};

/// Extracts readable text from an HTML document as markdown, with links
/// reduced to their label and images removed.
pub fn html_to_markdown(html: &str) -> Result<String, AppError> {
    let config = dom_smoothie::Config {
        text_mode: TextMode::Markdown,
        ..Default::default()
    };
    let mut readability = Readability::new(html.to_string(), None, Some(config))
        .map_err(|e| AppError::DocumentRead(format!("html parsing failed: {e}")))?;
    let article: Article = readability
        .parse()
        .map_err(|e| AppError::DocumentRead(format!("html extraction failed: {e}")))?;

    Ok(strip_links(&article.text_content))
}

/// Replaces `[label](url)` with `label` and removes `![alt](url)` entirely.
/// Malformed constructs pass through untouched.
pub fn strip_links(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while let Some(&current) = chars.get(i) {
        let (is_image, open) = if current == '!' && chars.get(i + 1) == Some(&'[') {
            (true, i + 1)
        } else if current == '[' {
            (false, i)
        } else {
            out.push(current);
            i += 1;
            continue;
        };

        if let Some((label, after)) = parse_bracketed(&chars, open) {
            if !is_image {
                out.push_str(&label);
            }
            i = after;
        } else {
            out.push(current);
            i += 1;
        }
    }

    out
}

/// Parses `[label](target)` starting at the opening bracket. Returns the
/// label and the index just past the closing parenthesis.
fn parse_bracketed(chars: &[char], open: usize) -> Option<(String, usize)> {
    let close = chars
        .get(open + 1..)?
        .iter()
        .position(|&c| c == ']')?
        + open
        + 1;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let paren = chars
        .get(close + 2..)?
        .iter()
        .position(|&c| c == ')')?
        + close
        + 2;
    let label = chars.get(open + 1..close)?.iter().collect();
    Some((label, paren + 1))
}
