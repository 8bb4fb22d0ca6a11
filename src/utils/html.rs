//! HTML utility functions.
//!
//! Provides common HTML processing functions:
//! - `escape_attr()`, `unescape()` - HTML entity handling for attribute values
//! - `is_void_element()` - Self-closing elements (img, source, etc.)
//! - `is_raw_text_element()` - Elements whose content is text (script, textarea, etc.)
//! - `implies_end()` - Optional end tags closed by a following start tag
//! - `start_tag_end()` - Locate the end of a raw start tag
//! - `parse_attributes()` - HTML attribute string parsing

use std::borrow::Cow;

// =============================================================================
// HTML Escaping
// =============================================================================

/// Characters that require escaping inside a double-quoted attribute.
const ESCAPE_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Get the HTML entity for a special character.
#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    }
}

/// Escape HTML attribute values.
///
/// Uses `Cow` to avoid allocation when no escaping is needed.
#[inline]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(ESCAPE_CHARS) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match escape_char(c) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Unescape HTML entities back to characters.
///
/// Handles common named entities and numeric character references.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '&' {
            result.push(c);
            continue;
        }

        // Collect entity
        let mut entity = String::new();
        let mut terminated = false;
        while let Some(&next) = chars.peek() {
            if next == ';' {
                chars.next();
                terminated = true;
                break;
            }
            if (!next.is_ascii_alphanumeric() && next != '#') || entity.len() > 10 {
                break;
            }
            entity.push(next);
            chars.next();
        }

        if !terminated {
            result.push('&');
            result.push_str(&entity);
            continue;
        }

        match entity.as_str() {
            "lt" => result.push('<'),
            "gt" => result.push('>'),
            "amp" => result.push('&'),
            "quot" => result.push('"'),
            "apos" => result.push('\''),
            "nbsp" => result.push('\u{00A0}'),
            s if s.starts_with('#') => {
                let code = if s.starts_with("#x") || s.starts_with("#X") {
                    u32::from_str_radix(&s[2..], 16).ok()
                } else {
                    s[1..].parse().ok()
                };
                match code.and_then(char::from_u32) {
                    Some(c) => result.push(c),
                    None => {
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            _ => {
                result.push('&');
                result.push_str(&entity);
                result.push(';');
            }
        }
    }

    Cow::Owned(result)
}

// =============================================================================
// Element Classification
// =============================================================================

/// Check if an HTML tag is a void element (self-closing).
///
/// Void elements cannot have children and are rendered as `<tag/>`.
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Check if an element's content is text rather than markup.
///
/// `<img>` inside `<script>` or `<textarea>` is a string, not an image.
#[inline]
pub fn is_raw_text_element(tag: &str) -> bool {
    matches!(
        tag,
        "script"
            | "style"
            | "textarea"
            | "title"
            | "xmp"
            | "iframe"
            | "noembed"
            | "noframes"
            | "noscript"
            | "plaintext"
    )
}

/// Whether a `<next>` start tag implicitly closes an open `<open>`
/// element whose end tag may be omitted (`<p>one<p>two`, `<li>a<li>b`).
pub fn implies_end(open: &str, next: &str) -> bool {
    match open {
        "p" => matches!(
            next,
            "p" | "address"
                | "article"
                | "aside"
                | "blockquote"
                | "details"
                | "div"
                | "dl"
                | "fieldset"
                | "figcaption"
                | "figure"
                | "footer"
                | "form"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "header"
                | "hr"
                | "main"
                | "menu"
                | "nav"
                | "ol"
                | "pre"
                | "section"
                | "table"
                | "ul"
        ),
        "li" => next == "li",
        "dt" | "dd" => matches!(next, "dt" | "dd"),
        "option" => matches!(next, "option" | "optgroup"),
        "tr" => next == "tr",
        "td" | "th" => matches!(next, "td" | "th" | "tr"),
        _ => false,
    }
}

// =============================================================================
// Attribute Parsing
// =============================================================================

/// Find the byte offset just past the `>` that closes a raw start tag.
///
/// Only a quote that opens an attribute value (right after `=`) starts a
/// quoted run, so `<p title=it's>` ends at its `>`.
/// Returns `None` if the tag is never closed.
pub fn start_tag_end(raw: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut after_eq = false;
    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if after_eq => quote = Some(c),
            (None, '>') => return Some(i + 1),
            (None, c) if c.is_whitespace() => continue,
            (None, _) => {}
        }
        after_eq = quote.is_none() && c == '=';
    }
    None
}

/// Parse HTML-style attributes from a string.
///
/// Names are lowercased, values are entity-decoded, and a repeated name
/// keeps its first value.
///
/// Input: `srcset="a.jpg 1x" class="foo" hidden`
/// Output: `vec![("srcset", "a.jpg 1x"), ("class", "foo"), ("hidden", "")]`
pub fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() || c == '/' {
            continue;
        }

        // Read attribute name
        let mut name = String::new();
        name.push(c);
        while let Some(&next) = chars.peek() {
            if next == '=' || next == '/' || next.is_whitespace() {
                break;
            }
            name.push(next);
            chars.next();
        }

        // Skip whitespace
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let value = if chars.peek() == Some(&'=') {
            chars.next(); // consume '='

            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }

            let mut val = String::new();
            match chars.peek().copied() {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    for c in chars.by_ref() {
                        if c == quote {
                            break;
                        }
                        val.push(c);
                    }
                }
                _ => {
                    // Unquoted value (read until whitespace)
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        val.push(c);
                        chars.next();
                    }
                }
            }
            unescape(&val).into_owned()
        } else {
            // Boolean attribute (no value)
            String::new()
        };

        let name = name.to_ascii_lowercase();
        if !attrs.iter().any(|(k, _)| *k == name) {
            attrs.push((name, value));
        }
    }

    attrs
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("normal"), "normal");
        assert_eq!(escape_attr("a\"b&c"), "a&quot;b&amp;c");
        assert_eq!(escape_attr("it's"), "it&#39;s");
        assert_eq!(escape_attr("a.jpg 1x, b.jpg 2x"), "a.jpg 1x, b.jpg 2x");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("hello"), "hello");
        assert_eq!(unescape("&lt;script&gt;"), "<script>");
        assert_eq!(unescape("a &amp; b"), "a & b");
        assert_eq!(unescape("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(unescape("&#39;"), "'");
        assert_eq!(unescape("&#x27;"), "'");
        assert_eq!(unescape("&#65;"), "A");
        assert_eq!(unescape("/img?a=1&b=2"), "/img?a=1&b=2");
    }

    #[test]
    fn test_void_elements() {
        assert!(is_void_element("img"));
        assert!(is_void_element("source"));
        assert!(is_void_element("br"));
        assert!(!is_void_element("picture"));
        assert!(!is_void_element("div"));
    }

    #[test]
    fn test_raw_text_elements() {
        assert!(is_raw_text_element("script"));
        assert!(is_raw_text_element("textarea"));
        assert!(!is_raw_text_element("picture"));
    }

    #[test]
    fn test_implies_end() {
        assert!(implies_end("p", "p"));
        assert!(implies_end("p", "div"));
        assert!(!implies_end("p", "img"));
        assert!(implies_end("li", "li"));
        assert!(!implies_end("li", "ul"));
        assert!(!implies_end("div", "div"));
    }

    #[test]
    fn test_start_tag_end() {
        assert_eq!(start_tag_end("<img src=\"a.jpg\">"), Some(17));
        assert_eq!(start_tag_end("<img alt=\"a > b\">rest"), Some(17));
        assert_eq!(start_tag_end("<img alt='x"), None);
        assert_eq!(start_tag_end("<p title=it's>x"), Some(14));
        assert_eq!(start_tag_end("<img src=/x.png alt = 'a > b'>"), Some(30));
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"a="1" b='2' c=3 disabled"#);
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs[0], ("a".to_string(), "1".to_string()));
        assert_eq!(attrs[1], ("b".to_string(), "2".to_string()));
        assert_eq!(attrs[2], ("c".to_string(), "3".to_string()));
        assert_eq!(attrs[3], ("disabled".to_string(), "".to_string()));
    }

    #[test]
    fn test_parse_attributes_self_closing_and_case() {
        let attrs = parse_attributes(r#" SRC="a.jpg" Alt="x &amp; y" /"#);
        assert_eq!(
            attrs,
            vec![
                ("src".to_string(), "a.jpg".to_string()),
                ("alt".to_string(), "x & y".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_attributes_duplicate_keeps_first() {
        let attrs = parse_attributes(r#"class="a" class="b""#);
        assert_eq!(attrs, vec![("class".to_string(), "a".to_string())]);
    }
}
