//! Same-length copy of the input that `tl` tokenizes reliably.
//!
//! `tl` matches tag names by case, stops unquoted attribute values at `/`
//! and parses markup inside `<script>`. The copy it is given fixes those
//! spots in place, byte for byte, so every offset `tl` reports is also an
//! offset into the real source:
//!
//! - tag names are lowercased and whitespace inside tags becomes a space
//! - `/` inside unquoted values is masked, as is a `/` not closing a tag
//! - end tags are compacted to `</name>` followed by padding
//! - a `<` that opens no element (text, comments, declarations, the body
//!   of raw text elements) is masked

use crate::utils::html::is_raw_text_element;

const MASK: u8 = b' ';

#[derive(Clone, Copy, PartialEq, Eq)]
enum Attr {
    Between,
    Name,
    AfterName,
    BeforeValue,
    Unquoted,
    Quoted(u8),
}

pub(super) fn tl_input(html: &str) -> String {
    let mut bytes = html.as_bytes().to_vec();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let lt = i;
        i = match bytes.get(lt + 1).copied() {
            Some(c) if c.is_ascii_alphabetic() => {
                let (end, name) = start_tag(&mut bytes, lt + 1);
                if is_raw_text_element(&name) {
                    raw_text(&mut bytes, end, &name)
                } else {
                    end
                }
            }
            Some(b'/') if bytes.get(lt + 2).is_some_and(u8::is_ascii_alphabetic) => {
                end_tag(&mut bytes, lt + 2)
            }
            Some(b'!') if bytes[lt..].starts_with(b"<!--") => mask_until(&mut bytes, lt, b"-->"),
            Some(b'!' | b'?') => mask_until(&mut bytes, lt, b">"),
            _ => {
                bytes[lt] = MASK;
                lt + 1
            }
        };
    }

    // only ASCII bytes were replaced, so this cannot fail
    String::from_utf8(bytes).unwrap_or_else(|_| html.to_string())
}

/// Normalize a start tag whose name begins at `name_start`. Returns the
/// offset past its `>` and the lowercased name.
fn start_tag(bytes: &mut [u8], name_start: usize) -> (usize, String) {
    let name_end = name_end(bytes, name_start);
    bytes[name_start..name_end].make_ascii_lowercase();
    let name = String::from_utf8_lossy(&bytes[name_start..name_end]).into_owned();

    let mut state = Attr::Between;
    for i in name_end..bytes.len() {
        let c = bytes[i];
        state = match state {
            Attr::Quoted(q) if c == q => Attr::Between,
            Attr::Quoted(q) => Attr::Quoted(q),
            _ if c == b'>' => return (i + 1, name),
            _ if is_space(c) => {
                bytes[i] = MASK;
                match state {
                    Attr::Name => Attr::AfterName,
                    Attr::Unquoted => Attr::Between,
                    other => other,
                }
            }
            Attr::BeforeValue if c == b'"' || c == b'\'' => Attr::Quoted(c),
            Attr::BeforeValue | Attr::Unquoted => {
                if c == b'/' {
                    bytes[i] = b'_';
                }
                Attr::Unquoted
            }
            _ if c == b'=' => Attr::BeforeValue,
            _ if c == b'/' => {
                if bytes.get(i + 1) != Some(&b'>') {
                    bytes[i] = MASK;
                }
                Attr::Between
            }
            _ => Attr::Name,
        };
    }
    (bytes.len(), name)
}

/// Lowercase an end tag and move its `>` right after the name.
fn end_tag(bytes: &mut [u8], name_start: usize) -> usize {
    let name_end = name_end(bytes, name_start);
    bytes[name_start..name_end].make_ascii_lowercase();

    let Some(gt) = find(bytes, name_end, b">") else {
        return bytes.len();
    };
    if gt > name_end {
        bytes[name_end] = b'>';
        bytes[name_end + 1..=gt].fill(MASK);
    }
    gt + 1
}

/// Mask the body of a raw text element up to its end tag.
fn raw_text(bytes: &mut [u8], from: usize, name: &str) -> usize {
    let close = match name {
        "plaintext" => None,
        _ => find_end_tag(bytes, from, name),
    };
    let end = close.unwrap_or(bytes.len());
    mask_lt(&mut bytes[from..end]);
    match close {
        Some(at) => end_tag(bytes, at + 2),
        None => bytes.len(),
    }
}

fn find_end_tag(bytes: &[u8], from: usize, name: &str) -> Option<usize> {
    let mut i = from;
    while let Some(at) = find(bytes, i, b"</") {
        let name_start = at + 2;
        let after = name_start + name.len();
        let name_matches = bytes
            .get(name_start..after)
            .is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes()));
        let terminated = bytes
            .get(after)
            .is_none_or(|&c| is_space(c) || c == b'/' || c == b'>');
        if name_matches && terminated {
            return Some(at);
        }
        i = name_start;
    }
    None
}

/// Mask a comment or declaration starting at `from`.
fn mask_until(bytes: &mut [u8], from: usize, terminator: &[u8]) -> usize {
    let end = find(bytes, from + 2, terminator).map_or(bytes.len(), |at| at + terminator.len());
    mask_lt(&mut bytes[from..end]);
    end
}

fn mask_lt(bytes: &mut [u8]) {
    for b in bytes.iter_mut().filter(|b| **b == b'<') {
        *b = MASK;
    }
}

fn name_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&c| is_space(c) || c == b'/' || c == b'>')
        .map_or(bytes.len(), |p| start + p)
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

#[inline]
fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(input: &str, expected: &str) {
        let out = tl_input(input);
        assert_eq!(out, expected);
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn test_tag_names_lowercased() {
        check("<DIV><IMG SRC=\"a.jpg\"></Div>", "<div><img SRC=\"a.jpg\"></div>");
    }

    #[test]
    fn test_unquoted_slash_masked() {
        check("<img src=/x.png alt=\"a / b\">", "<img src=_x.png alt=\"a / b\">");
        check("<br/><img src=a.jpg />", "<br/><img src=a.jpg />");
        check("<a / href=x>", "<a   href=x>");
    }

    #[test]
    fn test_whitespace_in_tags() {
        check("<img\tsrc='a'\r\nalt=x>", "<img src='a'  alt=x>");
    }

    #[test]
    fn test_end_tag_compacted() {
        check("<p>x</P  >", "<p>x</p>  ");
    }

    #[test]
    fn test_raw_text_masked() {
        check(
            "<script>var s = '<img src=\"a.jpg\">';</SCRIPT><img>",
            "<script>var s = ' img src=\"a.jpg\">';</script><img>",
        );
        check(
            "<textarea><p></textarea ><p>",
            "<textarea> p></textarea> <p>",
        );
        check("<style>a</stylex><b></style>", "<style>a /stylex> b></style>");
    }

    #[test]
    fn test_comments_and_stray_lt() {
        check("<!-- <img> --><p>1 < 2</p>", " !--  img> --><p>1   2</p>");
        check("<!DOCTYPE html><p>", " !DOCTYPE html><p>");
    }

    #[test]
    fn test_non_ascii_untouched() {
        check("<p title=été>ünï</p>", "<p title=été>ünï</p>");
    }
}
