use crate::dom::Dom;
use crate::{Error, Result};

pub(crate) fn parse_markup(markup: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut stack = vec![dom.root];
    let bytes = markup.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            if let Some(end) = find_subslice(bytes, i + 4, b"-->") {
                i = end + 3;
            } else {
                return Err(Error::MarkupParse("unclosed comment".into()));
            }
            continue;
        }

        if bytes[i] == b'<' {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(markup, i)?;
                i = next;

                while stack.len() > 1 {
                    let top = *stack
                        .last()
                        .ok_or_else(|| Error::MarkupParse("invalid stack state".into()))?;
                    let top_tag = dom.tag_name(top).unwrap_or("");
                    let matched = top_tag.eq_ignore_ascii_case(&tag);
                    stack.pop();
                    if matched {
                        break;
                    }
                }
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(markup, i)?;
            i = next;

            let parent = *stack
                .last()
                .ok_or_else(|| Error::MarkupParse("missing parent element".into()))?;
            let node = dom.create_element(Some(parent), tag.clone(), attrs);

            if tag == "style" {
                // Style text is raw: no nested tags, no entity decoding.
                let close = find_case_insensitive_end_tag(bytes, i, b"style")
                    .ok_or_else(|| Error::MarkupParse("unclosed <style>".into()))?;
                if let Some(css) = markup.get(i..close) {
                    if !css.is_empty() {
                        dom.create_text(node, css.to_string());
                    }
                }
                i = close;
                let (_, after_end) = parse_end_tag(markup, i)?;
                i = after_end;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }

        if let Some(text) = markup.get(text_start..i) {
            if !text.is_empty() {
                let parent = *stack
                    .last()
                    .ok_or_else(|| Error::MarkupParse("missing parent element".into()))?;
                dom.create_text(parent, decode_entities(text));
            }
        }
    }

    Ok(dom)
}

fn parse_start_tag(markup: &str, at: usize) -> Result<(String, Vec<(String, String)>, bool, usize)> {
    let bytes = markup.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::MarkupParse("expected '<'".into()));
    }
    i += 1;

    skip_ws(bytes, &mut i);
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = markup
        .get(tag_start..i)
        .ok_or_else(|| Error::MarkupParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    if tag.is_empty() {
        return Err(Error::MarkupParse("empty tag name".into()));
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(Error::MarkupParse("unclosed start tag".into()));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>') {
            self_closing = true;
            i += 2;
            break;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = markup
            .get(name_start..i)
            .ok_or_else(|| Error::MarkupParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        if name.is_empty() {
            return Err(Error::MarkupParse("invalid attribute name".into()));
        }

        skip_ws(bytes, &mut i);

        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(markup, bytes, &mut i)?
        } else {
            // Boolean attribute, e.g. autofocus.
            String::new()
        };

        attrs.push((name, value));
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(markup: &str, at: usize) -> Result<(String, usize)> {
    let bytes = markup.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::MarkupParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = markup
        .get(tag_start..i)
        .ok_or_else(|| Error::MarkupParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return Err(Error::MarkupParse("unclosed end tag".into()));
    }

    Ok((tag, i + 1))
}

fn parse_attr_value(markup: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Err(Error::MarkupParse("missing attribute value".into()));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(Error::MarkupParse("unclosed attribute value".into()));
        }
        let value = markup
            .get(start..*i)
            .ok_or_else(|| Error::MarkupParse("invalid attribute value".into()))?;
        *i += 1;
        return Ok(decode_entities(value));
    }

    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    let value = markup
        .get(start..*i)
        .ok_or_else(|| Error::MarkupParse("invalid attribute value".into()))?;
    Ok(decode_entities(value))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn is_void_tag(tag: &str) -> bool {
    matches!(tag, "br" | "hr" | "img" | "input" | "link" | "meta")
}

fn is_tag_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-'
}

fn is_attr_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte == b':'
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.len() >= at + needle.len() && &bytes[at..at + needle.len()] == needle
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || bytes.len() < needle.len() {
        return None;
    }
    (from..=bytes.len() - needle.len()).find(|&i| &bytes[i..i + needle.len()] == needle)
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + tag.len() + 2 <= bytes.len() {
        if bytes[i] == b'<' && bytes[i + 1] == b'/' {
            let name = &bytes[i + 2..i + 2 + tag.len()];
            if name.eq_ignore_ascii_case(tag) {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_text() -> Result<()> {
        let dom = parse_markup("<div id='outer'><span>hi</span></div>")?;
        let outer = dom.by_id("outer").expect("outer should exist");
        assert_eq!(dom.text_content(outer), "hi");
        assert_eq!(dom.element_children(outer).len(), 1);
        Ok(())
    }

    #[test]
    fn boolean_attributes_parse_as_empty_values() -> Result<()> {
        let dom = parse_markup("<svg id='g' autofocus tabindex='0'></svg>")?;
        let svg = dom.by_id("g").expect("svg should exist");
        assert_eq!(dom.get_attribute(svg, "autofocus"), Some(String::new()));
        assert_eq!(dom.get_attribute(svg, "tabindex"), Some("0".into()));
        Ok(())
    }

    #[test]
    fn style_content_is_raw_text() -> Result<()> {
        let dom = parse_markup("<div id='s'><style>svg { border: 1px solid; }</style></div>")?;
        let host = dom.by_id("s").expect("host should exist");
        assert_eq!(dom.text_content(host), "svg { border: 1px solid; }");
        Ok(())
    }

    #[test]
    fn unclosed_comment_is_a_parse_error() {
        assert_eq!(
            parse_markup("<div><!-- oops").unwrap_err(),
            Error::MarkupParse("unclosed comment".into())
        );
    }

    #[test]
    fn entities_decode_in_text_and_attribute_values() -> Result<()> {
        let dom = parse_markup("<p id='p' title='a&quot;b&amp;c'>1 &lt; 2</p>")?;
        let p = dom.by_id("p").expect("p should exist");
        assert_eq!(dom.get_attribute(p, "title"), Some("a\"b&c".into()));
        assert_eq!(dom.text_content(p), "1 < 2");
        Ok(())
    }
}
