use super::Lines;
use crate::utils::html::{is_phrasing_element, is_verbatim_element, is_void_element};

/// Block elements on their own lines, phrasing content kept in flow.
///
/// A block whose content is only phrasing stays on one line:
/// `<li>a <em>b</em></li>`.
pub fn beautify(source: &str) -> String {
    let mut lines = Lines::new();
    // The last line is a block open tag still waiting for its content
    let mut just_opened = false;
    let mut rest = source;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after.find("-->").map_or(after.len(), |i| i + 3);
            lines.flush();
            lines.push_line(&rest[..4 + end]);
            just_opened = false;
            rest = &after[end..];
            continue;
        }

        if rest.starts_with('<') {
            if let Some(tag) = Tag::parse(rest) {
                rest = &rest[tag.raw.len()..];

                if tag.name.starts_with('!') {
                    lines.flush();
                    lines.push_line(tag.raw);
                    just_opened = false;
                } else if is_verbatim_element(&tag.name) && !tag.closing && !tag.self_closing {
                    let end = verbatim_end(rest, &tag.name);
                    lines.flush();
                    lines.push_line(&format!("{}{}", tag.raw, &rest[..end]));
                    just_opened = false;
                    rest = &rest[end..];
                } else if is_phrasing_element(&tag.name) {
                    lines.current.push_str(tag.raw);
                } else if tag.closing {
                    lines.depth = lines.depth.saturating_sub(1);
                    if just_opened {
                        let content = lines.current.trim().to_string();
                        lines.current.clear();
                        lines.append_to_last(&format!("{content}{}", tag.raw));
                    } else {
                        lines.flush();
                        lines.push_line(tag.raw);
                    }
                    just_opened = false;
                } else if is_void_element(&tag.name) || tag.self_closing {
                    lines.flush();
                    lines.push_line(tag.raw);
                    just_opened = false;
                } else {
                    lines.flush();
                    lines.push_line(tag.raw);
                    lines.depth += 1;
                    just_opened = true;
                }
                continue;
            }
        }

        // Text up to the next `<`; a `<` that opens no tag is text too
        let end = rest
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '<')
            .map_or(rest.len(), |(i, _)| i);
        for c in rest[..end].chars() {
            if c.is_whitespace() {
                lines.space();
            } else {
                lines.current.push(c);
            }
        }
        rest = &rest[end..];
    }
    lines.finish()
}

struct Tag<'a> {
    raw: &'a str,
    /// Lowercased; `!doctype` for declarations
    name: String,
    closing: bool,
    self_closing: bool,
}

impl<'a> Tag<'a> {
    /// Parse the tag at the start of `s`, honoring quoted attribute values.
    fn parse(s: &'a str) -> Option<Self> {
        let mut quote = None;
        for (i, c) in s.char_indices().skip(1) {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '<') => return None,
                (None, '>') => return Self::from_raw(&s[..=i]),
                _ => {}
            }
        }
        None
    }

    fn from_raw(raw: &'a str) -> Option<Self> {
        let inner = &raw[1..raw.len() - 1];
        let closing = inner.starts_with('/');
        let name = inner
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        let valid = name.starts_with('!') || name.starts_with(|c: char| c.is_ascii_alphabetic());
        valid.then(|| Self {
            raw,
            name,
            closing,
            self_closing: inner.ends_with('/'),
        })
    }
}

/// Length of a verbatim element's content plus its close tag.
fn verbatim_end(rest: &str, name: &str) -> usize {
    let close = format!("</{name}");
    let Some(start) = rest.to_ascii_lowercase().find(&close) else {
        return rest.len();
    };
    rest[start..].find('>').map_or(rest.len(), |i| start + i + 1)
}
