//! Buffer reformatting.
//!
//! Each language has a small single-pass formatter: it re-breaks lines at
//! structural tokens and re-indents by nesting depth. Strings, comments,
//! regex literals and whitespace-sensitive elements pass through untouched.

mod css;
mod html;
mod js;

use std::iter::Peekable;
use std::str::Chars;

use crate::language::{Buffers, Language};

/// Indentation unit of reformatted buffers.
pub const INDENT: &str = "    ";

/// Reformat `text` as `language`.
pub fn beautify(language: Language, text: &str) -> String {
    match language {
        Language::Markup => html::beautify(text),
        Language::Style => css::beautify(text),
        Language::Script => js::beautify(text),
    }
}

/// Reformat all three buffers.
pub fn beautify_buffers(buffers: &Buffers) -> Buffers {
    let mut pretty = Buffers::default();
    for (language, text) in buffers.iter() {
        pretty.set(language, beautify(language, text));
    }
    pretty
}

/// Output being assembled line by line.
struct Lines {
    out: Vec<String>,
    current: String,
    depth: usize,
}

impl Lines {
    fn new() -> Self {
        Self {
            out: Vec::new(),
            current: String::new(),
            depth: 0,
        }
    }

    /// Emit the pending line, if any. Returns whether a line was written.
    fn flush(&mut self) -> bool {
        let line = self.current.trim();
        if line.is_empty() {
            self.current.clear();
            return false;
        }
        let line = format!("{}{}", INDENT.repeat(self.depth), line);
        self.out.push(line);
        self.current.clear();
        true
    }

    fn push_line(&mut self, line: &str) {
        self.out.push(format!("{}{}", INDENT.repeat(self.depth), line.trim()));
    }

    fn append_to_last(&mut self, s: &str) {
        match self.out.last_mut() {
            Some(last) => last.push_str(s),
            None => self.push_line(s),
        }
    }

    /// Collapse whitespace runs into one space.
    fn space(&mut self) {
        if !self.current.is_empty() && !self.current.ends_with(' ') {
            self.current.push(' ');
        }
    }

    /// Keep one blank line where the source had several line breaks.
    fn blank(&mut self) {
        if self.out.last().is_some_and(|l| !l.is_empty()) {
            self.out.push(String::new());
        }
    }

    /// Close the pending line with ` {` and indent what follows.
    fn open_brace(&mut self) {
        let head = self.current.trim_end();
        self.current = match head {
            "" => "{".to_string(),
            head if head.ends_with(['(', '[']) => format!("{head}{{"),
            head => format!("{head} {{"),
        };
        self.flush();
        self.depth += 1;
    }

    fn finish(mut self) -> String {
        self.flush();
        while self.out.last().is_some_and(String::is_empty) {
            self.out.pop();
        }
        if self.out.is_empty() {
            return String::new();
        }
        let mut text = self.out.join("\n");
        text.push('\n');
        text
    }
}

/// Copy a quoted string whose opening `quote` was already consumed.
fn copy_quoted(chars: &mut Peekable<Chars<'_>>, quote: char, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            c if c == quote => return,
            _ => {}
        }
    }
}

/// Copy a block comment whose `/*` was already consumed.
fn copy_block_comment(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '*' && chars.peek() == Some(&'/') {
            chars.next();
            out.push('/');
            return;
        }
    }
}
