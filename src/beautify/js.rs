use std::iter::Peekable;
use std::str::Chars;

use super::{Lines, copy_block_comment, copy_quoted};

/// Breaks after `{` and statement-ending `;`, before `}`, and re-indents by
/// brace depth. Source line breaks are kept; runs of blank lines collapse
/// to one.
pub fn beautify(source: &str) -> String {
    let mut lines = Lines::new();
    // Open parens and brackets per brace level; `;` only ends a statement at 0
    let mut parens: Vec<usize> = vec![0];
    let mut newlines = 0usize;
    let mut prev: Option<char> = None;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            newlines += 1;
            lines.flush();
            continue;
        }
        if c.is_whitespace() {
            lines.space();
            continue;
        }
        if newlines > 1 {
            lines.blank();
        }
        newlines = 0;

        // `}else`, `}while`
        if lines.current.ends_with('}') && is_ident_char(c) {
            lines.current.push(' ');
        }

        match c {
            '"' | '\'' | '`' => {
                lines.current.push(c);
                copy_quoted(&mut chars, c, &mut lines.current);
            }
            '/' if chars.peek() == Some(&'/') => {
                lines.current.push('/');
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    lines.current.push(next);
                    chars.next();
                }
                continue;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                lines.current.push_str("/*");
                copy_block_comment(&mut chars, &mut lines.current);
                continue;
            }
            '/' if starts_regex(prev) => {
                lines.current.push('/');
                copy_regex(&mut chars, &mut lines.current);
            }
            '(' | '[' => {
                if let Some(open) = parens.last_mut() {
                    *open += 1;
                }
                lines.current.push(c);
            }
            ')' | ']' => {
                if let Some(open) = parens.last_mut() {
                    *open = open.saturating_sub(1);
                }
                lines.current.push(c);
            }
            '{' => {
                lines.open_brace();
                parens.push(0);
            }
            '}' => {
                lines.flush();
                lines.depth = lines.depth.saturating_sub(1);
                if parens.len() > 1 {
                    parens.pop();
                }
                lines.current.push('}');
            }
            ';' => {
                lines.current.push(';');
                if parens.last() == Some(&0) {
                    lines.flush();
                }
            }
            c => lines.current.push(c),
        }
        prev = Some(c);
    }
    lines.finish()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// A `/` after an operator or at the start of input opens a regex literal.
fn starts_regex(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(p) => "(,=:[!&|?{};+-*%<>~^".contains(p),
    }
}

/// Copy a regex body and its closing `/`. Flags follow as ordinary chars.
fn copy_regex(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    let mut in_class = false;
    while let Some(&c) = chars.peek() {
        if c == '\n' {
            return;
        }
        chars.next();
        out.push(c);
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return,
            _ => {}
        }
    }
}
