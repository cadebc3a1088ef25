//! Style-buffer queries over plain CSS text.
//!
//! Coordinates are character cells: `x` is the column, `y` the line. The
//! scanner is small. It tracks rule and declaration blocks,
//! at-rule preludes, comments and quoted strings, which is all a selector
//! lookup needs.

use parking_lot::RwLock;

use crate::host::{CssInfo, CssState, ParseError, Point, Position, StyleEditor};

/// [`StyleEditor`] over an in-memory copy of the style buffer.
#[derive(Default)]
pub struct TextStyleEditor {
    text: RwLock<String>,
}

impl TextStyleEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(text.into()),
        }
    }

    /// Replace the buffer, e.g. after the style file changed.
    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }
}

impl StyleEditor for TextStyleEditor {
    fn position_from_coords(&self, point: Point) -> Result<Position, ParseError> {
        if !(point.x.is_finite() && point.y.is_finite()) || point.x < 0.0 || point.y < 0.0 {
            return Err(ParseError(format!(
                "coordinates ({}, {}) outside the buffer",
                point.x, point.y
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (line, ch) = (point.y.floor() as usize, point.x.floor() as usize);

        let text = self.text.read();
        let Some(content) = text.split('\n').nth(line) else {
            return Err(ParseError(format!("line {line} outside the buffer")));
        };
        Ok(Position {
            line,
            ch: ch.min(content.chars().count()),
        })
    }

    fn info_at(&self, position: Position) -> Result<Option<CssInfo>, ParseError> {
        let text = self.text.read();
        let offset = char_offset(&text, position)
            .ok_or_else(|| ParseError(format!("{}:{} outside the buffer", position.line, position.ch)))?;
        Ok(Some(scan(&text, offset)))
    }
}

/// Index into the buffer's chars of `position`.
fn char_offset(text: &str, position: Position) -> Option<usize> {
    let mut offset = 0;
    for (i, line) in text.split('\n').enumerate() {
        let len = line.chars().count();
        if i == position.line {
            return (position.ch <= len).then_some(offset + position.ch);
        }
        offset += len + 1;
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Rules,
    Declarations,
}

struct Scanner {
    blocks: Vec<Block>,
    state: CssState,
    /// Char index where the current selector started
    selector_start: Option<usize>,
    quote: Option<char>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            blocks: vec![Block::Rules],
            state: CssState::Top,
            selector_start: None,
            quote: None,
        }
    }

    fn block(&self) -> Block {
        self.blocks.last().copied().unwrap_or(Block::Rules)
    }

    /// State to fall back to at a block boundary.
    fn resting(&self) -> CssState {
        match self.block() {
            Block::Rules => CssState::Top,
            Block::Declarations => CssState::Property,
        }
    }

    fn step(&mut self, i: usize, c: char) {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return;
        }
        if matches!(c, '"' | '\'') {
            self.quote = Some(c);
            return;
        }

        match (self.block(), self.state, c) {
            (_, _, '}') => {
                if self.blocks.len() > 1 {
                    self.blocks.pop();
                }
                self.selector_start = None;
                self.state = self.resting();
            }
            (Block::Rules, CssState::Selector, '{') => {
                self.blocks.push(Block::Declarations);
                self.selector_start = None;
                self.state = CssState::Property;
            }
            (Block::Rules, CssState::Media, '{') => {
                self.blocks.push(Block::Rules);
                self.state = CssState::Top;
            }
            (Block::Rules, CssState::Media, ';') => self.state = CssState::Top,
            (Block::Rules, CssState::Top, '@') => self.state = CssState::Media,
            (Block::Rules, CssState::Top, c) if !c.is_whitespace() => {
                self.state = CssState::Selector;
                self.selector_start = Some(i);
            }
            (Block::Declarations, CssState::Property, ':') => self.state = CssState::Value,
            (Block::Declarations, CssState::Value, ';') => self.state = CssState::Property,
            _ => {}
        }
    }
}

/// Parser state at char `offset`, with the full selector when on one.
fn scan(text: &str, offset: usize) -> CssInfo {
    let chars: Vec<char> = text.chars().collect();
    let mut scanner = Scanner::new();
    let mut comment_from: Option<CssState> = None;

    let mut i = 0;
    while i < offset.min(chars.len()) {
        let c = chars[i];
        if let Some(previous) = comment_from {
            if c == '*' && chars.get(i + 1) == Some(&'/') {
                scanner.state = previous;
                comment_from = None;
                i += 1;
            }
        } else if scanner.quote.is_none() && c == '/' && chars.get(i + 1) == Some(&'*') {
            comment_from = Some(scanner.state);
            i += 1;
        } else {
            scanner.step(i, c);
        }
        i += 1;
    }

    if comment_from.is_some() {
        return CssInfo {
            state: CssState::Comment,
            selector: None,
        };
    }

    let selector = match (scanner.state, scanner.selector_start) {
        (CssState::Selector, Some(start)) => {
            let end = chars[start..]
                .iter()
                .position(|c| *c == '{')
                .map_or(chars.len(), |n| start + n);
            let selector: String = chars[start..end].iter().collect();
            Some(selector.trim().to_string()).filter(|s| !s.is_empty())
        }
        _ => None,
    };

    CssInfo {
        state: scanner.state,
        selector,
    }
}
