//! Text runs: escaping, line breaks, paragraphs, and indent-pre.

use super::{Frame, Result, stack};
use html_escape::encode_text;

/// A piece of a text run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Chunk<'a> {
    /// Text without line breaks.
    Line(&'a str),
    /// A run of consecutive line breaks.
    Newlines(usize),
}

/// Splits text into lines and runs of line breaks.
fn chunks(text: &str) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let end = rest.find('\n').unwrap_or(rest.len());
        if end != 0 {
            chunks.push(Chunk::Line(&rest[..end]));
        }
        rest = &rest[end..];

        let count = rest.len() - rest.trim_start_matches('\n').len();
        if count != 0 {
            chunks.push(Chunk::Newlines(count));
        }
        rest = &rest[count..];
    }
    chunks
}

/// Returns the line without its leading space if the line is indented text.
fn indented(line: &str) -> Option<&str> {
    line.strip_prefix(' ').filter(|_| !line.trim().is_empty())
}

impl Frame<'_> {
    /// Composes a text node.
    pub(super) fn visit_text(&mut self, value: &str, in_root: bool, raw: bool) -> Result {
        if raw {
            self.out += value;
            return Ok(());
        }

        let text = encode_text(value);
        let chunks = chunks(&text);
        let mut at_line_start = self.out.is_empty() || self.out.ends_with('\n');
        for (index, chunk) in chunks.iter().enumerate() {
            match *chunk {
                Chunk::Line(line) => {
                    self.write_line(line, at_line_start, in_root)?;
                    at_line_start = false;
                }
                Chunk::Newlines(count) => {
                    let next = match chunks.get(index + 1) {
                        Some(Chunk::Line(line)) => Some(*line),
                        _ => None,
                    };
                    self.write_newlines(count, next, in_root)?;
                    at_line_start = true;
                }
            }
        }
        Ok(())
    }

    /// Writes a line of escaped text.
    fn write_line(&mut self, line: &str, at_line_start: bool, in_root: bool) -> Result {
        if self.stack.in_indent_pre() {
            let line = if at_line_start {
                indented(line).unwrap_or(line)
            } else {
                line
            };
            self.out += line;
            return Ok(());
        }

        if at_line_start && in_root && self.stack.is_empty() && !self.stack.has_pending() {
            if let Some(rest) = indented(line) {
                self.stack.open_indent_pre(&mut self.out)?;
                self.out += rest;
                return Ok(());
            } else if line.trim().is_empty() {
                self.out += line;
                return Ok(());
            }
        }

        self.stack.flush(&mut self.out, in_root)?;
        self.out += line;
        Ok(())
    }

    /// Writes a run of line breaks, closing and opening blocks as needed.
    ///
    /// `next` is the line which follows in the same text run, if any.
    fn write_newlines(&mut self, mut count: usize, next: Option<&str>, in_root: bool) -> Result {
        if self.stack.has_pending() {
            self.stack.open_lists(&mut self.out)?;
        }

        if self.stack.in_indent_pre() {
            self.out.push('\n');
            if count == 1 && next.and_then(indented).is_some() {
                return Ok(());
            }
            self.stack.close_indent_pre(&mut self.out)?;
            count -= 1;
            if count == 0 {
                return Ok(());
            }
        }

        if self.stack.top().is_some_and(stack::is_list_close_tag) {
            self.push_newlines(count);
            self.stack.close_list_items(&mut self.out, count)?;
            return Ok(());
        }

        if count == 1 {
            self.out.push('\n');
            return Ok(());
        }

        if in_root && self.stack.contains("p") {
            self.out.push('\n');
            self.stack.close_to(&mut self.out, "p")?;
        } else if in_root {
            self.out.push('\n');
        } else {
            self.push_newlines(count);
            return Ok(());
        }

        for _ in 0..(count - 2) / 2 {
            self.out += "<p><br />\n</p>";
        }

        if count % 2 == 1 && (next.is_some() || count == 3) {
            self.stack.open(&mut self.out, "p")?;
            self.out += "<br />\n";
        }

        Ok(())
    }

    /// Writes `count` line breaks.
    fn push_newlines(&mut self, count: usize) {
        self.out.extend(core::iter::repeat_n('\n', count));
    }
}
