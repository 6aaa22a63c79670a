//! The open tag stack and pending list queue of a composer frame.

use core::fmt::{self, Write as _};
use std::mem;

/// The tags opened by a Wikitext list marker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ListKind {
    /// The list container tag.
    list: &'static str,
    /// The list item tag.
    item: &'static str,
}

/// List markers, and the tags they open.
static LIST_MARKERS: phf::Map<&'static str, ListKind> = phf::phf_map! {
    "*" => ListKind { list: "ul", item: "li" },
    "#" => ListKind { list: "ol", item: "li" },
    ";" => ListKind { list: "dl", item: "dt" },
    ":" => ListKind { list: "dl", item: "dd" },
};

/// List container tags.
static LIST_TAGS: phf::Set<&str> = phf::phf_set! {
    "dl", "ol", "ul"
};

/// Tags which are closed by line breaks.
static LIST_CLOSE_TAGS: phf::Set<&str> = phf::phf_set! {
    "dd", "dl", "dt", "li", "ol", "ul"
};

/// Tags which lists inside of them cannot escape from.
static LIST_BOUNDARY_TAGS: phf::Set<&str> = phf::phf_set! {
    "blockquote", "caption", "div", "table", "td", "th", "tr"
};

/// Tags which are never wrapped in a paragraph.
pub(super) static BLOCK_TAGS: phf::Set<&str> = phf::phf_set! {
    "blockquote", "caption", "center", "dd", "div", "dl", "dt", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "li", "ol", "p", "pre", "table", "td", "th",
    "tr", "ul"
};

/// Tags which never have content.
pub(super) static VOID_TAGS: phf::Set<&str> = phf::phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr"
};

/// Returns true if the given tag is closed by a line break.
pub(super) fn is_list_close_tag(tag: &str) -> bool {
    LIST_CLOSE_TAGS.contains(tag)
}

/// Returns true if the given HTML starts with a block-level element.
pub(super) fn starts_with_block(html: &str) -> bool {
    html.trim_start().strip_prefix('<').is_some_and(|rest| {
        let end = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        BLOCK_TAGS.contains(rest[..end].to_ascii_lowercase().as_str())
    })
}

/// The open tags of a composer frame.
#[derive(Debug, Default)]
pub(super) struct TagStack {
    /// Open tag names, outermost first.
    open: Vec<String>,
    /// List markers which have been seen but not yet opened.
    pending: Vec<ListKind>,
    /// Whether the innermost `pre` was opened by indented text.
    indent_pre: bool,
}

impl TagStack {
    /// Writes a start tag and pushes it to the stack.
    pub fn open(&mut self, out: &mut String, name: &str) -> fmt::Result {
        write!(out, "<{name}>")?;
        self.push(name);
        Ok(())
    }

    /// Pushes an already written start tag to the stack.
    pub fn push(&mut self, name: impl Into<String>) {
        self.open.push(name.into());
    }

    /// Closes every tag from the top of the stack down to and including the
    /// innermost tag with the given name. If there is no such tag, nothing is
    /// closed.
    pub fn close_to(&mut self, out: &mut String, name: &str) -> fmt::Result {
        if let Some(index) = self.open.iter().rposition(|tag| tag == name) {
            self.truncate(out, index)?;
        }
        Ok(())
    }

    /// Opens any pending lists and then closes every open tag.
    pub fn close_all(&mut self, out: &mut String) -> fmt::Result {
        self.open_lists(out)?;
        self.truncate(out, 0)
    }

    /// Returns true if a tag with the given name is open.
    pub fn contains(&self, name: &str) -> bool {
        self.open.iter().any(|tag| tag == name)
    }

    /// The innermost open tag.
    pub fn top(&self) -> Option<&str> {
        self.open.last().map(String::as_str)
    }

    /// Returns true if no tags are open.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Returns true if there are list markers which have not been opened.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns true if the innermost `pre` was opened by indented text and is
    /// still open.
    pub fn in_indent_pre(&self) -> bool {
        self.indent_pre
    }

    /// Queues the list opened by the given Wikitext markup.
    ///
    /// Returns false if the markup is not a list marker.
    pub fn queue_list(&mut self, out: &mut String, markup: &str) -> Result<bool, fmt::Error> {
        let Some(&kind) = LIST_MARKERS.get(markup) else {
            return Ok(false);
        };

        // Definition lists and ordered/unordered lists cannot nest inside
        // each other.
        if kind.list == "dl" {
            for list in ["ol", "ul"] {
                self.close_to(out, list)?;
            }
        } else {
            self.close_to(out, "dl")?;
        }

        self.pending.push(kind);
        Ok(true)
    }

    /// Prepares the stack for content.
    ///
    /// Pending lists are opened. Otherwise, at the root of a document with
    /// nothing open, a paragraph is opened.
    pub fn flush(&mut self, out: &mut String, in_root: bool) -> fmt::Result {
        if self.has_pending() {
            self.open_lists(out)
        } else if in_root && self.is_empty() {
            self.open(out, "p")
        } else {
            Ok(())
        }
    }

    /// Prepares the stack for a block-level element.
    ///
    /// Pending lists are opened. Otherwise, at the root of a document, any open
    /// paragraph is closed.
    pub fn open_block(&mut self, out: &mut String, in_root: bool) -> fmt::Result {
        if self.has_pending() {
            self.open_lists(out)
        } else if in_root {
            self.close_to(out, "p")
        } else {
            Ok(())
        }
    }

    /// Opens a table row if a cell is started outside of one.
    pub fn prepare_cell(&mut self, out: &mut String) -> fmt::Result {
        if let Some(table) = self.open.iter().rposition(|tag| tag == "table")
            && !self.open[table..].iter().any(|tag| tag == "tr")
        {
            self.open(out, "tr")?;
        }
        Ok(())
    }

    /// Closes the current table row before a new one is started.
    pub fn prepare_row(&mut self, out: &mut String) -> fmt::Result {
        if let Some(table) = self.open.iter().rposition(|tag| tag == "table")
            && let Some(row) = self.open[table..].iter().position(|tag| tag == "tr")
        {
            self.truncate(out, table + row)?;
        }
        Ok(())
    }

    /// Closes up to `count` list tags from the top of the stack.
    pub fn close_list_items(&mut self, out: &mut String, count: usize) -> fmt::Result {
        for _ in 0..count {
            match self.open.last() {
                Some(tag) if is_list_close_tag(tag) => {
                    let index = self.open.len() - 1;
                    self.truncate(out, index)?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Opens a preformatted block for indented text.
    pub fn open_indent_pre(&mut self, out: &mut String) -> fmt::Result {
        self.open(out, "pre")?;
        self.indent_pre = true;
        Ok(())
    }

    /// Closes the preformatted block opened for indented text.
    pub fn close_indent_pre(&mut self, out: &mut String) -> fmt::Result {
        self.close_to(out, "pre")
    }

    /// Opens the pending lists, reusing any lists which are already open.
    ///
    /// Open lists which match a prefix of the pending lists are kept, the rest
    /// of the stack above them is closed, the remaining pending lists are
    /// opened, and finally the item of the last pending list is opened.
    pub fn open_lists(&mut self, out: &mut String) -> fmt::Result {
        let pending = mem::take(&mut self.pending);
        let Some(last) = pending.last() else {
            return Ok(());
        };

        let base = self
            .open
            .iter()
            .rposition(|tag| LIST_BOUNDARY_TAGS.contains(tag.as_str()))
            .map_or(0, |index| index + 1);

        let lists = self.open[base..]
            .iter()
            .enumerate()
            .filter(|(_, tag)| LIST_TAGS.contains(tag.as_str()))
            .map(|(index, _)| base + index)
            .collect::<Vec<_>>();

        let common = lists
            .iter()
            .zip(&pending)
            .take_while(|(index, kind)| self.open[**index] == kind.list)
            .count();

        let keep = if common > 0 {
            lists[common - 1] + 1
        } else if let Some(&first) = lists.first() {
            first
        } else if let Some(graf) = self.open[base..].iter().rposition(|tag| tag == "p") {
            base + graf
        } else {
            self.open.len()
        };
        self.truncate(out, keep)?;

        for kind in &pending[common..] {
            self.open(out, kind.list)?;
        }
        self.open(out, last.item)
    }

    /// Closes every tag above the given stack depth.
    fn truncate(&mut self, out: &mut String, len: usize) -> fmt::Result {
        for tag in self.open.drain(len..).rev() {
            if tag == "pre" {
                self.indent_pre = false;
            }
            write!(out, "</{tag}>")?;
        }
        Ok(())
    }
}
