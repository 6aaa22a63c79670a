//! Tags, headings, attributes, and links.

use super::{
    Frame, Result,
    stack::{BLOCK_TAGS, VOID_TAGS},
};
use crate::{
    title::CanonicalTitle,
    wikicode::{Attribute, ExternalLink, Node, Source, Tag, Wikilink},
};
use core::fmt::Write as _;
use html_escape::{encode_double_quoted_attribute, encode_text};

impl Frame<'_> {
    /// Composes a tag.
    pub(super) fn visit_tag(&mut self, tag: &Tag, in_root: bool, raw: bool) -> Result {
        if let Some(markup) = &tag.wiki_markup
            && self.stack.queue_list(&mut self.out, markup)?
        {
            return self.visit_all(&tag.contents, false, raw);
        }

        let name = if let Some(name) = tag.plain_name() {
            name.to_ascii_lowercase()
        } else {
            self.render(&tag.name, true)?.trim().to_ascii_lowercase()
        };

        if name == "nowiki" {
            if !tag.contents.is_empty() {
                self.stack.flush(&mut self.out, in_root)?;
                let source = Source(&tag.contents).to_string();
                self.write_text(&source, raw);
            }
            return Ok(());
        }

        if BLOCK_TAGS.contains(name.as_str()) {
            self.stack.open_block(&mut self.out, in_root)?;
            match name.as_str() {
                "td" | "th" => self.stack.prepare_cell(&mut self.out)?,
                "tr" => self.stack.prepare_row(&mut self.out)?,
                _ => {}
            }
        } else {
            self.stack.flush(&mut self.out, in_root)?;
        }

        write!(self.out, "<{name}")?;
        for attribute in &tag.attributes {
            self.visit_attribute(attribute)?;
        }

        if tag.self_closing || VOID_TAGS.contains(name.as_str()) {
            self.out += " />";
            return Ok(());
        }

        self.out.push('>');
        self.stack.push(name.as_str());
        self.visit_all(&tag.contents, false, raw || name == "pre")?;
        self.stack.close_to(&mut self.out, &name)?;
        Ok(())
    }

    /// Composes a tag attribute.
    pub(super) fn visit_attribute(&mut self, attribute: &Attribute) -> Result {
        let name = self.render(&attribute.name, true)?;
        write!(self.out, " {}", name.trim())?;
        if let Some(value) = &attribute.value {
            let value = self.render(value, true)?;
            write!(self.out, "=\"{}\"", encode_double_quoted_attribute(&value))?;
        }
        Ok(())
    }

    /// Composes a section heading.
    pub(super) fn visit_heading(
        &mut self,
        level: u8,
        title: &[Node],
        in_root: bool,
        raw: bool,
    ) -> Result {
        self.stack.open_block(&mut self.out, in_root)?;
        let tag = format!("h{}", level.clamp(1, 6));
        self.stack.open(&mut self.out, &tag)?;
        self.visit_all(title, false, raw)?;
        self.stack.close_to(&mut self.out, &tag)?;
        Ok(())
    }

    /// Composes an internal link.
    pub(super) fn visit_wikilink(&mut self, link: &Wikilink, in_root: bool, raw: bool) -> Result {
        self.stack.flush(&mut self.out, in_root)?;

        let target = self.render(&link.title, true)?;
        let title = self.env.resolver.canonicalize_title(&target, "");
        self.open_link(&title)?;

        if let Some(text) = &link.text {
            self.visit_all(text, false, raw)?;
        } else {
            self.write_text(target.trim(), raw);
        }
        if let Some(trail) = &link.trail {
            self.write_text(trail, raw);
        }

        self.stack.close_to(&mut self.out, "a")?;
        Ok(())
    }

    /// Writes a link with the given text to the article with the given title.
    pub(super) fn write_link(&mut self, title: &CanonicalTitle, text: &str, in_root: bool) -> Result {
        self.stack.flush(&mut self.out, in_root)?;
        self.open_link(title)?;
        self.out += &encode_text(text);
        self.stack.close_to(&mut self.out, "a")?;
        Ok(())
    }

    /// Writes the start tag of a link to the article with the given title.
    ///
    /// If red links are enabled and the article does not exist, the link
    /// points to the page editor instead.
    fn open_link(&mut self, title: &CanonicalTitle) -> Result {
        let resolver = self.env.resolver;
        let full_title = title.full_title();
        let full_title = encode_double_quoted_attribute(&full_title);
        if self.env.options.red_links && !resolver.article_exists(title) {
            log::debug!("red link to '{title}'");
            write!(
                self.out,
                r#"<a href="{}" class="new" title="{full_title} (page does not exist)">"#,
                resolver.get_edit_url(title)
            )?;
        } else {
            write!(
                self.out,
                r#"<a href="{}" title="{full_title}">"#,
                encode_double_quoted_attribute(&resolver.get_article_url(title))
            )?;
        }
        self.stack.push("a");
        Ok(())
    }

    /// Composes an external link.
    pub(super) fn visit_external_link(
        &mut self,
        link: &ExternalLink,
        in_root: bool,
        raw: bool,
    ) -> Result {
        self.stack.flush(&mut self.out, in_root)?;

        let url = self.render(&link.url, true)?;
        let url = url.trim();
        let href = encode_double_quoted_attribute(url);

        if !link.brackets {
            write!(
                self.out,
                r#"<a rel="nofollow" class="external free" href="{href}">"#
            )?;
            self.write_text(url, raw);
            self.out += "</a>";
            return Ok(());
        }

        write!(self.out, r#"<a href="{href}">"#)?;
        self.stack.push("a");
        if let Some(title) = &link.title {
            self.visit_all(title, false, raw)?;
        } else {
            self.write_text(url, raw);
        }
        self.stack.close_to(&mut self.out, "a")?;
        Ok(())
    }
}
