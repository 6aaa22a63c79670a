//! HTML composition of Wikitext node trees.
//!
//! The composer walks a node tree depth-first and writes HTML to a single
//! buffer. Because Wikitext block structure is implied by line breaks and
//! markers instead of being explicit, the composer keeps a stack of open tags
//! and a queue of pending list markers, and decides when to open and close
//! paragraphs, lists, table rows, and preformatted blocks as content arrives:
//!
//! * Content at the root of a document is wrapped in a paragraph if nothing
//!   else is open.
//! * List markers (`*`, `#`, `;`, `:`) are queued and only turned into tags
//!   when the next content arrives, so that consecutive markers can share the
//!   lists that are already open.
//! * Runs of newlines close paragraphs and list items, and runs longer than
//!   two synthesise empty paragraphs.
//! * Lines at the root starting with a space are preformatted.
//!
//! Template expressions are expanded by composing the template body in a new,
//! nested composer frame which only sees the parameters of its own call. The
//! nested output is merged into the parent buffer once, and is not wrapped in
//! a paragraph if it starts with a block-level element.

use crate::{
    resolver::ArticleResolver,
    title::CanonicalTitle,
    wikicode::Node,
};
use core::fmt::{self, Write as _};
use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;
use serde::{Deserialize, Serialize};
use stack::TagStack;
use std::sync::LazyLock;
pub use template::{OpenTemplates, TemplateContext};

mod fixup;
mod stack;
mod tags;
mod template;
mod text;
#[cfg(test)]
mod tests;

/// A composition error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write to a buffer failed.
    #[error("fmt error: {0}")]
    Fmt(#[from] fmt::Error),

    /// The configured link trail pattern is not a valid regular expression.
    #[error("invalid link trail pattern: {0}")]
    LinkTrail(#[from] regex::Error),

    /// A template called back into itself.
    ///
    /// This error is only used to unwind the recursion. It is caught by
    /// [`Composer::compose`] and never returned to callers.
    #[error("template loop detected: {0}")]
    TemplateLoop(CanonicalTitle),

    /// The node tree contained a node kind which cannot be composed.
    #[error("unknown node kind")]
    UnknownNodeKind,
}

/// The standard result type used by all fallible composer functions.
pub type Result<T = (), E = Error> = core::result::Result<T, E>;

/// The link trail used when none is configured: lower-case English letters.
const DEFAULT_LINK_TRAIL: &str = "^[a-z]+";

/// The compiled default link trail.
static DEFAULT_LINK_TRAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_LINK_TRAIL).unwrap());

/// Composer configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Options {
    /// If true, links to missing articles and calls to missing templates are
    /// rendered as links to the page editor.
    pub red_links: bool,
    /// If false, template and argument expressions are emitted as source text
    /// instead of being expanded.
    pub expand_templates: bool,
    /// If true, the `subst:` prefix is removed from template names. Otherwise
    /// `subst:` expressions are emitted as source text. The `safesubst:`
    /// prefix is always removed.
    pub strip_subst: bool,
    /// A regular expression matching the text after an internal link which is
    /// absorbed into the link text. It must match at the start of the text.
    pub link_trail: String,
}

impl Options {
    /// Sets [`Options::red_links`].
    #[must_use]
    pub fn with_red_links(mut self, red_links: bool) -> Self {
        self.red_links = red_links;
        self
    }

    /// Sets [`Options::expand_templates`].
    #[must_use]
    pub fn with_expand_templates(mut self, expand_templates: bool) -> Self {
        self.expand_templates = expand_templates;
        self
    }

    /// Sets [`Options::strip_subst`].
    #[must_use]
    pub fn with_strip_subst(mut self, strip_subst: bool) -> Self {
        self.strip_subst = strip_subst;
        self
    }

    /// Sets [`Options::link_trail`].
    #[must_use]
    pub fn with_link_trail(mut self, link_trail: impl Into<String>) -> Self {
        self.link_trail = link_trail.into();
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            red_links: false,
            expand_templates: true,
            strip_subst: false,
            link_trail: DEFAULT_LINK_TRAIL.to_string(),
        }
    }
}

/// A Wikitext to HTML composer.
#[derive(Debug)]
pub struct Composer<'r> {
    /// The article resolver.
    resolver: &'r ArticleResolver,
    /// The configuration.
    options: Options,
    /// The compiled [`Options::link_trail`].
    link_trail: Regex,
    /// The template parameters visible to the root document.
    context: TemplateContext,
    /// The templates which are already being expanded.
    open_templates: OpenTemplates,
}

impl<'r> Composer<'r> {
    /// Creates a new composer with the default options.
    pub fn new(resolver: &'r ArticleResolver) -> Self {
        Self {
            resolver,
            options: Options::default(),
            link_trail: DEFAULT_LINK_TRAIL_RE.clone(),
            context: TemplateContext::default(),
            open_templates: OpenTemplates::default(),
        }
    }

    /// Creates a new composer with the given options.
    pub fn with_options(resolver: &'r ArticleResolver, options: Options) -> Result<Self> {
        let link_trail = Regex::new(&options.link_trail)?;
        Ok(Self {
            resolver,
            options,
            link_trail,
            context: TemplateContext::default(),
            open_templates: OpenTemplates::default(),
        })
    }

    /// Composes the document as-if it were the body of a template called with
    /// the given parameters.
    #[must_use]
    pub fn with_context(mut self, context: TemplateContext) -> Self {
        self.context = context;
        self
    }

    /// Composes the document as-if the given templates were already being
    /// expanded.
    #[must_use]
    pub fn with_open_templates(mut self, open_templates: OpenTemplates) -> Self {
        self.open_templates = open_templates;
        self
    }

    /// The configuration.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Composes a node tree into HTML.
    ///
    /// Every tag which is opened is closed. A template loop does not fail: the
    /// output is replaced by an error message naming the template.
    pub fn compose(&mut self, node: &Node) -> Result<String> {
        let env = Env {
            resolver: self.resolver,
            options: &self.options,
            link_trail: &self.link_trail,
        };
        let mut frame = Frame::new(&env, &self.context, &mut self.open_templates);
        match frame.visit(node, true, false).and_then(|()| frame.finish()) {
            Err(Error::TemplateLoop(title)) => {
                log::warn!("template loop detected: {title}");
                loop_error(self.resolver, &title)
            }
            result => result,
        }
    }
}

/// Composes a node tree into HTML with a default resolver and options.
pub fn compose(node: &Node) -> Result<String> {
    let resolver = ArticleResolver::default();
    Composer::new(&resolver).compose(node)
}

/// Renders the message used in place of a document containing a template
/// loop.
fn loop_error(resolver: &ArticleResolver, title: &CanonicalTitle) -> Result<String> {
    let full_title = title.full_title();
    let mut out = String::new();
    write!(
        out,
        r#"<p><span class="error">Template loop detected: <a href="{}" title="{}">{}</a></span></p>"#,
        encode_double_quoted_attribute(&resolver.get_article_url(title)),
        encode_double_quoted_attribute(&full_title),
        encode_text(&full_title)
    )?;
    Ok(out)
}

/// Read-only state shared by every frame of one [`Composer::compose`] call.
struct Env<'a> {
    /// The article resolver.
    resolver: &'a ArticleResolver,
    /// The configuration.
    options: &'a Options,
    /// The compiled link trail.
    link_trail: &'a Regex,
}

/// A composer frame: one output buffer and tag stack.
///
/// A new frame is created for each template body, argument default, and for
/// each piece of a node (like a link target or template name) which has to be
/// composed separately.
struct Frame<'a> {
    /// Shared state.
    env: &'a Env<'a>,
    /// The parameters of the template call being expanded.
    context: &'a TemplateContext,
    /// The templates being expanded on the current call stack.
    open_templates: &'a mut OpenTemplates,
    /// The output buffer.
    out: String,
    /// The open tags and pending list markers.
    stack: TagStack,
}

impl<'a> Frame<'a> {
    /// Creates a new frame.
    fn new(
        env: &'a Env<'a>,
        context: &'a TemplateContext,
        open_templates: &'a mut OpenTemplates,
    ) -> Self {
        Self {
            env,
            context,
            open_templates,
            out: String::new(),
            stack: TagStack::default(),
        }
    }

    /// Closes any open tags and returns the output.
    fn finish(mut self) -> Result<String> {
        self.stack.close_all(&mut self.out)?;
        Ok(self.out)
    }

    /// Composes a node.
    ///
    /// `in_root` is true if the node is a direct child of the document being
    /// composed. `raw` is true if text should be emitted without escaping or
    /// whitespace processing.
    fn visit(&mut self, node: &Node, in_root: bool, raw: bool) -> Result {
        match node {
            Node::Document { children } => self.visit_all(children, in_root, raw),
            Node::Tag(tag) => self.visit_tag(tag, in_root, raw),
            Node::Heading { level, title } => self.visit_heading(*level, title, in_root, raw),
            Node::Wikilink(link) => self.visit_wikilink(link, in_root, raw),
            Node::ExternalLink(link) => self.visit_external_link(link, in_root, raw),
            Node::Comment { .. } => Ok(()),
            Node::Text { value } => self.visit_text(value, in_root, raw),
            Node::Template(template) => self.visit_template(node, template, in_root, raw),
            Node::Argument(argument) => self.visit_argument(node, argument, in_root, raw),
            Node::HtmlEntity { value } => {
                self.stack.flush(&mut self.out, in_root)?;
                write!(self.out, "&{value};")?;
                Ok(())
            }
            Node::Attribute(attribute) => self.visit_attribute(attribute),
            Node::Unknown => Err(Error::UnknownNodeKind),
        }
    }

    /// Composes a sequence of sibling nodes.
    fn visit_all(&mut self, nodes: &[Node], in_root: bool, raw: bool) -> Result {
        for node in fixup::fix(nodes, self.env.link_trail) {
            self.visit(&node, in_root, raw)?;
        }
        Ok(())
    }

    /// Composes nodes in a new frame with the same template context, and
    /// returns the output.
    fn render(&mut self, nodes: &[Node], raw: bool) -> Result<String> {
        let context = self.context;
        self.render_in(nodes, context, raw)
    }

    /// Composes nodes in a new frame with the given template context, and
    /// returns the output.
    fn render_in(&mut self, nodes: &[Node], context: &TemplateContext, raw: bool) -> Result<String> {
        let mut frame = Frame::new(self.env, context, &mut *self.open_templates);
        frame.visit_all(nodes, false, raw)?;
        frame.finish()
    }

    /// Writes the Wikitext source of a node as text.
    fn write_literal(&mut self, node: &Node, in_root: bool, raw: bool) -> Result {
        self.stack.flush(&mut self.out, in_root)?;
        let source = node.to_string();
        self.write_text(&source, raw);
        Ok(())
    }

    /// Writes text, escaping it unless `raw` is true.
    fn write_text(&mut self, text: &str, raw: bool) {
        if raw {
            self.out += text;
        } else {
            self.out += &encode_text(text);
        }
    }

    /// Writes HTML which was produced by a nested frame or a built-in.
    fn write_expansion(&mut self, html: &str, in_root: bool) -> Result {
        if stack::starts_with_block(html) {
            self.stack.open_block(&mut self.out, in_root)?;
        } else if !html.trim().is_empty() {
            self.stack.flush(&mut self.out, in_root)?;
        }
        self.out += html;
        Ok(())
    }
}
