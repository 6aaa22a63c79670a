//! The parsed Wikitext node tree consumed by the composer.
//!
//! Trees are produced by an external Wikitext parser and are never mutated by
//! the composer. They can be handed over as JSON: every node is an internally
//! tagged object (`{"type": "text", "value": "..."}`).

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod builder;

/// A Wikitext node.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// The root of a document, or an article body.
    Document {
        /// The top-level nodes of the document.
        #[serde(default)]
        children: Vec<Node>,
    },
    /// An HTML tag, or Wikitext markup which is equivalent to an HTML tag.
    Tag(Tag),
    /// A section heading.
    Heading {
        /// The heading outline level, 1 through 6.
        level: u8,
        /// The heading content.
        #[serde(default)]
        title: Vec<Node>,
    },
    /// An internal link.
    Wikilink(Wikilink),
    /// An external link.
    ExternalLink(ExternalLink),
    /// An HTML comment.
    Comment {
        /// The raw contents of the comment.
        contents: String,
    },
    /// A run of plain text.
    Text {
        /// The text.
        value: String,
    },
    /// A template transclusion, magic word, or parser function call.
    Template(Template),
    /// A template argument reference.
    Argument(Argument),
    /// An undecoded HTML entity.
    HtmlEntity {
        /// The entity body, between `&` and `;`.
        value: String,
    },
    /// A tag attribute.
    Attribute(Attribute),
    /// A node kind the producer knows about but this crate does not.
    #[serde(other)]
    Unknown,
}

impl Node {
    /// Returns the plain text value of this node, if it is a text node.
    pub fn as_text(&self) -> Option<&str> {
        if let Node::Text { value } = self {
            Some(value)
        } else {
            None
        }
    }
}

/// An HTML tag.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Tag {
    /// The tag name.
    pub name: Vec<Node>,
    /// The tag attributes.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// The tag content.
    #[serde(default)]
    pub contents: Vec<Node>,
    /// Whether the tag is self-closing (void).
    #[serde(default)]
    pub self_closing: bool,
    /// The Wikitext markup which produced this tag, if it was not written as
    /// HTML. List items (`*`, `#`, `;`, `:`) carry only their marker.
    #[serde(default)]
    pub wiki_markup: Option<String>,
}

impl Tag {
    /// Returns the tag name if it is made of plain text only.
    pub fn plain_name(&self) -> Option<&str> {
        match self.name.as_slice() {
            [node] => node.as_text().map(str::trim),
            _ => None,
        }
    }
}

/// An internal link.
///
/// ```wikitext
/// [[title|text]]trail
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Wikilink {
    /// The target of the link.
    pub title: Vec<Node>,
    /// The text content of the link. If this is `None`, the target title is
    /// used.
    #[serde(default)]
    pub text: Option<Vec<Node>>,
    /// The link trail to be appended to the content.
    #[serde(default)]
    pub trail: Option<String>,
}

/// An external link.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExternalLink {
    /// The link target.
    pub url: Vec<Node>,
    /// The link content.
    #[serde(default)]
    pub title: Option<Vec<Node>>,
    /// Whether the link was written inside brackets.
    #[serde(default)]
    pub brackets: bool,
}

/// A template call.
///
/// ```wikitext
/// {{name|positional|key=value}}
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Template {
    /// The template name.
    pub name: Vec<Node>,
    /// The template parameters, in source order.
    #[serde(default)]
    pub params: Vec<Parameter>,
}

/// A template parameter.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Parameter {
    /// The parameter name. Positional parameters have no name.
    #[serde(default)]
    pub name: Option<Vec<Node>>,
    /// The parameter value.
    #[serde(default)]
    pub value: Vec<Node>,
}

/// A template argument reference.
///
/// ```wikitext
/// {{{name|default}}}
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Argument {
    /// The argument name.
    pub name: Vec<Node>,
    /// The default value.
    #[serde(default)]
    pub default: Option<Vec<Node>>,
}

/// A tag attribute.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Attribute {
    /// The attribute name.
    pub name: Vec<Node>,
    /// The attribute value, excluding any quotes.
    #[serde(default)]
    pub value: Option<Vec<Node>>,
}

/// A [`Display`](fmt::Display) adapter which writes a node list as Wikitext
/// source.
pub struct Source<'a>(pub &'a [Node]);

impl fmt::Display for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.0 {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Document { children } => write!(f, "{}", Source(children)),
            Node::Tag(tag) => write!(f, "{tag}"),
            Node::Heading { level, title } => {
                let marks = "=".repeat(usize::from(*level));
                write!(f, "{marks}{}{marks}", Source(title))
            }
            Node::Wikilink(link) => write!(f, "{link}"),
            Node::ExternalLink(link) => write!(f, "{link}"),
            Node::Comment { contents } => write!(f, "<!--{contents}-->"),
            Node::Text { value } => f.write_str(value),
            Node::Template(template) => write!(f, "{template}"),
            Node::Argument(argument) => write!(f, "{argument}"),
            Node::HtmlEntity { value } => write!(f, "&{value};"),
            Node::Attribute(attribute) => write!(f, "{attribute}"),
            Node::Unknown => Ok(()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Source(&self.name);
        let contents = Source(&self.contents);
        match self.wiki_markup.as_deref() {
            Some(markup @ ("''" | "'''")) => write!(f, "{markup}{contents}{markup}"),
            Some("{|") => {
                f.write_str("{|")?;
                for attribute in &self.attributes {
                    write!(f, "{attribute}")?;
                }
                write!(f, "{contents}\n|}}")
            }
            Some(markup) => {
                f.write_str(markup)?;
                for attribute in &self.attributes {
                    write!(f, "{attribute}")?;
                }
                if !self.attributes.is_empty() {
                    f.write_str(" |")?;
                }
                write!(f, "{contents}")
            }
            None => {
                write!(f, "<{name}")?;
                for attribute in &self.attributes {
                    write!(f, "{attribute}")?;
                }
                if self.self_closing {
                    f.write_str(" />")
                } else {
                    write!(f, ">{contents}</{name}>")
                }
            }
        }
    }
}

impl fmt::Display for Wikilink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}", Source(&self.title))?;
        if let Some(text) = &self.text {
            write!(f, "|{}", Source(text))?;
        }
        f.write_str("]]")?;
        if let Some(trail) = &self.trail {
            f.write_str(trail)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExternalLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = Source(&self.url);
        if self.brackets {
            match &self.title {
                Some(title) => write!(f, "[{url} {}]", Source(title)),
                None => write!(f, "[{url}]"),
            }
        } else {
            write!(f, "{url}")
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}", Source(&self.name))?;
        for param in &self.params {
            write!(f, "|{param}")?;
        }
        f.write_str("}}")
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}=", Source(name))?;
        }
        write!(f, "{}", Source(&self.value))
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{{{}", Source(&self.name))?;
        if let Some(default) = &self.default {
            write!(f, "|{}", Source(default))?;
        }
        f.write_str("}}}")
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " {}", Source(&self.name))?;
        if let Some(value) = &self.value {
            write!(f, "=\"{}\"", Source(value))?;
        }
        Ok(())
    }
}
