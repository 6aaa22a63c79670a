//! Utilities for building node trees by hand.

use super::{Argument, Attribute, ExternalLink, Node, Parameter, Tag, Template, Wikilink};

/// Values which can stand in for a node list.
pub trait IntoNodes {
    /// Converts the value into a node list.
    fn into_nodes(self) -> Vec<Node>;
}

impl IntoNodes for &str {
    fn into_nodes(self) -> Vec<Node> {
        vec![text(self)]
    }
}

impl IntoNodes for String {
    fn into_nodes(self) -> Vec<Node> {
        vec![Node::Text { value: self }]
    }
}

impl IntoNodes for Node {
    fn into_nodes(self) -> Vec<Node> {
        vec![self]
    }
}

impl IntoNodes for Vec<Node> {
    fn into_nodes(self) -> Vec<Node> {
        self
    }
}

impl<const N: usize> IntoNodes for [Node; N] {
    fn into_nodes(self) -> Vec<Node> {
        self.into()
    }
}

/// Builds a [`Node::Document`].
pub fn document(children: impl IntoIterator<Item = Node>) -> Node {
    Node::Document {
        children: children.into_iter().collect(),
    }
}

/// Builds a [`Node::Text`].
pub fn text(value: impl Into<String>) -> Node {
    Node::Text {
        value: value.into(),
    }
}

/// Builds a [`Node::Comment`].
pub fn comment(contents: impl Into<String>) -> Node {
    Node::Comment {
        contents: contents.into(),
    }
}

/// Builds a [`Node::HtmlEntity`] from the entity body, e.g. `"amp"`.
pub fn entity(value: impl Into<String>) -> Node {
    Node::HtmlEntity {
        value: value.into(),
    }
}

/// Builds a [`Node::Heading`].
pub fn heading(level: u8, title: impl IntoNodes) -> Node {
    Node::Heading {
        level,
        title: title.into_nodes(),
    }
}

/// Builds a [`Node::Wikilink`] with plain text content.
pub fn wikilink(title: impl IntoNodes, text: Option<&str>) -> Node {
    wikilink_nodes(title, text.map(IntoNodes::into_nodes))
}

/// Builds a [`Node::Wikilink`].
pub fn wikilink_nodes(title: impl IntoNodes, text: Option<Vec<Node>>) -> Node {
    Node::Wikilink(Wikilink {
        title: title.into_nodes(),
        text,
        trail: None,
    })
}

/// Builds a [`Node::ExternalLink`].
pub fn external_link(url: impl IntoNodes, title: Option<&str>, brackets: bool) -> Node {
    Node::ExternalLink(ExternalLink {
        url: url.into_nodes(),
        title: title.map(IntoNodes::into_nodes),
        brackets,
    })
}

/// Builds a [`Node::Template`].
pub fn template(name: impl IntoNodes, params: impl IntoIterator<Item = Parameter>) -> Node {
    Node::Template(Template {
        name: name.into_nodes(),
        params: params.into_iter().collect(),
    })
}

/// Builds a positional [`Parameter`].
pub fn positional(value: impl IntoNodes) -> Parameter {
    Parameter {
        name: None,
        value: value.into_nodes(),
    }
}

/// Builds a named [`Parameter`].
pub fn named(name: impl IntoNodes, value: impl IntoNodes) -> Parameter {
    Parameter {
        name: Some(name.into_nodes()),
        value: value.into_nodes(),
    }
}

/// Builds a [`Node::Argument`].
pub fn argument(name: impl IntoNodes, default: Option<Vec<Node>>) -> Node {
    Node::Argument(Argument {
        name: name.into_nodes(),
        default,
    })
}

/// Builds an [`Attribute`].
pub fn attribute(name: &str, value: Option<&str>) -> Attribute {
    Attribute {
        name: name.into_nodes(),
        value: value.map(IntoNodes::into_nodes),
    }
}

/// Builds an HTML [`Node::Tag`].
pub fn tag(name: &str, attributes: Vec<Attribute>, contents: Vec<Node>) -> Node {
    Node::Tag(Tag {
        name: name.into_nodes(),
        attributes,
        contents,
        self_closing: false,
        wiki_markup: None,
    })
}

/// Builds a self-closing HTML [`Node::Tag`].
pub fn void_tag(name: &str, attributes: Vec<Attribute>) -> Node {
    Node::Tag(Tag {
        name: name.into_nodes(),
        attributes,
        contents: vec![],
        self_closing: true,
        wiki_markup: None,
    })
}

/// Builds a [`Node::Tag`] which was written as Wikitext markup.
pub fn wiki_tag(name: &str, markup: &str, attributes: Vec<Attribute>, contents: Vec<Node>) -> Node {
    Node::Tag(Tag {
        name: name.into_nodes(),
        attributes,
        contents,
        self_closing: false,
        wiki_markup: Some(markup.into()),
    })
}

/// Builds a list item marker: one of `*`, `#`, `;`, or `:`.
pub fn list_item(marker: &str) -> Node {
    let name = if marker == ";" {
        "dt"
    } else if marker == ":" {
        "dd"
    } else {
        "li"
    };
    wiki_tag(name, marker, vec![], vec![])
}

/// Builds a bold (`'''`) or italic (`''`) text style.
pub fn style(markup: &str, contents: Vec<Node>) -> Node {
    let name = if markup == "'''" { "b" } else { "i" };
    wiki_tag(name, markup, vec![], contents)
}

/// Builds a Wikitext table (`{| ... |}`).
pub fn table(attributes: Vec<Attribute>, contents: Vec<Node>) -> Node {
    wiki_tag("table", "{|", attributes, contents)
}

/// Builds a Wikitext table row (`|-`).
pub fn row(contents: Vec<Node>) -> Node {
    wiki_tag("tr", "|-", vec![], contents)
}

/// Builds a Wikitext table data cell (`|`).
pub fn cell(contents: Vec<Node>) -> Node {
    wiki_tag("td", "|", vec![], contents)
}

/// Builds a Wikitext table heading cell (`!`).
pub fn header_cell(contents: Vec<Node>) -> Node {
    wiki_tag("th", "!", vec![], contents)
}
