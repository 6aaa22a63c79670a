//! Composes parsed Wikitext node trees into HTML.
//!
//! The input is a tree of [`Node`]s produced by an external Wikitext parser.
//! The [`Composer`] walks the tree and emits HTML the way MediaWiki does for
//! paragraphs, lists, tables, preformatted text, and links, and expands
//! templates by looking up article bodies in an [`ArticleResolver`].
//!
//! ```
//! use wiki_composer::{
//!     ArticleResolver, Composer,
//!     wikicode::builder::{document, template, text},
//! };
//!
//! let mut resolver = ArticleResolver::new("/wiki", "/index.php");
//! resolver.add_namespace(
//!     "Template",
//!     [("Greeting", document([text("Hello!")]))].into_iter().collect(),
//! );
//!
//! let html = Composer::new(&resolver)
//!     .compose(&document([template("greeting", [])]))
//!     .unwrap();
//! assert_eq!(html, "<p>Hello!</p>");
//! ```

pub mod composer;
pub mod magic_words;
pub mod modules;
pub mod parser_fns;
pub mod resolver;
pub mod title;
pub mod wikicode;

pub use composer::{Composer, Error, Options, Result, compose};
pub use resolver::{ArticleNotFound, ArticleResolver, Namespace};
pub use title::CanonicalTitle;
pub use wikicode::Node;
