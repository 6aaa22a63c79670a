//! Article lookup, title canonicalisation, and URL building.

use crate::{
    magic_words::MagicWordRegistry,
    modules::{ModuleInvoker, ModuleStore},
    parser_fns::ParserFunctionRegistry,
    title::{self, CanonicalTitle, encode_path, encode_query},
    wikicode::Node,
};
use indexmap::IndexMap;
use std::{collections::HashMap, fmt};
use unicase::UniCase;

/// The name of the namespace that template names are resolved in by default.
pub const TEMPLATE_NAMESPACE: &str = "Template";

/// An article could not be found. Carries the canonical title that was
/// looked up.
#[derive(Debug, thiserror::Error)]
#[error("article '{0}' not found")]
pub struct ArticleNotFound(pub CanonicalTitle);

/// A map of article titles to article bodies.
///
/// Titles are stored without their namespace prefix. Keys are normalised on
/// both insert and lookup: whitespace and underscores are collapsed and the
/// first character is made upper-case.
#[derive(Clone, Debug, Default)]
pub struct Namespace {
    /// Articles, by normalised title.
    articles: HashMap<String, Node>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an article, returning the previous body.
    pub fn insert(&mut self, title: &str, body: Node) -> Option<Node> {
        self.articles.insert(title::normalize_key(title), body)
    }

    /// Returns the body of the article with the given title.
    pub fn get(&self, title: &str) -> Option<&Node> {
        self.articles.get(&title::normalize_key(title))
    }

    /// The number of articles in the namespace.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Returns true if the namespace has no articles.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}

impl<K: AsRef<str>> FromIterator<(K, Node)> for Namespace {
    fn from_iter<T: IntoIterator<Item = (K, Node)>>(iter: T) -> Self {
        let mut namespace = Self::new();
        for (title, body) in iter {
            namespace.insert(title.as_ref(), body);
        }
        namespace
    }
}

/// The per-render configuration used to look up articles and built-ins.
///
/// A resolver is built once, extended as needed, and then only read while
/// composing.
pub struct ArticleResolver {
    /// The URL which article paths are appended to, without a trailing slash.
    base_url: String,
    /// The URL of the page editor.
    edit_url: String,
    /// Namespaces, keyed by display name.
    namespaces: IndexMap<String, Namespace>,
    /// Magic words.
    magic_words: MagicWordRegistry,
    /// Parser functions.
    parser_functions: ParserFunctionRegistry,
    /// Script modules.
    modules: Box<dyn ModuleInvoker + Send + Sync>,
}

impl ArticleResolver {
    /// Creates a new resolver with no namespaces and the built-in magic
    /// words, parser functions, and modules.
    pub fn new(base_url: &str, edit_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            edit_url: edit_url.to_string(),
            namespaces: IndexMap::new(),
            magic_words: MagicWordRegistry::default(),
            parser_functions: ParserFunctionRegistry::default(),
            modules: Box::new(ModuleStore::default()),
        }
    }

    /// Replaces the magic word registry.
    #[must_use]
    pub fn with_magic_words(mut self, magic_words: MagicWordRegistry) -> Self {
        self.magic_words = magic_words;
        self
    }

    /// Replaces the parser function registry.
    #[must_use]
    pub fn with_parser_functions(mut self, parser_functions: ParserFunctionRegistry) -> Self {
        self.parser_functions = parser_functions;
        self
    }

    /// Replaces the module invoker.
    #[must_use]
    pub fn with_modules(mut self, modules: impl ModuleInvoker + Send + Sync + 'static) -> Self {
        self.modules = Box::new(modules);
        self
    }

    /// Adds a namespace. The name is used as the display name of the
    /// namespace. A namespace with the same case-insensitive name is
    /// replaced.
    pub fn add_namespace(&mut self, name: &str, namespace: Namespace) {
        let name = title::normalize(name).into_owned();
        self.namespaces
            .retain(|existing, _| UniCase::new(existing.as_str()) != UniCase::new(name.as_str()));
        self.namespaces.insert(name, namespace);
    }

    /// Returns the namespace with the given case-insensitive name.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.find_namespace(name).map(|(_, namespace)| namespace)
    }

    /// Returns the namespace with the given case-insensitive name.
    pub fn namespace_mut(&mut self, name: &str) -> Option<&mut Namespace> {
        let name = UniCase::new(name);
        self.namespaces
            .iter_mut()
            .find(|(existing, _)| UniCase::new(existing.as_str()) == name)
            .map(|(_, namespace)| namespace)
    }

    /// Generates the canonical form of a title.
    ///
    /// See <https://en.wikipedia.org/wiki/Help:Link#Conversion_to_canonical_form>.
    pub fn canonicalize_title(&self, title: &str, default_namespace: &str) -> CanonicalTitle {
        title::canonicalize(title, default_namespace, |name| {
            self.find_namespace(name).map(|(name, _)| name)
        })
    }

    /// Gets the body of the article with the given name.
    pub fn get_article(
        &self,
        name: &str,
        default_namespace: &str,
    ) -> Result<&Node, ArticleNotFound> {
        self.get_canonical_article(&self.canonicalize_title(name, default_namespace))
    }

    /// Gets the body of the article with the given canonical title.
    pub fn get_canonical_article(&self, title: &CanonicalTitle) -> Result<&Node, ArticleNotFound> {
        self.namespaces
            .get(&title.namespace)
            .and_then(|namespace| namespace.get(&title.title))
            .ok_or_else(|| ArticleNotFound(title.clone()))
    }

    /// Returns true if the article with the given canonical title exists.
    pub fn article_exists(&self, title: &CanonicalTitle) -> bool {
        self.namespaces
            .get(&title.namespace)
            .is_some_and(|namespace| namespace.get(&title.title).is_some())
    }

    /// The URL of an article.
    ///
    /// Interwiki prefixes are not resolved; the URL always points to the local
    /// wiki.
    pub fn get_article_url(&self, title: &CanonicalTitle) -> String {
        format!("{}/{}", self.base_url, encode_path(&title.link()))
    }

    /// The HTML-escaped URL of the page editor for an article.
    pub fn get_edit_url(&self, title: &CanonicalTitle) -> String {
        format!(
            "{}?title={}&amp;action=edit&amp;redlink=1",
            self.edit_url,
            encode_query(&title.link())
        )
    }

    /// The magic word registry.
    pub fn magic_words(&self) -> &MagicWordRegistry {
        &self.magic_words
    }

    /// The magic word registry, for adding magic words.
    pub fn magic_words_mut(&mut self) -> &mut MagicWordRegistry {
        &mut self.magic_words
    }

    /// The parser function registry.
    pub fn parser_functions(&self) -> &ParserFunctionRegistry {
        &self.parser_functions
    }

    /// The parser function registry, for adding parser functions.
    pub fn parser_functions_mut(&mut self) -> &mut ParserFunctionRegistry {
        &mut self.parser_functions
    }

    /// The module invoker.
    pub fn modules(&self) -> &dyn ModuleInvoker {
        &*self.modules
    }

    /// Finds a namespace by its case-insensitive name.
    fn find_namespace(&self, name: &str) -> Option<(&str, &Namespace)> {
        let name = UniCase::new(name);
        self.namespaces
            .iter()
            .find(|(existing, _)| UniCase::new(existing.as_str()) == name)
            .map(|(existing, namespace)| (existing.as_str(), namespace))
    }
}

impl Default for ArticleResolver {
    fn default() -> Self {
        Self::new("/wiki/", "/index.php")
    }
}

impl fmt::Debug for ArticleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleResolver")
            .field("base_url", &self.base_url)
            .field("edit_url", &self.edit_url)
            .field("namespaces", &self.namespaces)
            .field("magic_words", &self.magic_words)
            .field("parser_functions", &self.parser_functions)
            .finish_non_exhaustive()
    }
}
