//! Parser functions: argument-taking, template-like keywords identified by a
//! `#`-prefixed name, e.g. `{{#if: test | then | else}}`.
//!
//! A parser function receives the text after the first colon of the template
//! name (already composed), the raw parameter nodes, and an [`Expander`]
//! which composes parameter nodes in the frame of the caller. Only the
//! parameters a function actually needs are composed, so a branch which is not
//! taken never transcludes anything.

use crate::{
    composer::{self, TemplateContext},
    wikicode::{Node, Parameter},
};
use core::fmt::Write as _;
use html_escape::encode_double_quoted_attribute;
use std::{collections::HashMap, fmt};

/// A parser function implementation.
pub type ParserFn =
    Box<dyn Fn(&str, &[Parameter], &mut Expander<'_>) -> Result<String, Error> + Send + Sync>;

/// A built-in parser function.
type BuiltinFn = fn(&str, &[Parameter], &mut Expander<'_>) -> Result<String, Error>;

/// The callback used by an [`Expander`] to compose nodes. The flag is true if
/// the nodes should be composed as raw text instead of HTML.
pub type ComposeFn<'a> = dyn FnMut(&[Node], bool) -> composer::Result<String> + 'a;

/// Parser function errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No parser function exists with the given name.
    #[error("unknown parser function '{0}'")]
    NotFound(String),

    /// Composing a parameter failed.
    #[error(transparent)]
    Compose(#[from] composer::Error),
}

/// Composes the parameters of a parser function call in the frame of the
/// caller.
pub struct Expander<'a> {
    /// The template parameters visible to the caller.
    context: &'a TemplateContext,
    /// The composer callback.
    compose: &'a mut ComposeFn<'a>,
}

impl<'a> Expander<'a> {
    /// Creates a new expander.
    pub fn new(context: &'a TemplateContext, compose: &'a mut ComposeFn<'a>) -> Self {
        Self { context, compose }
    }

    /// The template parameters visible to the caller.
    pub fn context(&self) -> &TemplateContext {
        self.context
    }

    /// Composes nodes to HTML.
    pub fn expand(&mut self, nodes: &[Node]) -> Result<String, Error> {
        Ok((self.compose)(nodes, false)?)
    }

    /// Composes nodes to unescaped text, for use as a name or comparison
    /// value.
    pub fn expand_text(&mut self, nodes: &[Node]) -> Result<String, Error> {
        Ok((self.compose)(nodes, true)?)
    }
}

/// The name → implementation map of parser functions.
pub struct ParserFunctionRegistry {
    /// Registered functions, keyed by lower-case name.
    functions: HashMap<String, ParserFn>,
}

impl ParserFunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Creates a registry containing the built-in parser functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, f) in BUILTINS.entries() {
            registry.insert(*name, *f);
        }
        registry
    }

    /// Adds or replaces a parser function. The name includes the leading `#`
    /// and is case-insensitive.
    pub fn insert<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&str, &[Parameter], &mut Expander<'_>) -> Result<String, Error>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.trim().to_lowercase(), Box::new(f));
    }

    /// Returns true if a parser function with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.trim().to_lowercase())
    }

    /// Calls the parser function with the given name.
    pub fn call(
        &self,
        name: &str,
        argument: &str,
        params: &[Parameter],
        expander: &mut Expander<'_>,
    ) -> Result<String, Error> {
        let f = self
            .functions
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        f(argument, params, expander)
    }
}

impl Default for ParserFunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ParserFunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

/// Built-in parser functions.
static BUILTINS: phf::Map<&'static str, BuiltinFn> = phf::phf_map! {
    "#if" => if_,
    "#ifeq" => if_eq,
    "#switch" => switch,
    "#tag" => tag,
};

/// `{{#if: test | then | else }}`
fn if_(argument: &str, params: &[Parameter], expander: &mut Expander<'_>) -> Result<String, Error> {
    let index = usize::from(argument.trim().is_empty());
    nth(params, index, expander)
}

/// `{{#ifeq: lhs | rhs | then | else }}`
fn if_eq(
    argument: &str,
    params: &[Parameter],
    expander: &mut Expander<'_>,
) -> Result<String, Error> {
    let rhs = match params.first() {
        Some(param) => expander.expand_text(&param.value)?,
        None => String::new(),
    };
    let index = if fuzzy_eq(argument.trim(), rhs.trim()) { 1 } else { 2 };
    nth(params, index, expander)
}

/// `{{#switch: value | case = result | case | case = result | #default = result }}`
///
/// Cases without a result fall through to the next case with one. A trailing
/// case without a result is the default.
fn switch(
    argument: &str,
    params: &[Parameter],
    expander: &mut Expander<'_>,
) -> Result<String, Error> {
    let value = argument.trim();
    let mut matched = false;
    let mut default = None;
    for (index, param) in params.iter().enumerate() {
        if let Some(name) = &param.name {
            let name = expander.expand_text(name)?;
            let name = name.trim();
            if matched || fuzzy_eq(name, value) {
                return expand_trimmed(expander, &param.value);
            } else if name == "#default" {
                default = Some(&param.value);
            }
        } else {
            let case = expander.expand_text(&param.value)?;
            if fuzzy_eq(case.trim(), value) {
                matched = true;
            } else if index == params.len() - 1 {
                return expand_trimmed(expander, &param.value);
            }
        }
    }

    match default {
        Some(value) => expand_trimmed(expander, value),
        None => Ok(String::new()),
    }
}

/// `{{#tag: name | content | attribute = value ... }}`
fn tag(argument: &str, params: &[Parameter], expander: &mut Expander<'_>) -> Result<String, Error> {
    let name = argument.trim();
    if name.is_empty() {
        return Ok(String::new());
    }

    let mut attributes = String::new();
    let mut content = None;
    for param in params {
        if let Some(key) = &param.name {
            let key = expander.expand_text(key)?;
            let value = expander.expand_text(&param.value)?;
            write!(
                attributes,
                " {}=\"{}\"",
                key.trim(),
                encode_double_quoted_attribute(value.trim())
            )
            .map_err(composer::Error::from)?;
        } else if content.is_none() {
            content = Some(expander.expand(&param.value)?);
        }
    }

    Ok(match content {
        Some(content) => format!("<{name}{attributes}>{content}</{name}>"),
        None => format!("<{name}{attributes} />"),
    })
}

/// Composes and trims the parameter at `index`, or returns an empty string if
/// there is no such parameter.
fn nth(params: &[Parameter], index: usize, expander: &mut Expander<'_>) -> Result<String, Error> {
    let Some(param) = params.get(index) else {
        return Ok(String::new());
    };

    let mut out = String::new();
    if let Some(name) = &param.name {
        out += &expander.expand(name)?;
        out.push('=');
    }
    out += &expander.expand(&param.value)?;
    Ok(out.trim().to_string())
}

/// Composes nodes and trims the result.
fn expand_trimmed(expander: &mut Expander<'_>, nodes: &[Node]) -> Result<String, Error> {
    Ok(expander.expand(nodes)?.trim().to_string())
}

/// Compares two values numerically if both are finite numbers, otherwise as
/// strings.
fn fuzzy_eq(lhs: &str, rhs: &str) -> bool {
    match (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        (Ok(l), Ok(r)) if l.is_finite() && r.is_finite() => l == r,
        _ => lhs == rhs,
    }
}
