//! Template transclusion, magic words, parser functions, module invocation,
//! and template arguments.

use super::{Error, Frame, Result};
use crate::{
    modules::ModuleArgs,
    parser_fns::{self, Expander},
    resolver::{ArticleNotFound, TEMPLATE_NAMESPACE},
    title::CanonicalTitle,
    wikicode::{Argument, Node, Parameter, Template},
};
use indexmap::IndexMap;
use std::collections::HashSet;

/// The parameters of a template call, by name. Positional parameters are keyed
/// by their 1-based position.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TemplateContext(IndexMap<String, String>);

impl TemplateContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rendered value of the parameter with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Sets the value of a parameter, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// The number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in call order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for TemplateContext {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for TemplateContext {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The set of templates which are being expanded on the current call stack.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OpenTemplates(HashSet<CanonicalTitle>);

impl OpenTemplates {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the template with the given title is being expanded.
    pub fn contains(&self, title: &CanonicalTitle) -> bool {
        self.0.contains(title)
    }

    /// Marks the template with the given title as being expanded. Returns
    /// false if it already was.
    pub fn insert(&mut self, title: CanonicalTitle) -> bool {
        self.0.insert(title)
    }

    /// Marks the template with the given title as no longer being expanded.
    pub fn remove(&mut self, title: &CanonicalTitle) -> bool {
        self.0.remove(title)
    }

    /// The number of templates being expanded.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no templates are being expanded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CanonicalTitle> for OpenTemplates {
    fn from_iter<T: IntoIterator<Item = CanonicalTitle>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Strips an ASCII case-insensitive prefix.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &text[prefix.len()..])
}

impl Frame<'_> {
    /// Composes a template expression.
    pub(super) fn visit_template(
        &mut self,
        node: &Node,
        template: &Template,
        in_root: bool,
        raw: bool,
    ) -> Result {
        if !self.env.options.expand_templates {
            return self.write_literal(node, in_root, raw);
        }

        let name = self.render(&template.name, true)?;
        let mut name = name.trim();
        if let Some(rest) = strip_prefix_ignore_case(name, "subst:") {
            if !self.env.options.strip_subst {
                return self.write_literal(node, in_root, raw);
            }
            name = rest.trim_start();
        } else if let Some(rest) = strip_prefix_ignore_case(name, "safesubst:") {
            name = rest.trim_start();
        }

        let resolver = self.env.resolver;
        let title = resolver.canonicalize_title(name, TEMPLATE_NAMESPACE);
        let magic_words = resolver.magic_words();
        if magic_words.contains(&title.title) {
            return match magic_words.call(&title.title) {
                Ok(html) => self.write_expansion(&html, in_root),
                Err(err) => {
                    log::debug!("{err}");
                    self.write_literal(node, in_root, raw)
                }
            };
        }

        if name.starts_with('#') {
            let (function, argument) = name.split_once(':').unwrap_or((name, ""));
            return if function.trim().eq_ignore_ascii_case("#invoke") {
                self.invoke_module(node, template, argument, in_root, raw)
            } else {
                self.call_parser_function(node, template, function, argument, in_root, raw)
            };
        }

        self.transclude(node, template, title, in_root, raw)
    }

    /// Calls a parser function.
    fn call_parser_function(
        &mut self,
        node: &Node,
        template: &Template,
        function: &str,
        argument: &str,
        in_root: bool,
        raw: bool,
    ) -> Result {
        let functions = self.env.resolver.parser_functions();
        let context = self.context;
        let mut compose = |nodes: &[Node], raw: bool| self.render(nodes, raw);
        let result = functions.call(
            function,
            argument,
            &template.params,
            &mut Expander::new(context, &mut compose),
        );
        match result {
            Ok(html) => self.write_expansion(&html, in_root),
            Err(parser_fns::Error::Compose(err)) => Err(err),
            Err(err @ parser_fns::Error::NotFound(_)) => {
                log::debug!("{err}");
                self.write_literal(node, in_root, raw)
            }
        }
    }

    /// Calls a module function with `{{#invoke:module|function|args...}}`.
    fn invoke_module(
        &mut self,
        node: &Node,
        template: &Template,
        module: &str,
        in_root: bool,
        raw: bool,
    ) -> Result {
        let mut params = self.render_params(&template.params)?.0;
        let Some((_, function)) = params.shift_remove_index(0) else {
            log::debug!("#invoke:{module} without a function name");
            return self.write_literal(node, in_root, raw);
        };

        let function = function.trim();
        let module = module.trim();
        match self.env.resolver.modules().resolve(module, function) {
            Ok(f) => {
                // Positional arguments are numbered from after the function
                // name.
                let args = params
                    .into_iter()
                    .map(|(key, value)| match key.parse::<i64>() {
                        Ok(index) => ((index - 1).to_string(), value),
                        Err(_) => (key, value),
                    })
                    .collect::<ModuleArgs>();
                log::trace!("#invoke:{module}|{function}");
                let html = f(&args);
                self.write_expansion(&html, in_root)
            }
            Err(err) => {
                log::warn!("{err}");
                self.write_literal(node, in_root, raw)
            }
        }
    }

    /// Transcludes an article.
    fn transclude(
        &mut self,
        node: &Node,
        template: &Template,
        title: CanonicalTitle,
        in_root: bool,
        raw: bool,
    ) -> Result {
        let body = match self.env.resolver.get_canonical_article(&title) {
            Ok(body) => body,
            Err(ArticleNotFound(title)) => {
                log::debug!("template '{title}' not found");
                return if self.env.options.red_links {
                    self.write_link(&title, &title.full_title(), in_root)
                } else {
                    self.write_literal(node, in_root, raw)
                };
            }
        };

        let context = self.render_params(&template.params)?;

        if !self.open_templates.insert(title.clone()) {
            return Err(Error::TemplateLoop(title));
        }

        log::trace!("expanding {title}");
        let html = {
            let mut open_templates = scopeguard::guard(&mut *self.open_templates, |open| {
                open.remove(&title);
            });
            let mut frame = Frame::new(self.env, &context, &mut **open_templates);
            frame.visit(body, false, raw)?;
            frame.finish()?
        };

        self.write_expansion(&html, in_root)
    }

    /// Renders the parameters of a template call in the context of the caller.
    ///
    /// Named parameter values are trimmed. Positional parameters are numbered
    /// from 1 and are not trimmed. Later parameters replace earlier ones with
    /// the same name.
    fn render_params(&mut self, params: &[Parameter]) -> Result<TemplateContext> {
        let mut context = TemplateContext::new();
        let mut position = 0_usize;
        for param in params {
            let value = self.render(&param.value, false)?;
            if let Some(name) = &param.name {
                let name = self.render(name, true)?;
                context.insert(name.trim(), value.trim());
            } else {
                position += 1;
                context.insert(position.to_string(), value);
            }
        }
        Ok(context)
    }

    /// Composes a template argument.
    pub(super) fn visit_argument(
        &mut self,
        node: &Node,
        argument: &Argument,
        in_root: bool,
        raw: bool,
    ) -> Result {
        if !self.env.options.expand_templates {
            return self.write_literal(node, in_root, raw);
        }

        let name = self.render(&argument.name, true)?;
        let context = self.context;
        if let Some(value) = context.get(name.trim()) {
            self.write_expansion(value, in_root)
        } else if let Some(default) = &argument.default {
            // Defaults cannot see the parameters of the template call.
            let html = self.render_in(default, &TemplateContext::new(), raw)?;
            self.write_expansion(&html, in_root)
        } else {
            self.write_literal(node, in_root, raw)
        }
    }
}
