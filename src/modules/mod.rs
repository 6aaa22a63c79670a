//! Script modules callable with `{{#invoke:Module|function|...}}`.
//!
//! Modules are opaque to the composer: it only asks a [`ModuleInvoker`] to
//! resolve a module and function name pair to a callable.

use indexmap::IndexMap;
use std::{collections::HashMap, fmt};

mod string;

/// The arguments passed to a module function, in call order. Positional
/// arguments are keyed by their 1-based position.
pub type ModuleArgs = IndexMap<String, String>;

/// A module function.
pub type ModuleFn = dyn Fn(&ModuleArgs) -> String + Send + Sync;

/// Module resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No module exists with the given name.
    #[error("unknown module '{0}'")]
    UnknownModule(String),
    /// The module exists but has no function with the given name.
    #[error("unknown function '{function}' in module '{module}'")]
    UnknownFunction {
        /// The module name.
        module: String,
        /// The function name.
        function: String,
    },
}

/// Resolves `(module, function)` pairs to callables.
pub trait ModuleInvoker {
    /// Finds the function `function` in the module `module`.
    ///
    /// Module names are case-insensitive only in their first character.
    /// Function names are case-sensitive.
    fn resolve(&self, module: &str, function: &str) -> Result<&ModuleFn, Error>;
}

/// A module: function name → implementation.
type Module = HashMap<String, Box<ModuleFn>>;

/// An in-memory [`ModuleInvoker`].
pub struct ModuleStore {
    /// Registered modules, by name.
    modules: HashMap<String, Module>,
}

impl ModuleStore {
    /// Creates an empty module store.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Creates a module store containing the built-in modules.
    pub fn with_builtins() -> Self {
        let mut store = Self::new();
        for (name, f) in string::FUNCTIONS.entries() {
            store.insert("String", name, *f);
        }
        store
    }

    /// Adds or replaces the function `function` in the module `module`.
    pub fn insert<F>(&mut self, module: &str, function: &str, f: F)
    where
        F: Fn(&ModuleArgs) -> String + Send + Sync + 'static,
    {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(function.to_string(), Box::new(f));
    }
}

impl Default for ModuleStore {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ModuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.modules
                    .iter()
                    .map(|(name, module)| (name, module.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}

impl ModuleInvoker for ModuleStore {
    fn resolve(&self, module: &str, function: &str) -> Result<&ModuleFn, Error> {
        let found = first_letter_variants(module).find_map(|name| self.modules.get(&name));
        let Some(found) = found else {
            return Err(Error::UnknownModule(module.to_string()));
        };

        found
            .get(function)
            .map(|f| &**f)
            .ok_or_else(|| Error::UnknownFunction {
                module: module.to_string(),
                function: function.to_string(),
            })
    }
}

/// Yields the name with its first character in lower-case and then in
/// upper-case.
fn first_letter_variants(name: &str) -> impl Iterator<Item = String> + '_ {
    let mut chars = name.chars();
    let first = chars.next();
    let rest = chars.as_str();
    [false, true].into_iter().filter_map(move |upper| {
        let first = first?;
        Some(if upper {
            first.to_uppercase().chain(rest.chars()).collect()
        } else {
            first.to_lowercase().chain(rest.chars()).collect()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> ModuleArgs {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn first_letter_is_case_insensitive() {
        let store = ModuleStore::default();
        let len = store.resolve("string", "len").unwrap();
        assert_eq!(len(&args(&[("1", "abc")])), "3");
        assert!(store.resolve("String", "len").is_ok());
        assert!(matches!(
            store.resolve("STRING", "len"),
            Err(Error::UnknownModule(name)) if name == "STRING"
        ));
    }

    #[test]
    fn function_is_case_sensitive() {
        let store = ModuleStore::default();
        assert!(matches!(
            store.resolve("String", "Len"),
            Err(Error::UnknownFunction { function, .. }) if function == "Len"
        ));
    }

    #[test]
    fn custom_module() {
        let mut store = ModuleStore::new();
        store.insert("echo", "first", |args: &ModuleArgs| {
            args.get("1").cloned().unwrap_or_default()
        });
        let first = store.resolve("Echo", "first").unwrap();
        assert_eq!(first(&args(&[("1", "x"), ("2", "y")])), "x");
        assert!(store.resolve("String", "len").is_err());
    }

    #[test]
    fn empty_module_name() {
        assert!(matches!(
            ModuleStore::default().resolve("", "len"),
            Err(Error::UnknownModule(_))
        ));
    }
}
