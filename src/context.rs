use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::rc::Rc;

use crate::ast::CallSignature;

/// Existence check used by the `EXISTS` predicate.
pub type ExistsCheck = dyn Fn(&str) -> io::Result<bool>;

/// Variables and definitions that variable references and conditions
/// are evaluated against.
///
/// Resolution and evaluation only read this context; `parent` is kept
/// for callers that implement scoping and is never consulted here.
pub struct Context {
    parent: Option<Rc<Context>>,
    vars: HashMap<String, String>,
    env: HashMap<String, String>,
    cache: HashMap<String, String>,
    functions: HashMap<String, CallSignature>,
    macros: HashMap<String, CallSignature>,
    exists: Box<ExistsCheck>,
}

impl Context {
    /// Create an empty context that checks paths on the local file
    /// system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            vars: HashMap::new(),
            env: HashMap::new(),
            cache: HashMap::new(),
            functions: HashMap::new(),
            macros: HashMap::new(),
            exists: Box::new(|path| Path::new(path).try_exists()),
        }
    }

    /// Create an empty child scope of `parent`.
    #[must_use]
    pub fn scope(parent: Rc<Self>) -> Self {
        Self::new().parent(parent)
    }

    /// Set the enclosing scope.
    #[must_use]
    pub fn parent(mut self, parent: Rc<Self>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Add a normal variable.
    #[must_use]
    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.set_var(name, value);
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.env.insert(name.to_string(), value.to_string());
        self
    }

    /// Add a cache variable.
    #[must_use]
    pub fn cache(mut self, name: &str, value: &str) -> Self {
        self.cache.insert(name.to_string(), value.to_string());
        self
    }

    /// Register a function definition.
    #[must_use]
    pub fn function(mut self, signature: CallSignature) -> Self {
        self.define_function(signature);
        self
    }

    /// Register a macro definition.
    #[must_use]
    pub fn macro_(mut self, signature: CallSignature) -> Self {
        self.define_macro(signature);
        self
    }

    /// Replace the existence check used by `EXISTS`.
    #[must_use]
    pub fn exists_check(mut self, check: impl Fn(&str) -> io::Result<bool> + 'static) -> Self {
        self.exists = Box::new(check);
        self
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn unset_var(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    pub fn define_function(&mut self, signature: CallSignature) {
        self.functions.insert(signature.name.clone(), signature);
    }

    pub fn define_macro(&mut self, signature: CallSignature) {
        self.macros.insert(signature.name.clone(), signature);
    }

    #[must_use]
    pub fn get_parent(&self) -> Option<&Rc<Self>> {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn get_env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn get_cache(&self, name: &str) -> Option<&str> {
        self.cache.get(name).map(String::as_str)
    }

    /// Whether `name` is a known function or macro. Command names are
    /// case-insensitive.
    #[must_use]
    pub fn is_command(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.functions.contains_key(&name) || self.macros.contains_key(&name)
    }

    #[must_use]
    pub fn get_function(&self, name: &str) -> Option<&CallSignature> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn get_macro(&self, name: &str) -> Option<&CallSignature> {
        self.macros.get(&name.to_ascii_lowercase())
    }

    /// Run the injected existence check.
    ///
    /// # Errors
    ///
    /// Propagates whatever error the check reports.
    pub fn check_exists(&self, path: &str) -> io::Result<bool> {
        (self.exists)(path)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("parent", &self.parent)
            .field("vars", &self.vars)
            .field("env", &self.env)
            .field("cache", &self.cache)
            .field("functions", &self.functions)
            .field("macros", &self.macros)
            .finish_non_exhaustive()
    }
}
