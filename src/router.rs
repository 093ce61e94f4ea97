//! First-match path router.
//!
//! Routes are kept in registration order and tried one by one; the first
//! pattern that matches anywhere in the path wins. Patterns are not
//! anchored, so `/` matches every path and belongs at the end.

use regex::Regex;

/// A path pattern and what to do when it matches.
#[derive(Debug, Clone)]
pub struct Route<H> {
    /// Matched anywhere in the path.
    pub pattern: Regex,
    pub handler: H,
}

/// Ordered list of routes.
///
/// Built once at startup, then only read.
#[derive(Debug, Clone)]
pub struct PathRouter<H> {
    routes: Vec<Route<H>>,
}

impl<H> PathRouter<H> {
    /// Create a router with no routes.
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Append a route after all existing ones.
    pub fn register(&mut self, pattern: Regex, handler: H) -> &mut Self {
        self.routes.push(Route { pattern, handler });
        self
    }

    /// Compile `pattern` and append a route for it.
    pub fn route(mut self, pattern: &str, handler: H) -> Result<Self, regex::Error> {
        self.register(Regex::new(pattern)?, handler);
        Ok(self)
    }

    /// Handler of the first route matching `path`, or `None` if nothing does.
    pub fn dispatch(&self, path: &str) -> Option<&H> {
        self.routes
            .iter()
            .find(|route| route.pattern.is_match(path))
            .map(|route| &route.handler)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H> Default for PathRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}
