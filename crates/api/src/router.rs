//! Path-pattern routing.
//!
//! Templates are compiled once at registration: literal spans are
//! regex-escaped, `:name` segments become `([^/]+)` captures, and the whole
//! pattern is anchored start-to-end, so trailing slashes are significant.
//! Matching walks the method's route list in registration order and the
//! first full match wins. A linear scan is adequate at this route count and
//! keeps precedence explicit: literal routes such as `/products/categories`
//! must be registered before parameterized siblings like `/products/:id`.

use std::collections::HashMap;

use axum::http::Method;
use regex::Regex;

use crate::routes::HandlerId;

/// Whether the dispatcher must authenticate the session before invoking
/// the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

#[derive(Debug)]
struct Route {
    pattern: Regex,
    param_names: Vec<String>,
    handler: HandlerId,
    access: Access,
}

/// Result of a successful route resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub handler: HandlerId,
    pub access: Access,
    /// Captured path segments bound positionally to the template's capture
    /// names.
    pub params: HashMap<String, String>,
}

/// Immutable after startup; shared read-only across requests.
#[derive(Debug, Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, template: &str, handler: HandlerId, access: Access) {
        self.register(Method::GET, template, handler, access);
    }

    pub fn post(&mut self, template: &str, handler: HandlerId, access: Access) {
        self.register(Method::POST, template, handler, access);
    }

    pub fn put(&mut self, template: &str, handler: HandlerId, access: Access) {
        self.register(Method::PUT, template, handler, access);
    }

    pub fn delete(&mut self, template: &str, handler: HandlerId, access: Access) {
        self.register(Method::DELETE, template, handler, access);
    }

    pub fn patch(&mut self, template: &str, handler: HandlerId, access: Access) {
        self.register(Method::PATCH, template, handler, access);
    }

    pub fn register(&mut self, method: Method, template: &str, handler: HandlerId, access: Access) {
        let (pattern, param_names) = compile(template);
        self.routes.entry(method).or_default().push(Route {
            pattern,
            param_names,
            handler,
            access,
        });
    }

    /// Resolve `(method, path)` to the first registered route whose pattern
    /// fully matches.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let routes = self.routes.get(method)?;

        for route in routes {
            if let Some(captures) = route.pattern.captures(path) {
                let params = route
                    .param_names
                    .iter()
                    .enumerate()
                    .filter_map(|(i, name)| {
                        captures
                            .get(i + 1)
                            .map(|m| (name.clone(), m.as_str().to_string()))
                    })
                    .collect();

                return Some(RouteMatch {
                    handler: route.handler,
                    access: route.access,
                    params,
                });
            }
        }

        None
    }

}

/// Compile a template into its anchored pattern and ordered capture names.
fn compile(template: &str) -> (Regex, Vec<String>) {
    let mut pattern = String::from("^");
    let mut names = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        let starts_capture =
            c == ':' && chars.peek().is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_');

        if starts_capture {
            pattern.push_str(&regex::escape(&literal));
            literal.clear();

            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            names.push(name);
            pattern.push_str("([^/]+)");
        } else {
            literal.push(c);
        }
    }

    pattern.push_str(&regex::escape(&literal));
    pattern.push('$');

    let regex = Regex::new(&pattern).expect("route template compiles to a valid pattern");
    (regex, names)
}
