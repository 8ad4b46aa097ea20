//! Migration records and the HTTP actions they issue

use reqwest::Method;
use serde_json::Value;

/// A single HTTP call against the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Path appended to the gateway base URL (e.g., "/apisix/admin/routes/1")
    pub endpoint: String,
    /// HTTP verb
    pub method: Method,
    /// JSON payload, sent as the request body when present
    pub body: Option<Value>,
}

impl Action {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Parse an HTTP verb as written in a migration file (case-insensitive)
pub fn parse_method(raw: &str) -> Option<Method> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "GET" => Some(Method::GET),
        "POST" => Some(Method::POST),
        "PUT" => Some(Method::PUT),
        "PATCH" => Some(Method::PATCH),
        "DELETE" => Some(Method::DELETE),
        "HEAD" => Some(Method::HEAD),
        "OPTIONS" => Some(Method::OPTIONS),
        _ => None,
    }
}

/// A versioned set of forward and backward actions
///
/// Actions run in the order they were declared.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    /// Unix timestamp of creation; unique and used as the sort key
    pub identifier: i64,
    pub name: String,
    pub up: Vec<Action>,
    pub down: Vec<Action>,
}

impl Migration {
    pub fn new(identifier: i64, name: impl Into<String>) -> Self {
        Self {
            identifier,
            name: name.into(),
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    pub fn with_up(mut self, action: Action) -> Self {
        self.up.push(action);
        self
    }

    pub fn with_down(mut self, action: Action) -> Self {
        self.down.push(action);
        self
    }

    /// Display tag, e.g. "1700000000_add_routes"
    pub fn tag(&self) -> String {
        format!("{}_{}", self.identifier, self.name)
    }
}

/// Find a migration by identifier in a loaded collection
pub fn find(migrations: &[Migration], identifier: i64) -> Option<&Migration> {
    migrations.iter().find(|m| m.identifier == identifier)
}

/// Sort ascending by identifier; equal identifiers keep their relative order
pub fn sort_by_identifier(migrations: &mut [Migration]) {
    migrations.sort_by_key(|m| m.identifier);
}
