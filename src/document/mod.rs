//! Document access layer
//!
//! Wraps an already-parsed OpenAPI-style object graph and exposes the
//! lookups the grading engine needs: opaque location resolution,
//! single-level `$ref` indirection, and iteration over paths, operations
//! and servers. The engine never parses text or walks raw JSON itself;
//! everything goes through this seam.
//!
//! Locations use JSON-pointer segments joined with `/`, with the standard
//! `~1` / `~0` escapes, e.g. `paths/~1users/get/responses/200`. Rules
//! treat them as opaque keys and only ever pass them back to `lookup`.

use serde_json::Value;

/// HTTP methods recognized as operations under a path item
pub const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// Methods that mutate state and therefore need tenant isolation
pub const MUTATING_METHODS: [&str; 4] = ["post", "put", "patch", "delete"];

/// Escape one path segment for use in a location key
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// One operation in the document, with its resolved location key
#[derive(Debug, Clone)]
pub struct OperationRef<'a> {
    pub path: &'a str,
    pub method: &'a str,
    pub location: String,
    pub value: &'a Value,
}

/// A parsed API contract, navigable by location key
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
}

impl Document {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve an opaque location key to a node in the document.
    ///
    /// Returns None for unknown keys; rules decide what absence means.
    pub fn lookup(&self, location: &str) -> Option<&Value> {
        let mut node = &self.root;
        for segment in location.split('/') {
            if segment.is_empty() {
                continue;
            }
            let key = unescape_segment(segment);
            node = match node {
                Value::Object(map) => map.get(&key)?,
                Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Follow a single level of `$ref` indirection.
    ///
    /// Chained pointers are the upstream resolver's responsibility; a
    /// document handed to the engine is expected to be one hop deep.
    pub fn resolve<'a>(&'a self, value: &'a Value) -> &'a Value {
        let Some(reference) = value.get("$ref").and_then(Value::as_str) else {
            return value;
        };
        let Some(pointer) = reference.strip_prefix("#/") else {
            return value;
        };
        self.lookup(pointer).unwrap_or(value)
    }

    /// The `openapi` version declaration, if present
    pub fn version(&self) -> Option<&str> {
        self.root.get("openapi").and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.root
            .get("info")
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
    }

    pub fn info_version(&self) -> Option<&str> {
        self.root
            .get("info")
            .and_then(|info| info.get("version"))
            .and_then(Value::as_str)
    }

    /// Iterate over path items as (path, value) pairs
    pub fn paths(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.root
            .get("paths")
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
    }

    /// Enumerate every operation in the document, in document order
    pub fn operations(&self) -> Vec<OperationRef<'_>> {
        let mut ops = Vec::new();
        for (path, item) in self.paths() {
            let Some(item_map) = item.as_object() else {
                continue;
            };
            for method in HTTP_METHODS {
                if let Some(op) = item_map.get(method) {
                    if op.is_object() {
                        ops.push(OperationRef {
                            path,
                            method,
                            location: format!("paths/{}/{}", escape_segment(path), method),
                            value: op,
                        });
                    }
                }
            }
        }
        ops
    }

    /// Server entries, empty when the document declares none
    pub fn servers(&self) -> &[Value] {
        self.root
            .get("servers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Document-global security requirements
    pub fn global_security(&self) -> Option<&Value> {
        self.root.get("security")
    }

    /// Declared security schemes under components
    pub fn security_schemes(&self) -> Option<&serde_json::Map<String, Value>> {
        self.root
            .get("components")
            .and_then(|c| c.get("securitySchemes"))
            .and_then(Value::as_object)
    }

    /// Effective parameter list for an operation: path-level parameters
    /// plus operation-level ones, each resolved through `$ref`.
    pub fn operation_parameters<'a>(&'a self, path: &str, operation: &'a Value) -> Vec<&'a Value> {
        let mut params: Vec<&Value> = Vec::new();
        let path_item = self
            .root
            .get("paths")
            .and_then(|p| p.get(path));
        for holder in [path_item, Some(operation)].into_iter().flatten() {
            if let Some(list) = holder.get("parameters").and_then(Value::as_array) {
                params.extend(list.iter().map(|p| self.resolve(p)));
            }
        }
        params
    }
}
