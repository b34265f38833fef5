//! Built-in rule catalog
//!
//! A representative set of API design rules covering all five categories,
//! plus the three gating prerequisite rules. Hosts with their own rule
//! sets construct a `Catalog` directly; this module is what the CLI runs
//! out of the box.

use crate::document::{Document, MUTATING_METHODS};
use crate::models::{Category, Severity, Target, TargetKind, ValidationResult};
use crate::rules::{Catalog, Rule};
use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

/// Knobs for the configurable prerequisite rules
#[derive(Debug, Clone)]
pub struct BuiltinCatalogConfig {
    /// Exact `openapi` version the contract must declare
    pub required_version: String,
    /// Header every mutating operation must accept
    pub tenant_header: String,
}

impl Default for BuiltinCatalogConfig {
    fn default() -> Self {
        Self {
            required_version: "3.0.3".to_string(),
            tenant_header: "X-Tenant-Id".to_string(),
        }
    }
}

/// Construct the built-in catalog
pub fn builtin_catalog(config: &BuiltinCatalogConfig) -> Catalog {
    let mut catalog = Catalog::new();
    catalog.register_all([
        Arc::new(VersionRule {
            required: config.required_version.clone(),
        }) as Arc<dyn Rule>,
        Arc::new(AuthSchemeRule),
        Arc::new(TenantHeaderRule {
            header: config.tenant_header.clone(),
        }),
        Arc::new(OperationAuthRule),
        Arc::new(HttpsServersRule),
        Arc::new(OperationIdRule),
        Arc::new(ResponseSchemaRule),
        Arc::new(ErrorResponsesRule),
        Arc::new(PaginationRule),
        Arc::new(RateLimitHeadersRule),
        Arc::new(DescriptionsRule),
        Arc::new(TagsRule),
        Arc::new(ExamplesRule),
    ]);
    catalog
}

/// Success (2xx) response targets for every operation
fn success_response_targets(document: &Document) -> Vec<Target> {
    let mut targets = Vec::new();
    for op in document.operations() {
        let Some(responses) = op.value.get("responses").and_then(Value::as_object) else {
            continue;
        };
        for (code, _) in responses.iter().filter(|(code, _)| code.starts_with('2')) {
            let mut target = Target::new(
                TargetKind::Response,
                format!("{}/responses/{}", op.location, code),
                format!("{} {} -> {}", op.method.to_uppercase(), op.path, code),
            );
            target.method = Some(op.method.to_string());
            target.path = Some(op.path.to_string());
            targets.push(target);
        }
    }
    targets
}

fn operation_targets(document: &Document) -> Vec<Target> {
    document
        .operations()
        .iter()
        .map(|op| Target::operation(op.location.clone(), op.method, op.path))
        .collect()
}

fn mutating_operation_targets(document: &Document) -> Vec<Target> {
    document
        .operations()
        .iter()
        .filter(|op| MUTATING_METHODS.contains(&op.method))
        .map(|op| Target::operation(op.location.clone(), op.method, op.path))
        .collect()
}

// ---------------------------------------------------------------------------
// Prerequisite rules
// ---------------------------------------------------------------------------

/// The contract must declare the exact required OpenAPI version
struct VersionRule {
    required: String,
}

impl Rule for VersionRule {
    fn id(&self) -> &'static str {
        "PREREQ-VERSION"
    }

    fn description(&self) -> &'static str {
        "The contract declares the exact required OpenAPI version"
    }

    fn category(&self) -> Category {
        Category::Functionality
    }

    fn severity(&self) -> Severity {
        Severity::Prerequisite
    }

    fn max_points(&self) -> f64 {
        0.0
    }

    fn detect(&self, _document: &Document) -> Result<Vec<Target>> {
        Ok(vec![Target::new(
            TargetKind::Schema,
            "openapi",
            "OpenAPI version declaration",
        )])
    }

    fn validate(&self, _target: &Target, document: &Document) -> Result<ValidationResult> {
        match document.version() {
            Some(version) if version == self.required => Ok(ValidationResult::pass()),
            Some(version) => Ok(ValidationResult::fail(format!(
                "openapi version is '{}', required '{}'",
                version, self.required
            ))
            .with_fix_hint(format!("set the openapi field to \"{}\"", self.required))),
            None => Ok(ValidationResult::fail("openapi version field is missing")
                .with_fix_hint(format!("add: openapi: \"{}\"", self.required))),
        }
    }
}

/// At least one authentication scheme must be defined
struct AuthSchemeRule;

impl Rule for AuthSchemeRule {
    fn id(&self) -> &'static str {
        "PREREQ-AUTH-SCHEME"
    }

    fn description(&self) -> &'static str {
        "At least one security scheme is defined under components"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn severity(&self) -> Severity {
        Severity::Prerequisite
    }

    fn max_points(&self) -> f64 {
        0.0
    }

    fn detect(&self, _document: &Document) -> Result<Vec<Target>> {
        Ok(vec![Target::new(
            TargetKind::Security,
            "components/securitySchemes",
            "security schemes",
        )])
    }

    fn validate(&self, _target: &Target, document: &Document) -> Result<ValidationResult> {
        match document.security_schemes() {
            Some(schemes) if !schemes.is_empty() => Ok(ValidationResult::pass()),
            _ => Ok(
                ValidationResult::fail("no security schemes are defined").with_fix_hint(
                    "define at least one scheme under components.securitySchemes",
                ),
            ),
        }
    }
}

/// Every mutating operation must accept the tenant-isolation header.
///
/// Parameters are resolved through both path-level and operation-level
/// lists and through component `$ref` indirection.
struct TenantHeaderRule {
    header: String,
}

impl Rule for TenantHeaderRule {
    fn id(&self) -> &'static str {
        "PREREQ-TENANT-HEADER"
    }

    fn description(&self) -> &'static str {
        "Every mutating operation accepts the tenant-isolation header"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn severity(&self) -> Severity {
        Severity::Prerequisite
    }

    fn max_points(&self) -> f64 {
        0.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(mutating_operation_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let path = target.path.as_deref().unwrap_or_default();
        let has_header = document
            .operation_parameters(path, operation)
            .iter()
            .any(|param| {
                param.get("in").and_then(Value::as_str) == Some("header")
                    && param
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| name.eq_ignore_ascii_case(&self.header))
            });
        if has_header {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} does not accept the {} header",
                target.identifier, self.header
            ))
            .with_fix_hint(format!(
                "add a required '{}' header parameter (path-level or operation-level)",
                self.header
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Security rules
// ---------------------------------------------------------------------------

/// Every operation must carry a security requirement
struct OperationAuthRule;

impl Rule for OperationAuthRule {
    fn id(&self) -> &'static str {
        "SEC-AUTH-OPS"
    }

    fn description(&self) -> &'static str {
        "Every operation carries a security requirement"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn max_points(&self) -> f64 {
        20.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(operation_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        // An explicit empty array opts the operation out of auth and
        // overrides any global requirement.
        let effective = match operation.get("security").and_then(Value::as_array) {
            Some(local) => !local.is_empty(),
            None => document
                .global_security()
                .and_then(Value::as_array)
                .is_some_and(|global| !global.is_empty()),
        };
        if effective {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} has no effective security requirement",
                target.identifier
            ))
            .with_fix_hint("add an operation-level security requirement or a document-global one"))
        }
    }
}

/// Servers must use https
struct HttpsServersRule;

impl Rule for HttpsServersRule {
    fn id(&self) -> &'static str {
        "SEC-HTTPS-ONLY"
    }

    fn description(&self) -> &'static str {
        "Every server URL uses https"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn severity(&self) -> Severity {
        Severity::Major
    }

    fn max_points(&self) -> f64 {
        10.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(document
            .servers()
            .iter()
            .enumerate()
            .map(|(i, server)| {
                let url = server
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or("<no url>");
                Target::new(TargetKind::Security, format!("servers/{}", i), url)
            })
            .collect())
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let url = document
            .lookup(&target.location)
            .and_then(|server| server.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if url.starts_with("https://") {
            Ok(ValidationResult::pass())
        } else {
            Ok(
                ValidationResult::fail(format!("server '{}' does not use https", url))
                    .with_fix_hint("serve the API over https only"),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Functionality rules
// ---------------------------------------------------------------------------

/// Every operation has a unique operationId
struct OperationIdRule;

impl Rule for OperationIdRule {
    fn id(&self) -> &'static str {
        "FUNC-OPERATION-ID"
    }

    fn description(&self) -> &'static str {
        "Every operation has a unique operationId"
    }

    fn category(&self) -> Category {
        Category::Functionality
    }

    fn severity(&self) -> Severity {
        Severity::Major
    }

    fn max_points(&self) -> f64 {
        10.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(operation_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let Some(op_id) = operation
            .get("operationId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        else {
            return Ok(ValidationResult::fail(format!(
                "{} has no operationId",
                target.identifier
            ))
            .with_fix_hint("assign a unique camelCase operationId"));
        };
        let occurrences = document
            .operations()
            .iter()
            .filter(|op| op.value.get("operationId").and_then(Value::as_str) == Some(op_id))
            .count();
        if occurrences > 1 {
            Ok(ValidationResult::fail(format!(
                "operationId '{}' is used by {} operations",
                op_id, occurrences
            ))
            .with_fix_hint("operationIds must be unique across the contract"))
        } else {
            Ok(ValidationResult::pass())
        }
    }
}

/// Success responses declare a content schema
struct ResponseSchemaRule;

impl Rule for ResponseSchemaRule {
    fn id(&self) -> &'static str {
        "FUNC-RESPONSE-SCHEMA"
    }

    fn description(&self) -> &'static str {
        "Every success response declares a content schema"
    }

    fn category(&self) -> Category {
        Category::Functionality
    }

    fn severity(&self) -> Severity {
        Severity::Major
    }

    fn max_points(&self) -> f64 {
        15.0
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec!["FUNC-OPERATION-ID"]
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(success_response_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let response = document
            .lookup(&target.location)
            .map(|r| document.resolve(r))
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        // 204-style responses legitimately carry no body
        if target.location.ends_with("/204") {
            return Ok(ValidationResult::pass());
        }
        let has_schema = response
            .get("content")
            .and_then(Value::as_object)
            .is_some_and(|content| {
                content
                    .values()
                    .any(|media| media.get("schema").is_some())
            });
        if has_schema {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} declares no content schema",
                target.identifier
            ))
            .with_fix_hint("describe the response body under content.<media-type>.schema"))
        }
    }
}

/// Operations declare error responses
struct ErrorResponsesRule;

impl Rule for ErrorResponsesRule {
    fn id(&self) -> &'static str {
        "FUNC-ERROR-RESPONSES"
    }

    fn description(&self) -> &'static str {
        "Operations declare at least one 4xx or default response"
    }

    fn category(&self) -> Category {
        Category::Functionality
    }

    fn severity(&self) -> Severity {
        Severity::Minor
    }

    fn max_points(&self) -> f64 {
        5.0
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec!["FUNC-RESPONSE-SCHEMA"]
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(operation_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let has_error = operation
            .get("responses")
            .and_then(Value::as_object)
            .is_some_and(|responses| {
                responses
                    .keys()
                    .any(|code| code.starts_with('4') || code == "default")
            });
        if has_error {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} documents no error responses",
                target.identifier
            ))
            .with_fix_hint("document expected 4xx responses or a default response"))
        }
    }
}

// ---------------------------------------------------------------------------
// Scalability rules
// ---------------------------------------------------------------------------

const PAGINATION_PARAMS: [&str; 5] = ["limit", "offset", "page", "cursor", "pageSize"];

/// Collection GETs expose pagination parameters
struct PaginationRule;

impl PaginationRule {
    /// Collection-style path: the last segment is not a path parameter
    fn is_collection_path(path: &str) -> bool {
        path.rsplit('/')
            .next()
            .is_some_and(|segment| !segment.starts_with('{'))
    }
}

impl Rule for PaginationRule {
    fn id(&self) -> &'static str {
        "SCALE-PAGINATION"
    }

    fn description(&self) -> &'static str {
        "Collection GET operations expose pagination parameters"
    }

    fn category(&self) -> Category {
        Category::Scalability
    }

    fn severity(&self) -> Severity {
        Severity::Major
    }

    fn max_points(&self) -> f64 {
        10.0
    }

    fn depends_on(&self) -> Vec<&'static str> {
        vec!["FUNC-RESPONSE-SCHEMA"]
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(document
            .operations()
            .iter()
            .filter(|op| op.method == "get" && Self::is_collection_path(op.path))
            .map(|op| Target::operation(op.location.clone(), op.method, op.path))
            .collect())
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let path = target.path.as_deref().unwrap_or_default();
        let paginated = document
            .operation_parameters(path, operation)
            .iter()
            .any(|param| {
                param.get("in").and_then(Value::as_str) == Some("query")
                    && param
                        .get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| PAGINATION_PARAMS.contains(&name))
            });
        if paginated {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} returns a collection without pagination parameters",
                target.identifier
            ))
            .with_fix_hint("add limit/offset or cursor query parameters"))
        }
    }
}

/// Mutating operations document rate-limit headers
struct RateLimitHeadersRule;

impl Rule for RateLimitHeadersRule {
    fn id(&self) -> &'static str {
        "SCALE-RATE-LIMIT-HEADERS"
    }

    fn description(&self) -> &'static str {
        "Mutating operations document rate-limit response headers"
    }

    fn category(&self) -> Category {
        Category::Scalability
    }

    fn severity(&self) -> Severity {
        Severity::Minor
    }

    fn max_points(&self) -> f64 {
        5.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(mutating_operation_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let documented = operation
            .get("responses")
            .and_then(Value::as_object)
            .is_some_and(|responses| {
                responses.values().any(|response| {
                    document
                        .resolve(response)
                        .get("headers")
                        .and_then(Value::as_object)
                        .is_some_and(|headers| {
                            headers.keys().any(|name| {
                                let lower = name.to_ascii_lowercase();
                                lower.starts_with("x-ratelimit") || lower == "retry-after"
                            })
                        })
                })
            });
        if documented {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} does not document rate-limit headers",
                target.identifier
            ))
            .with_fix_hint("document X-RateLimit-* or Retry-After response headers"))
        }
    }
}

// ---------------------------------------------------------------------------
// Maintainability rules
// ---------------------------------------------------------------------------

/// Operations carry a description or summary
struct DescriptionsRule;

impl Rule for DescriptionsRule {
    fn id(&self) -> &'static str {
        "MAINT-DESCRIPTIONS"
    }

    fn description(&self) -> &'static str {
        "Operations carry a description or summary"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn severity(&self) -> Severity {
        Severity::Minor
    }

    fn max_points(&self) -> f64 {
        5.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(operation_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let documented = ["description", "summary"].iter().any(|field| {
            operation
                .get(*field)
                .and_then(Value::as_str)
                .is_some_and(|text| !text.trim().is_empty())
        });
        if documented {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} has neither description nor summary",
                target.identifier
            ))
            .with_fix_hint("add a one-line summary at minimum"))
        }
    }
}

/// Operations are tagged for grouping
struct TagsRule;

impl Rule for TagsRule {
    fn id(&self) -> &'static str {
        "MAINT-TAGS"
    }

    fn description(&self) -> &'static str {
        "Operations are assigned to at least one tag"
    }

    fn category(&self) -> Category {
        Category::Maintainability
    }

    fn severity(&self) -> Severity {
        Severity::Minor
    }

    fn max_points(&self) -> f64 {
        5.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(operation_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let operation = document
            .lookup(&target.location)
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let tagged = operation
            .get("tags")
            .and_then(Value::as_array)
            .is_some_and(|tags| !tags.is_empty());
        if tagged {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} is untagged",
                target.identifier
            ))
            .with_fix_hint("group related operations under a tag"))
        }
    }
}

// ---------------------------------------------------------------------------
// Excellence rules
// ---------------------------------------------------------------------------

/// Success responses ship examples
struct ExamplesRule;

impl Rule for ExamplesRule {
    fn id(&self) -> &'static str {
        "EXCEL-EXAMPLES"
    }

    fn description(&self) -> &'static str {
        "Success responses include examples"
    }

    fn category(&self) -> Category {
        Category::Excellence
    }

    fn severity(&self) -> Severity {
        Severity::Minor
    }

    fn max_points(&self) -> f64 {
        10.0
    }

    fn detect(&self, document: &Document) -> Result<Vec<Target>> {
        Ok(success_response_targets(document))
    }

    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult> {
        let response = document
            .lookup(&target.location)
            .map(|r| document.resolve(r))
            .ok_or_else(|| anyhow::anyhow!("stale target location '{}'", target.location))?;
        let has_example = response
            .get("content")
            .and_then(Value::as_object)
            .is_some_and(|content| {
                content.values().any(|media| {
                    media.get("example").is_some()
                        || media.get("examples").is_some()
                        || media
                            .get("schema")
                            .map(|schema| document.resolve(schema))
                            .is_some_and(|schema| schema.get("example").is_some())
                })
            });
        if has_example {
            Ok(ValidationResult::pass())
        } else {
            Ok(ValidationResult::fail(format!(
                "{} ships no example payload",
                target.identifier
            ))
            .with_fix_hint("add an example under content.<media-type>.example"))
        }
    }
}
