//! Output renderers for grade results
//!
//! - `text`: colored terminal report
//! - `json`: machine-readable report for scripting
//! - `deps`: textual dependency diagnostics (root causes and cascades)
//!
//! Reporters are pure presentation: they round and format, the scoring
//! layer never does.

pub mod deps;
pub mod json;
pub mod text;
