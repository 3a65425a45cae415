//! Scope-variable substitution
//!
//! Config documents may reference deployment-scope variables as
//! `@{{name}}` tokens. The backend usually resolves them server-side and
//! ships the result in `resolved_value`; these helpers cover snapshots
//! where it did not, and keep resolution structure-preserving: a JSON
//! document stays JSON of the same shape after substitution.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::config::CodeEditorValue;

const TOKEN_PREFIX: &str = "@{{";
const TOKEN_SUFFIX: &str = "}}";

/// Replace `@{{name}}` tokens in plain text. Unknown names are left
/// literal, as are unterminated tokens.
pub fn substitute_variables(input: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(TOKEN_PREFIX) {
        out.push_str(&rest[..start]);
        let after = &rest[start + TOKEN_PREFIX.len()..];
        let Some(end) = after.find(TOKEN_SUFFIX) else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        match variables.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + TOKEN_PREFIX.len() + end + TOKEN_SUFFIX.len()]),
        }
        rest = &after[end + TOKEN_SUFFIX.len()..];
    }

    out.push_str(rest);
    out
}

fn substitute_in_tree(value: &mut Value, variables: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            if s.contains(TOKEN_PREFIX) {
                *s = substitute_variables(s, variables);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_in_tree(item, variables);
            }
        }
        Value::Object(map) => {
            for entry in map.values_mut() {
                substitute_in_tree(entry, variables);
            }
        }
        _ => {}
    }
}

/// Substitute variables in a config document.
///
/// JSON documents are substituted inside their string leaves so the result
/// re-parses to the same structural shape; anything that is not valid JSON
/// is treated as plain text.
pub fn substitute_document(document: &str, variables: &BTreeMap<String, String>) -> String {
    if variables.is_empty() || !document.contains(TOKEN_PREFIX) {
        return document.to_string();
    }
    match serde_json::from_str::<Value>(document) {
        Ok(mut tree) => {
            substitute_in_tree(&mut tree, variables);
            serde_json::to_string(&tree)
                .unwrap_or_else(|_| substitute_variables(document, variables))
        }
        Err(_) => substitute_variables(document, variables),
    }
}

/// The document to compare and render for one side of a diff.
///
/// With resolution off this is the raw body. With resolution on it is the
/// backend-resolved body when present, otherwise a local substitution from
/// the variable snapshot, otherwise the raw body again.
pub fn resolved_document(editor: &CodeEditorValue, resolve_variables: bool) -> Cow<'_, str> {
    if resolve_variables && editor.resolved_value.is_none() && !editor.variable_snapshot.is_empty() {
        return Cow::Owned(substitute_document(&editor.value, &editor.variable_snapshot));
    }
    Cow::Borrowed(editor.effective_document(resolve_variables))
}

/// Fill in `resolved_value` for a snapshot the backend sent unresolved.
///
/// Keeps the snapshot invariant: `resolved_value` is the raw document with
/// variables substituted and parses to the same structural shape. Snapshots
/// without a variable snapshot are left untouched.
pub fn ensure_resolved(editor: &mut CodeEditorValue) {
    if editor.resolved_value.is_none() && !editor.variable_snapshot.is_empty() {
        editor.resolved_value = Some(substitute_document(&editor.value, &editor.variable_snapshot));
    }
}
