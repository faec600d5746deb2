//! Required-fields hints for standard note-types.

use crate::models::vendor::{NoteType, NoteTypeKind, Requirement};
use regex::Regex;
use std::sync::LazyLock;

/// A replacement tag: `{{Field}}`, `{{text:Field}}`, `{{#Field}}` etc.
static FIELD_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^{}]+)\}\}").unwrap_or_else(|_| unreachable!()));

/// Field names referenced by template markup, in first-seen order.
///
/// Section markers (`#`, `^`, `/`) and filters (`text:`, `hint:`) are
/// stripped; the special `FrontSide` reference is skipped.
#[must_use]
pub fn referenced_fields(markup: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in FIELD_REFERENCE.captures_iter(markup) {
        let Some(inner) = caps.get(1) else {
            continue;
        };
        let inner = inner.as_str().trim_start_matches(['#', '^', '/']);
        let name = inner.rsplit(':').next().unwrap_or(inner).trim();
        if name.is_empty() || name == "FrontSide" {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Computes the required-fields hint of a note-type.
///
/// For each template, the fields its question references. A template that
/// references one field needs it (`all`); several make any one of them
/// sufficient (`any`); none yields `none`. Cloze note-types have no hint.
#[must_use]
pub fn required_fields(note_type: &NoteType) -> Vec<Requirement> {
    if note_type.kind == NoteTypeKind::Cloze {
        return Vec::new();
    }
    note_type
        .tmpls
        .iter()
        .map(|template| {
            let ords: Vec<u32> = referenced_fields(&template.qfmt)
                .iter()
                .filter_map(|name| note_type.flds.iter().find(|f| &f.name == name))
                .map(|f| f.ord)
                .collect();
            let mode = match ords.len() {
                0 => "none",
                1 => "all",
                _ => "any",
            };
            Requirement(template.ord, mode.to_string(), ords)
        })
        .collect()
}
