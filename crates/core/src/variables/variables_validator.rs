//! Referential and uniqueness checks over a whole [`CategorySet`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::variables_errors::{Violation, ViolationKind};
use super::variables_model::{Category, CategorySet};

/// A reference to an option held by something outside the taxonomy
/// (a pitch, a campaign, a curator preference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalReference {
    pub source: String,
    pub category: Category,
    pub option_id: String,
}

/// Returns every rule the set breaks; empty when the set is valid.
pub fn validate(set: &CategorySet) -> Vec<Violation> {
    let genre_ids: HashSet<&str> = set
        .list(Category::Genres)
        .iter()
        .map(|o| o.id.as_str())
        .collect();

    let mut violations = Vec::new();
    for (category, options) in set.iter() {
        let mut seen_ids: HashSet<&str> = HashSet::with_capacity(options.len());
        // (parent scope, folded label) -> id of the first option using it
        let mut seen_labels: HashMap<(Option<&str>, String), &str> =
            HashMap::with_capacity(options.len());

        for option in options {
            let id = option.id.as_str();
            if !seen_ids.insert(id) {
                violations.push(Violation::error(
                    ViolationKind::DuplicateId,
                    category,
                    Some(id),
                    format!("Id '{}' is used more than once in {}", id, category),
                ));
            }

            let folded = fold_label(&option.label);
            if folded.is_empty() {
                violations.push(Violation::error(
                    ViolationKind::EmptyLabel,
                    category,
                    Some(id),
                    format!("Option '{}' in {} has an empty label", id, category),
                ));
            } else {
                let scope = if category.requires_parent() {
                    option.parent_id.as_deref()
                } else {
                    None
                };
                if let Some(first) = seen_labels.get(&(scope, folded.clone())) {
                    violations.push(Violation::error(
                        ViolationKind::DuplicateLabel,
                        category,
                        Some(id),
                        format!(
                            "Label '{}' already used by option '{}' in {}",
                            option.label.trim(),
                            first,
                            category
                        ),
                    ));
                } else {
                    seen_labels.insert((scope, folded), id);
                }
            }

            match (category.requires_parent(), option.parent_id.as_deref()) {
                (true, None) => violations.push(Violation::error(
                    ViolationKind::MissingParentReference,
                    category,
                    Some(id),
                    format!("Subgenre '{}' has no parent genre", option.label.trim()),
                )),
                (true, Some(parent)) if !genre_ids.contains(parent) => {
                    violations.push(Violation::error(
                        ViolationKind::DanglingParentReference,
                        category,
                        Some(id),
                        format!(
                            "Subgenre '{}' references unknown genre '{}'",
                            option.label.trim(),
                            parent
                        ),
                    ))
                }
                (false, Some(parent)) => violations.push(Violation::error(
                    ViolationKind::UnexpectedParentReference,
                    category,
                    Some(id),
                    format!(
                        "Only subgenres can have a parent; '{}' in {} points at '{}'",
                        option.label.trim(),
                        category,
                        parent
                    ),
                )),
                _ => {}
            }
        }
    }
    violations
}

/// Like [`validate`], additionally reporting external references that no
/// longer resolve. Those are informational and never block a commit.
pub fn validate_with_references(
    set: &CategorySet,
    references: &[ExternalReference],
) -> Vec<Violation> {
    let mut violations = validate(set);
    for reference in references {
        if !set.contains(reference.category, &reference.option_id) {
            violations.push(Violation::info(
                ViolationKind::OrphanReference,
                reference.category,
                Some(&reference.option_id),
                format!(
                    "{} references missing {} option '{}'",
                    reference.source, reference.category, reference.option_id
                ),
            ));
        }
    }
    violations
}

pub fn has_blocking(violations: &[Violation]) -> bool {
    violations.iter().any(Violation::is_blocking)
}

fn fold_label(label: &str) -> String {
    label.trim().to_lowercase()
}
