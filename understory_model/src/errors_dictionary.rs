// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-object validation state.

use hashbrown::HashMap;

use crate::validation::ValidationResult;

/// How an update changed an [`ErrorsDictionary`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorsDictionaryUpdateType {
    /// The stored errors are the same as before.
    NoChange,
    /// The object went from no errors to some errors.
    HasErrorsIsTrue,
    /// The object went from some errors to no errors.
    HasErrorsIsFalse,
    /// Errors changed but `has_errors` did not.
    ErrorsChanged,
}

impl ErrorsDictionaryUpdateType {
    /// Returns `true` unless this is [`NoChange`](Self::NoChange).
    #[must_use]
    pub fn is_change(self) -> bool {
        self != Self::NoChange
    }

    /// Returns `true` if `has_errors` flipped.
    #[must_use]
    pub fn has_errors_changed(self) -> bool {
        matches!(self, Self::HasErrorsIsTrue | Self::HasErrorsIsFalse)
    }
}

/// Validation errors of one object, keyed by property name.
///
/// The empty name holds object-level errors. Only non-empty lists are
/// stored, so `has_errors` is simply "is anything stored". Updates compare
/// old and new results by value, ignoring order, so recomputing the same
/// errors reports [`NoChange`](ErrorsDictionaryUpdateType::NoChange).
///
/// ```rust
/// use understory_model::{ErrorsDictionary, ErrorsDictionaryUpdateType, ValidationResult};
///
/// let mut errors = ErrorsDictionary::new();
/// let required = vec![ValidationResult::for_member("Name is required.", "Name")];
///
/// assert_eq!(errors.set_errors("Name", required.clone()), ErrorsDictionaryUpdateType::HasErrorsIsTrue);
/// assert_eq!(errors.set_errors("Name", required), ErrorsDictionaryUpdateType::NoChange);
/// assert_eq!(errors.set_errors("Name", vec![]), ErrorsDictionaryUpdateType::HasErrorsIsFalse);
/// assert!(!errors.has_errors());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ErrorsDictionary {
    errors: HashMap<String, Vec<ValidationResult>>,
}

impl ErrorsDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if any property or the object has errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Replaces the errors of `property_name`.
    pub fn set_errors(
        &mut self,
        property_name: &str,
        results: Vec<ValidationResult>,
    ) -> ErrorsDictionaryUpdateType {
        let old = self.errors.get(property_name).map_or(&[][..], Vec::as_slice);
        if same_results(old, &results) {
            return ErrorsDictionaryUpdateType::NoChange;
        }

        let had_errors = self.has_errors();
        if results.is_empty() {
            self.errors.remove(property_name);
        } else {
            self.errors.insert(property_name.to_owned(), results);
        }
        match (had_errors, self.has_errors()) {
            (false, true) => ErrorsDictionaryUpdateType::HasErrorsIsTrue,
            (true, false) => ErrorsDictionaryUpdateType::HasErrorsIsFalse,
            _ => ErrorsDictionaryUpdateType::ErrorsChanged,
        }
    }

    /// Replaces the object-level errors.
    ///
    /// Also returns the member names mentioned by the old or new results, so
    /// their per-property views can be refreshed. The list is empty when
    /// nothing changed.
    pub fn set_object_errors(
        &mut self,
        results: Vec<ValidationResult>,
    ) -> (ErrorsDictionaryUpdateType, Vec<String>) {
        let mut affected: Vec<String> = Vec::new();
        let old = self.errors.get("").map_or(&[][..], Vec::as_slice);
        for name in old.iter().chain(&results).flat_map(ValidationResult::member_names) {
            if !affected.contains(name) {
                affected.push(name.clone());
            }
        }
        let update = self.set_errors("", results);
        if !update.is_change() {
            affected.clear();
        }
        (update, affected)
    }

    /// Errors for `property_name`, including object-level errors that name
    /// it. The empty name returns the object-level errors.
    #[must_use]
    pub fn get_errors(&self, property_name: &str) -> Vec<ValidationResult> {
        let own = self.errors.get(property_name).into_iter().flatten();
        if property_name.is_empty() {
            return own.cloned().collect();
        }
        let from_object = self
            .errors
            .get("")
            .into_iter()
            .flatten()
            .filter(|result| result.applies_to(property_name));
        own.chain(from_object).cloned().collect()
    }

    /// Every stored error: object-level first, then by property name.
    #[must_use]
    pub fn get_all_errors(&self) -> Vec<ValidationResult> {
        let mut keys: Vec<&String> = self.errors.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|key| &self.errors[key])
            .cloned()
            .collect()
    }

    /// Removes every error and returns the names that had errors, sorted.
    pub fn clear(&mut self) -> Vec<String> {
        let mut cleared: Vec<String> = self.errors.drain().map(|(name, _)| name).collect();
        cleared.sort();
        cleared
    }
}

fn same_results(old: &[ValidationResult], new: &[ValidationResult]) -> bool {
    if old.len() != new.len() {
        return false;
    }
    let mut old: Vec<&ValidationResult> = old.iter().collect();
    let mut new: Vec<&ValidationResult> = new.iter().collect();
    old.sort();
    new.sort();
    old == new
}

#[cfg(test)]
mod tests {
    use super::*;
    use ErrorsDictionaryUpdateType::*;

    fn error(message: &str, member: &str) -> ValidationResult {
        ValidationResult::for_member(message, member)
    }

    #[test]
    fn order_does_not_matter() {
        let mut errors = ErrorsDictionary::new();
        let a = error("a", "Name");
        let b = error("b", "Name");
        assert_eq!(errors.set_errors("Name", vec![a.clone(), b.clone()]), HasErrorsIsTrue);
        assert_eq!(errors.set_errors("Name", vec![b, a]), NoChange);
    }

    #[test]
    fn second_property_reports_errors_changed() {
        let mut errors = ErrorsDictionary::new();
        errors.set_errors("Name", vec![error("missing", "Name")]);
        assert_eq!(errors.set_errors("Age", vec![error("negative", "Age")]), ErrorsChanged);
        assert_eq!(errors.set_errors("Name", vec![]), ErrorsChanged);
        assert_eq!(errors.set_errors("Age", vec![]), HasErrorsIsFalse);
        assert_eq!(errors.set_errors("Age", vec![]), NoChange);
    }

    #[test]
    fn object_errors_report_affected_members() {
        let mut errors = ErrorsDictionary::new();
        let mismatch = ValidationResult::new("Passwords differ.")
            .with_member("Password")
            .with_member("Confirm");
        let (update, affected) = errors.set_object_errors(vec![mismatch.clone()]);
        assert_eq!(update, HasErrorsIsTrue);
        assert_eq!(affected, ["Password", "Confirm"]);

        let (update, affected) = errors.set_object_errors(vec![mismatch]);
        assert_eq!(update, NoChange);
        assert!(affected.is_empty());

        let (update, affected) = errors.set_object_errors(vec![error("Too short.", "Password")]);
        assert_eq!(update, ErrorsChanged);
        assert_eq!(affected, ["Password", "Confirm"]);
    }

    #[test]
    fn property_view_includes_object_errors() {
        let mut errors = ErrorsDictionary::new();
        errors.set_errors("Password", vec![error("Required.", "Password")]);
        errors.set_object_errors(vec![
            error("Passwords differ.", "Confirm"),
            ValidationResult::new("Account locked."),
        ]);

        assert_eq!(errors.get_errors("Password").len(), 1);
        let confirm = errors.get_errors("Confirm");
        assert_eq!(confirm.len(), 1);
        assert_eq!(confirm[0].error_message(), "Passwords differ.");
        assert_eq!(errors.get_errors("").len(), 2);
        assert_eq!(errors.get_all_errors().len(), 3);
        assert_eq!(errors.get_all_errors()[0].error_message(), "Passwords differ.");
    }

    #[test]
    fn clear_returns_names() {
        let mut errors = ErrorsDictionary::new();
        errors.set_errors("B", vec![error("b", "B")]);
        errors.set_errors("A", vec![error("a", "A")]);
        assert_eq!(errors.clear(), ["A", "B"]);
        assert!(!errors.has_errors());
        assert!(errors.clear().is_empty());
    }
}
