// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Validation results and the built-in validators.
//!
//! The crate decides *when* validation runs; a [`Validator`] decides what is
//! valid. Validators are attached to properties with
//! [`PropertyMetadataBuilder::validate`](crate::PropertyMetadataBuilder::validate).

use core::fmt;

use crate::bag::BagValues;
use crate::class::ClassMetadata;
use crate::metadata::PropertyMetadata;
use crate::value::{ErasedValue, PropertyValue};

/// One validation failure.
///
/// Two results are equal when their message and member names are equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValidationResult {
    error_message: String,
    member_names: Vec<String>,
}

impl ValidationResult {
    /// A failure that names no member.
    #[must_use]
    pub fn new(error_message: impl Into<String>) -> Self {
        Self {
            error_message: error_message.into(),
            member_names: Vec::new(),
        }
    }

    /// A failure attributed to `member`.
    #[must_use]
    pub fn for_member(error_message: impl Into<String>, member: impl Into<String>) -> Self {
        Self::new(error_message).with_member(member)
    }

    /// Adds a member name.
    #[must_use]
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member_names.push(member.into());
        self
    }

    /// The message.
    #[must_use]
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Members this failure is about.
    #[must_use]
    pub fn member_names(&self) -> &[String] {
        &self.member_names
    }

    /// Returns `true` if `member` is among the member names.
    #[must_use]
    pub fn applies_to(&self, member: &str) -> bool {
        self.member_names.iter().any(|name| name == member)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error_message)
    }
}

/// What a validator can see besides the value under test.
#[derive(Copy, Clone, Debug)]
pub struct ValidationContext<'a> {
    values: BagValues<'a>,
    member: Option<&'a PropertyMetadata>,
}

impl<'a> ValidationContext<'a> {
    /// Context for whole-object validation.
    #[must_use]
    pub fn for_object(values: BagValues<'a>) -> Self {
        Self {
            values,
            member: None,
        }
    }

    /// Context for validating `member`.
    #[must_use]
    pub fn for_member(values: BagValues<'a>, member: &'a PropertyMetadata) -> Self {
        Self {
            values,
            member: Some(member),
        }
    }

    /// Class of the object being validated.
    #[must_use]
    pub fn class(&self) -> &'a ClassMetadata {
        self.values.metadata()
    }

    /// The property being validated, if any.
    #[must_use]
    pub fn member(&self) -> Option<&'a PropertyMetadata> {
        self.member
    }

    /// Name of the property being validated, if any.
    #[must_use]
    pub fn member_name(&self) -> Option<&'static str> {
        self.member.map(PropertyMetadata::name)
    }

    /// Name for messages: the member's display name, or the class name.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        self.member
            .map_or_else(|| self.class().name(), PropertyMetadata::display_name)
    }

    /// All current values of the object.
    #[must_use]
    pub fn values(&self) -> BagValues<'a> {
        self.values
    }

    /// Current value of another property.
    #[must_use]
    pub fn value(&self, property_name: &str) -> Option<&'a ErasedValue> {
        self.values.by_name(property_name)
    }

    /// Current value of another property as a `T`.
    #[must_use]
    pub fn get<T: 'static>(&self, property_name: &str) -> Option<&'a T> {
        self.value(property_name)?.downcast_ref()
    }

    fn failure(&self, message: String) -> ValidationResult {
        let result = ValidationResult::new(message);
        match self.member_name() {
            Some(name) => result.with_member(name),
            None => result,
        }
    }
}

/// A declarative validation rule.
///
/// `value` is `None` when the property was never written. A rule may report
/// any number of failures.
///
/// ```rust
/// use understory_model::{ErasedValue, ValidationContext, ValidationResult, Validator};
///
/// /// Reports every character outside `a..=z`.
/// #[derive(Debug)]
/// struct Lowercase;
///
/// impl Validator for Lowercase {
///     fn validate(
///         &self,
///         value: Option<&ErasedValue>,
///         context: &ValidationContext<'_>,
///         results: &mut Vec<ValidationResult>,
///     ) {
///         let Some(text) = value.and_then(ErasedValue::as_text) else {
///             return;
///         };
///         for c in text.chars().filter(|c| !c.is_ascii_lowercase()) {
///             let message = format!("'{c}' is not allowed in {}.", context.display_name());
///             results.push(ValidationResult::new(message));
///         }
///     }
/// }
/// ```
pub trait Validator: Send + Sync + fmt::Debug {
    /// Checks `value`, appending a result for each failure.
    fn validate(
        &self,
        value: Option<&ErasedValue>,
        context: &ValidationContext<'_>,
        results: &mut Vec<ValidationResult>,
    );
}

fn is_missing(value: Option<&ErasedValue>) -> bool {
    value.is_none_or(ErasedValue::is_null)
}

/// Fails on missing and null values, and on blank strings unless
/// [`allow_empty_strings`](Self::allow_empty_strings) is set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Required {
    allow_empty_strings: bool,
}

impl Required {
    /// A required rule that rejects blank strings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allow_empty_strings: false,
        }
    }

    /// Accepts empty and whitespace-only strings.
    #[must_use]
    pub const fn allow_empty_strings(mut self) -> Self {
        self.allow_empty_strings = true;
        self
    }
}

impl Validator for Required {
    fn validate(
        &self,
        value: Option<&ErasedValue>,
        context: &ValidationContext<'_>,
        results: &mut Vec<ValidationResult>,
    ) {
        let blank = !self.allow_empty_strings
            && value
                .and_then(ErasedValue::as_text)
                .is_some_and(|text| text.trim().is_empty());
        if is_missing(value) || blank {
            results.push(context.failure(format!("The {} field is required.", context.display_name())));
        }
    }
}

/// Limits the character count of text values. Missing values pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StringLength {
    min: usize,
    max: usize,
}

impl StringLength {
    /// At most `max` characters.
    #[must_use]
    pub const fn max(max: usize) -> Self {
        Self { min: 0, max }
    }

    /// Between `min` and `max` characters, inclusive.
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl Validator for StringLength {
    fn validate(
        &self,
        value: Option<&ErasedValue>,
        context: &ValidationContext<'_>,
        results: &mut Vec<ValidationResult>,
    ) {
        let Some(text) = value.and_then(ErasedValue::as_text) else {
            return;
        };
        let len = text.chars().count();
        if (self.min..=self.max).contains(&len) {
            return;
        }
        let name = context.display_name();
        let message = if self.min == 0 {
            format!(
                "The field {name} must be a string with a maximum length of {}.",
                self.max
            )
        } else {
            format!(
                "The field {name} must be a string with a minimum length of {} and a maximum length of {}.",
                self.min, self.max
            )
        };
        results.push(context.failure(message));
    }
}

/// Bounds numeric values, inclusive. Missing values pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Range {
    min: f64,
    max: f64,
}

impl Range {
    /// Values from `min` to `max`, inclusive.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl Validator for Range {
    fn validate(
        &self,
        value: Option<&ErasedValue>,
        context: &ValidationContext<'_>,
        results: &mut Vec<ValidationResult>,
    ) {
        let Some(number) = value.and_then(ErasedValue::as_number) else {
            return;
        };
        if (self.min..=self.max).contains(&number) {
            return;
        }
        results.push(context.failure(format!(
            "The field {} must be between {} and {}.",
            context.display_name(),
            self.min,
            self.max
        )));
    }
}

type Check = Box<dyn Fn(Option<&ErasedValue>, &ValidationContext<'_>) -> bool + Send + Sync>;

/// A validator built from a closure.
///
/// `{0}` in the message is replaced by the display name.
///
/// ```rust
/// use understory_model::{ClassMetadataBuilder, Predicate};
///
/// let mut class = ClassMetadataBuilder::new::<()>();
/// class
///     .property::<i32>("Age")
///     .validate(Predicate::of::<i32>(|age| *age >= 18, "{0} must be at least 18."));
/// assert!(class.build().is_ok());
/// ```
pub struct Predicate {
    check: Check,
    message: String,
}

impl Predicate {
    /// A rule over the erased value and its context.
    #[must_use]
    pub fn new(
        check: impl Fn(Option<&ErasedValue>, &ValidationContext<'_>) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check: Box::new(check),
            message: message.into(),
        }
    }

    /// A rule over values of type `T`. Missing values pass.
    #[must_use]
    pub fn of<T: PropertyValue>(
        check: impl Fn(&T) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            move |value, _| {
                value
                    .and_then(ErasedValue::downcast_ref::<T>)
                    .is_none_or(&check)
            },
            message,
        )
    }
}

impl Validator for Predicate {
    fn validate(
        &self,
        value: Option<&ErasedValue>,
        context: &ValidationContext<'_>,
        results: &mut Vec<ValidationResult>,
    ) {
        if !(self.check)(value, context) {
            results.push(context.failure(self.message.replace("{0}", context.display_name())));
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassMetadataBuilder;
    use crate::id::PropertyId;

    struct Sample;

    fn class() -> ClassMetadata {
        let mut class = ClassMetadataBuilder::new::<Sample>();
        class.property::<Option<String>>("Name").display_name("Full name");
        class.property::<i32>("Age");
        class.build().unwrap()
    }

    fn check(
        validator: &dyn Validator,
        metadata: &ClassMetadata,
        slot: u16,
        value: Option<ErasedValue>,
    ) -> Option<ValidationResult> {
        let mut slots = vec![None; metadata.len()];
        slots[usize::from(slot)] = value;
        let values = BagValues::new(metadata, &slots);
        let member = metadata.property_at(PropertyId::new(slot)).unwrap();
        let context = ValidationContext::for_member(values, member);
        let mut results = Vec::new();
        validator.validate(slots[usize::from(slot)].as_ref(), &context, &mut results);
        assert!(results.len() <= 1, "built-in rules report one failure at most");
        results.pop()
    }

    #[test]
    fn required_rejects_missing_null_and_blank() {
        let metadata = class();
        let required = Required::new();
        let failure = check(&required, &metadata, 0, None).unwrap();
        assert_eq!(failure.error_message(), "The Full name field is required.");
        assert_eq!(failure.member_names(), ["Name"]);
        assert!(failure.applies_to("Name"));

        assert!(check(&required, &metadata, 0, Some(ErasedValue::new(None::<String>))).is_some());
        let blank = Some(ErasedValue::new(Some(String::from("  "))));
        assert!(check(&required, &metadata, 0, blank.clone()).is_some());
        assert!(check(&required.allow_empty_strings(), &metadata, 0, blank).is_none());
        let present = Some(ErasedValue::new(Some(String::from("Ada"))));
        assert!(check(&required, &metadata, 0, present).is_none());
    }

    #[test]
    fn string_length_counts_characters() {
        let metadata = class();
        let rule = StringLength::between(2, 3);
        let text = |s: &str| Some(ErasedValue::new(Some(String::from(s))));
        assert!(check(&rule, &metadata, 0, text("ab")).is_none());
        assert!(check(&rule, &metadata, 0, text("äöü")).is_none());
        let failure = check(&rule, &metadata, 0, text("abcd")).unwrap();
        assert!(failure.error_message().contains("minimum length of 2"));
        assert!(check(&rule, &metadata, 0, None).is_none());
        assert!(
            check(&StringLength::max(1), &metadata, 0, text("ab"))
                .unwrap()
                .error_message()
                .contains("maximum length of 1")
        );
    }

    #[test]
    fn range_is_inclusive() {
        let metadata = class();
        let rule = Range::new(0.0, 130.0);
        assert!(check(&rule, &metadata, 1, Some(ErasedValue::new(130_i32))).is_none());
        let failure = check(&rule, &metadata, 1, Some(ErasedValue::new(-1_i32))).unwrap();
        assert_eq!(failure.error_message(), "The field Age must be between 0 and 130.");
    }

    #[test]
    fn predicate_formats_display_name() {
        let metadata = class();
        let adult = Predicate::of::<i32>(|age| *age >= 18, "{0} must be at least 18.");
        let failure = check(&adult, &metadata, 1, Some(ErasedValue::new(12_i32))).unwrap();
        assert_eq!(failure.error_message(), "Age must be at least 18.");
        assert!(check(&adult, &metadata, 1, Some(ErasedValue::new(40_i32))).is_none());
        assert!(format!("{adult:?}").contains("at least 18"));
    }

    #[test]
    fn context_reads_sibling_values() {
        let metadata = class();
        let slots = vec![
            Some(ErasedValue::new(Some(String::from("Ada")))),
            Some(ErasedValue::new(36_i32)),
        ];
        let context = ValidationContext::for_object(BagValues::new(&metadata, &slots));
        assert_eq!(context.get::<i32>("Age"), Some(&36));
        assert_eq!(context.member_name(), None);
        assert!(context.get::<String>("Age").is_none());
        assert!(context.value("Missing").is_none());
    }

    #[derive(Debug)]
    struct EachDigit;

    impl Validator for EachDigit {
        fn validate(
            &self,
            value: Option<&ErasedValue>,
            context: &ValidationContext<'_>,
            results: &mut Vec<ValidationResult>,
        ) {
            let digits = value
                .and_then(ErasedValue::as_text)
                .into_iter()
                .flat_map(str::chars)
                .filter(char::is_ascii_digit);
            results.extend(digits.map(|digit| context.failure(format!("Digit {digit} is not allowed."))));
        }
    }

    #[test]
    fn a_rule_can_report_several_failures() {
        let metadata = class();
        let mut slots = vec![Some(ErasedValue::new(Some(String::from("R2D2")))), None];
        let values = BagValues::new(&metadata, &slots);
        let member = metadata.property_at(PropertyId::new(0)).unwrap();
        let context = ValidationContext::for_member(values, member);
        let mut results = Vec::new();
        EachDigit.validate(values.get(member.id()), &context, &mut results);
        let messages: Vec<_> = results.iter().map(ValidationResult::error_message).collect();
        assert_eq!(messages, ["Digit 2 is not allowed.", "Digit 2 is not allowed."]);
        assert!(results.iter().all(|result| result.applies_to("Name")));

        slots[0] = Some(ErasedValue::new(Some(String::from("Ada"))));
        let values = BagValues::new(&metadata, &slots);
        let context = ValidationContext::for_member(values, member);
        results.clear();
        EachDigit.validate(values.get(member.id()), &context, &mut results);
        assert!(results.is_empty());
    }
}
