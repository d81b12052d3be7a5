use std::collections::BTreeMap;

use super::rules::Rule;

/// Field name → field value. Absent keys are missing values.
pub type FormData = BTreeMap<String, String>;

/// Ordered per-field rule lists.
#[derive(Debug, Clone, Default)]
pub struct FormRules {
    fields: Vec<(String, Vec<Rule>)>,
}

impl FormRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rules: Vec<Rule>) -> Self {
        self.fields.push((name.into(), rules));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.fields
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValidation {
    pub is_valid: bool,
    pub errors: BTreeMap<String, String>,
}

/// Message of the first failing rule, in rule order.
pub fn validate_field(value: Option<&str>, rules: &[Rule]) -> Option<String> {
    rules
        .iter()
        .find(|rule| !rule.test(value))
        .map(|rule| rule.message().to_string())
}

/// Every field is checked independently.
pub fn validate_form(data: &FormData, rules: &FormRules) -> FormValidation {
    let errors: BTreeMap<String, String> = rules
        .iter()
        .filter_map(|(field, field_rules)| {
            validate_field(data.get(field).map(String::as_str), field_rules)
                .map(|message| (field.to_string(), message))
        })
        .collect();

    FormValidation {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Keeps the field errors of the last validation for display.
#[derive(Debug, Default)]
pub struct FormValidator {
    errors: BTreeMap<String, String>,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate_form(&mut self, data: &FormData, rules: &FormRules) -> bool {
        let result = validate_form(data, rules);
        self.errors = result.errors;
        result.is_valid
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn clear_field_error(&mut self, field: &str) {
        self.errors.remove(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::{email, max_length, min_length, password, required};

    fn form(pairs: &[(&str, &str)]) -> FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn registration_rules() -> FormRules {
        FormRules::new()
            .field("email", vec![required(), email()])
            .field("password", vec![required(), password()])
            .field("name", vec![required()])
    }

    #[test]
    fn first_failing_rule_wins() {
        let rules = vec![required(), min_length(3), max_length(5)];
        assert_eq!(
            validate_field(Some(""), &rules).as_deref(),
            Some("This field is required")
        );
        assert_eq!(
            validate_field(Some("ab"), &rules).as_deref(),
            Some("Must be at least 3 characters")
        );
        assert_eq!(validate_field(Some("abcd"), &rules), None);
    }

    #[test]
    fn rule_order_is_significant() {
        let value = Some("");
        assert_eq!(
            validate_field(value, &[email(), required()]).as_deref(),
            Some("Please enter a valid email")
        );
        assert_eq!(
            validate_field(value, &[required(), email()]).as_deref(),
            Some("This field is required")
        );
    }

    #[test]
    fn invalid_registration_reports_each_field() {
        let data = form(&[("email", "bad"), ("password", "123"), ("name", "")]);
        let result = validate_form(&data, &registration_rules());

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
        assert_eq!(result.errors["email"], "Please enter a valid email");
        assert_eq!(result.errors["password"], "Password must be at least 8 characters");
        assert_eq!(result.errors["name"], "This field is required");
    }

    #[test]
    fn missing_fields_are_required_failures() {
        let result = validate_form(&FormData::new(), &registration_rules());
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.values().all(|m| m == "This field is required"));
    }

    #[test]
    fn valid_registration_passes() {
        let data = form(&[
            ("email", "budi@elkkana.id"),
            ("password", "laut-biru-2024"),
            ("name", "Budi Santoso"),
        ]);
        let result = validate_form(&data, &registration_rules());
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn validator_tracks_and_clears_errors() {
        let mut validator = FormValidator::new();
        let data = form(&[("email", "bad"), ("password", "12345678"), ("name", "Budi")]);

        assert!(!validator.validate_form(&data, &registration_rules()));
        assert!(validator.has_errors());
        assert_eq!(validator.field_error("email"), Some("Please enter a valid email"));

        validator.clear_field_error("email");
        assert!(!validator.has_errors());

        validator.validate_form(&FormData::new(), &registration_rules());
        validator.clear_errors();
        assert!(validator.errors().is_empty());
    }
}
