//! # Validator
//!
//! Checks a candidate [`RuleConfig`] against the schema of its alert type and
//! reports one message per offending field. Pure, no I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::schema::{AlertTypeSchema, FieldDefinition, schema_for};
use super::types::{AlertType, FieldValue, RuleConfig};

/// Error key used for the escalation delay of the rule body.
pub const ESCALATION_DELAY_KEY: &str = "escalationDelayMinutes";
/// Error key used for the suppression cooldown of the rule body.
pub const SUPPRESSION_COOLDOWN_KEY: &str = "suppression.cooldownMinutes";
/// Error key used for the suppression cap of the rule body.
pub const SUPPRESSION_MAX_ALERTS_KEY: &str = "suppression.maxAlerts";

/// Outcome of validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    fn from_errors(errors: BTreeMap<String, String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn error_for(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }
}

/// Validate `config` against the schema registered for `alert_type`.
pub fn validate(alert_type: AlertType, config: &RuleConfig) -> ValidationReport {
    let schema = schema_for(alert_type);
    let mut errors = BTreeMap::new();

    for key in config.fields.keys() {
        if schema.field(key).is_none() {
            errors.insert(key.clone(), format!("'{key}' is not a configurable field"));
        }
    }

    for field in &schema.fields {
        if !schema.is_field_active(field, &config.fields) {
            continue;
        }
        if let Some(message) = check_field(field, config.fields.get(field.key)) {
            errors.insert(field.key.to_string(), message);
        }
    }

    if errors.is_empty() {
        apply_cross_field_rule(schema, config, &mut errors);
    }

    check_rule_body(config, &mut errors);

    ValidationReport::from_errors(errors)
}

fn check_field(field: &FieldDefinition, value: Option<&FieldValue>) -> Option<String> {
    let value = match value {
        Some(value) if !value.is_empty() => value,
        _ if field.required => return Some(format!("{} is required", field.label)),
        _ => return None,
    };

    if value.kind() != field.kind {
        return Some(format!("{} must be {}", field.label, field.kind.describe()));
    }

    let mut message = match value {
        FieldValue::SingleSelect(selected) if !field.allows_option(selected) => {
            Some(format!("{} does not allow '{selected}'", field.label))
        }
        FieldValue::MultiSelect(selected) => selected
            .iter()
            .find(|option| !field.allows_option(option))
            .map(|option| format!("{} does not allow '{option}'", field.label)),
        _ => check_bounds(field, value),
    };

    if let Some(custom) = field.validator.and_then(|validator| validator(value)) {
        let custom = format!("{} {}", field.label, custom.trim_start_matches(&*field.label).trim());
        message = Some(match message {
            Some(existing) => format!("{existing}; {custom}"),
            None => custom,
        });
    }

    message
}

fn check_bounds(field: &FieldDefinition, value: &FieldValue) -> Option<String> {
    if !field.kind.is_numeric() {
        return None;
    }
    let number = value.as_number()?;
    let unit = field.unit.map(|unit| format!(" {unit}")).unwrap_or_default();
    if let Some(min) = field.min
        && number < min
    {
        return Some(format!("{} must be at least {min}{unit}", field.label));
    }
    if let Some(max) = field.max
        && number > max
    {
        return Some(format!("{} must be at most {max}{unit}", field.label));
    }
    None
}

fn apply_cross_field_rule(
    schema: &AlertTypeSchema,
    config: &RuleConfig,
    errors: &mut BTreeMap<String, String>,
) {
    let Some(rule) = schema.cross_field_rule else {
        return;
    };
    for (key, message) in rule(&config.fields) {
        errors.entry(key.to_string()).or_insert(message);
    }
}

fn check_rule_body(config: &RuleConfig, errors: &mut BTreeMap<String, String>) {
    if config.auto_escalate && config.escalation_delay_minutes == 0 {
        errors.insert(
            ESCALATION_DELAY_KEY.to_string(),
            "Escalation delay must be at least 1 minute when auto-escalation is enabled"
                .to_string(),
        );
    }

    if let Some(suppression) = config.suppression.as_ref().filter(|s| s.enabled) {
        if suppression.cooldown_minutes == 0 {
            errors.insert(
                SUPPRESSION_COOLDOWN_KEY.to_string(),
                "Suppression cooldown must be at least 1 minute".to_string(),
            );
        }
        if suppression.max_alerts == 0 {
            errors.insert(
                SUPPRESSION_MAX_ALERTS_KEY.to_string(),
                "Suppression must allow at least 1 alert".to_string(),
            );
        }
    }
}
