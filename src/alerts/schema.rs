//! # Field Schema Registry
//!
//! Static catalog describing, per alert type, which fields an operator can
//! configure, their types, bounds, defaults and dependencies. The catalog is
//! built once on first access and never mutated.

use std::sync::OnceLock;

use serde::Serialize;
use utoipa::ToSchema;

use super::types::{AlertType, FieldKind, FieldValue, FieldValues, RuleConfig, Severity};

/// Per-field predicate returning an error message for an invalid value.
pub type FieldValidator = fn(&FieldValue) -> Option<String>;

/// Schema-level rule over several fields, returning `(field_key, message)` pairs.
pub type CrossFieldRule = fn(&FieldValues) -> Vec<(&'static str, String)>;

/// Escalation delay applied to schema defaults.
pub const DEFAULT_ESCALATION_DELAY_MINUTES: u32 = 30;

/// Grouping used by callers to lay out alert types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Security,
    Maintenance,
    Operational,
    Compliance,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// A field is only active while `field` currently equals `equals`.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDependency {
    pub field: &'static str,
    pub equals: FieldValue,
}

/// One configurable parameter of an alert type.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub default: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<FieldDependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<&'static str>,
    #[serde(skip)]
    pub validator: Option<FieldValidator>,
}

impl FieldDefinition {
    fn new(key: &'static str, label: &'static str, default: FieldValue) -> Self {
        Self {
            key,
            label,
            kind: default.kind(),
            default,
            min: None,
            max: None,
            required: false,
            unit: None,
            options: Vec::new(),
            depends_on: None,
            help: None,
            validator: None,
        }
    }

    fn number(key: &'static str, label: &'static str, default: f64) -> Self {
        Self::new(key, label, FieldValue::Number(default))
    }

    fn percentage(key: &'static str, label: &'static str, default: f64) -> Self {
        Self::new(key, label, FieldValue::Percentage(default)).unit("%")
    }

    fn duration(key: &'static str, label: &'static str, default: u32, unit: &'static str) -> Self {
        Self::new(key, label, FieldValue::Duration(default)).unit(unit)
    }

    fn toggle(key: &'static str, label: &'static str, default: bool) -> Self {
        Self::new(key, label, FieldValue::Toggle(default))
    }

    fn text(key: &'static str, label: &'static str, default: &str) -> Self {
        Self::new(key, label, FieldValue::Text(default.to_string()))
    }

    fn single_select(
        key: &'static str,
        label: &'static str,
        default: &str,
        options: &[(&'static str, &'static str)],
    ) -> Self {
        Self::new(key, label, FieldValue::SingleSelect(default.to_string())).options(options)
    }

    fn multi_select(
        key: &'static str,
        label: &'static str,
        default: &[&str],
        options: &[(&'static str, &'static str)],
    ) -> Self {
        let default = default.iter().map(|value| value.to_string()).collect();
        Self::new(key, label, FieldValue::MultiSelect(default)).options(options)
    }

    fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    fn options(mut self, options: &[(&'static str, &'static str)]) -> Self {
        self.options = options
            .iter()
            .map(|&(value, label)| SelectOption { value, label })
            .collect();
        self
    }

    fn depends_on(mut self, field: &'static str, equals: FieldValue) -> Self {
        self.depends_on = Some(FieldDependency { field, equals });
        self
    }

    fn help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    fn validator(mut self, validator: FieldValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn allows_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }
}

/// Immutable description of one alert type.
#[derive(Debug, Clone, Serialize)]
pub struct AlertTypeSchema {
    pub alert_type: AlertType,
    pub label: &'static str,
    pub description: &'static str,
    pub category: AlertCategory,
    pub default_severity: Severity,
    pub fields: Vec<FieldDefinition>,
    #[serde(skip)]
    pub cross_field_rule: Option<CrossFieldRule>,
}

impl AlertTypeSchema {
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Whether `field`'s dependency is satisfied by `values`.
    ///
    /// A controlling field missing from `values` is read at its schema default.
    pub fn is_field_active(&self, field: &FieldDefinition, values: &FieldValues) -> bool {
        let Some(dependency) = &field.depends_on else {
            return true;
        };
        let current = values
            .get(dependency.field)
            .or_else(|| self.field(dependency.field).map(|parent| &parent.default));
        current == Some(&dependency.equals)
    }
}

static CATALOG: OnceLock<Vec<AlertTypeSchema>> = OnceLock::new();

fn catalog() -> &'static [AlertTypeSchema] {
    CATALOG.get_or_init(build_catalog)
}

/// Look up the schema for an alert type.
///
/// # Panics
///
/// Panics if the catalog has no entry for `alert_type`; every variant is
/// registered in [`build_catalog`], so this indicates a broken build.
pub fn schema_for(alert_type: AlertType) -> &'static AlertTypeSchema {
    catalog()
        .iter()
        .find(|schema| schema.alert_type == alert_type)
        .unwrap_or_else(|| panic!("no schema registered for alert type '{alert_type}'"))
}

/// Every alert type, in catalog order.
pub fn all_alert_types() -> &'static [AlertType] {
    &AlertType::ALL
}

/// Every schema, in catalog order.
pub fn all_schemas() -> &'static [AlertTypeSchema] {
    catalog()
}

/// Field map built from each field's declared default.
pub fn default_field_values(alert_type: AlertType) -> FieldValues {
    schema_for(alert_type)
        .fields
        .iter()
        .map(|field| (field.key.to_string(), field.default.clone()))
        .collect()
}

/// Rule body used when nothing in the hierarchy has been saved.
pub fn default_rule_config(alert_type: AlertType) -> RuleConfig {
    RuleConfig {
        enabled: true,
        severity: schema_for(alert_type).default_severity,
        auto_escalate: false,
        escalation_delay_minutes: DEFAULT_ESCALATION_DELAY_MINUTES,
        fields: default_field_values(alert_type),
        suppression: None,
    }
}

fn build_catalog() -> Vec<AlertTypeSchema> {
    AlertType::ALL.into_iter().map(build_schema).collect()
}

fn build_schema(alert_type: AlertType) -> AlertTypeSchema {
    match alert_type {
        AlertType::Theft => AlertTypeSchema {
            alert_type,
            label: "Theft Detection",
            description: "Unexpected movement or tampering outside permitted conditions",
            category: AlertCategory::Security,
            default_severity: Severity::Critical,
            fields: vec![
                FieldDefinition::number("movementThreshold", "Movement Threshold", 100.0)
                    .bounds(10.0, 10_000.0)
                    .unit("m")
                    .required(),
                FieldDefinition::toggle("afterHoursOnly", "After Hours Only", true),
                FieldDefinition::text("afterHoursStart", "After Hours Start", "18:00")
                    .depends_on("afterHoursOnly", FieldValue::Toggle(true))
                    .required()
                    .validator(clock_time)
                    .help("24-hour HH:MM"),
                FieldDefinition::text("afterHoursEnd", "After Hours End", "06:00")
                    .depends_on("afterHoursOnly", FieldValue::Toggle(true))
                    .required()
                    .validator(clock_time)
                    .help("24-hour HH:MM"),
                FieldDefinition::multi_select(
                    "indicators",
                    "Theft Indicators",
                    &["movement", "geofence-exit"],
                    &[
                        ("movement", "Unexpected movement"),
                        ("ignition", "Ignition without job"),
                        ("geofence-exit", "Geofence exit"),
                        ("tamper", "Tracker tamper"),
                        ("power-disconnect", "Power disconnect"),
                    ],
                )
                .required(),
                FieldDefinition::toggle(
                    "requireMultipleIndicators",
                    "Require Multiple Indicators",
                    false,
                ),
                FieldDefinition::number("minimumIndicators", "Minimum Indicators", 2.0)
                    .bounds(2.0, 5.0)
                    .depends_on("requireMultipleIndicators", FieldValue::Toggle(true))
                    .required()
                    .validator(whole_number),
            ],
            cross_field_rule: Some(theft_indicator_count),
        },
        AlertType::Battery => AlertTypeSchema {
            alert_type,
            label: "Low Battery",
            description: "Tracker battery charge below configured thresholds",
            category: AlertCategory::Maintenance,
            default_severity: Severity::Medium,
            fields: vec![
                FieldDefinition::percentage("lowBatteryThreshold", "Low Battery Threshold", 20.0)
                    .bounds(5.0, 50.0)
                    .required(),
                FieldDefinition::percentage(
                    "criticalBatteryThreshold",
                    "Critical Battery Threshold",
                    10.0,
                )
                .bounds(1.0, 25.0)
                .required(),
                FieldDefinition::duration("checkInterval", "Check Interval", 60, "minutes")
                    .bounds(5.0, 1440.0),
                FieldDefinition::toggle("notifyWhileCharging", "Notify While Charging", false),
            ],
            cross_field_rule: Some(battery_threshold_order),
        },
        AlertType::Compliance => AlertTypeSchema {
            alert_type,
            label: "Compliance",
            description: "Inspections, certifications and registrations nearing expiry",
            category: AlertCategory::Compliance,
            default_severity: Severity::High,
            fields: vec![
                FieldDefinition::multi_select(
                    "complianceTypes",
                    "Compliance Types",
                    &["inspection", "certification"],
                    &[
                        ("inspection", "Inspection"),
                        ("certification", "Certification"),
                        ("insurance", "Insurance"),
                        ("registration", "Registration"),
                    ],
                )
                .required(),
                FieldDefinition::number("reminderDaysBefore", "Reminder Days Before", 30.0)
                    .bounds(1.0, 90.0)
                    .unit("days")
                    .validator(whole_number),
                FieldDefinition::toggle("escalateOverdue", "Escalate Overdue Items", true),
                FieldDefinition::duration("overdueGracePeriod", "Overdue Grace Period", 3, "days")
                    .bounds(0.0, 30.0)
                    .depends_on("escalateOverdue", FieldValue::Toggle(true)),
            ],
            cross_field_rule: None,
        },
        AlertType::Underutilized => AlertTypeSchema {
            alert_type,
            label: "Underutilized Asset",
            description: "Assets sitting idle longer than expected",
            category: AlertCategory::Operational,
            default_severity: Severity::Low,
            fields: vec![
                FieldDefinition::percentage(
                    "utilizationThreshold",
                    "Utilization Threshold",
                    25.0,
                )
                .bounds(1.0, 100.0)
                .required(),
                FieldDefinition::duration("evaluationPeriod", "Evaluation Period", 7, "days")
                    .bounds(1.0, 90.0)
                    .required(),
                FieldDefinition::toggle("excludeWeekends", "Exclude Weekends", true),
                FieldDefinition::number("minimumIdleHours", "Minimum Idle Hours", 48.0)
                    .bounds(1.0, 720.0)
                    .unit("hours"),
            ],
            cross_field_rule: None,
        },
        AlertType::Offline => AlertTypeSchema {
            alert_type,
            label: "Tracker Offline",
            description: "No position report received within the expected window",
            category: AlertCategory::Operational,
            default_severity: Severity::Medium,
            fields: vec![
                FieldDefinition::duration("offlineThreshold", "Offline Threshold", 60, "minutes")
                    .bounds(5.0, 10_080.0)
                    .required(),
                FieldDefinition::duration("gracePeriod", "Grace Period", 15, "minutes")
                    .bounds(0.0, 120.0),
                FieldDefinition::toggle("notifyOnReconnect", "Notify On Reconnect", true),
                FieldDefinition::toggle("includeLastPosition", "Include Last Known Position", true),
            ],
            cross_field_rule: Some(offline_grace_period),
        },
        AlertType::UnauthorizedZone => AlertTypeSchema {
            alert_type,
            label: "Unauthorized Zone",
            description: "Asset entered or left a zone it is not permitted in",
            category: AlertCategory::Security,
            default_severity: Severity::High,
            fields: vec![
                FieldDefinition::single_select(
                    "zoneType",
                    "Zone Type",
                    "restricted",
                    &[
                        ("restricted", "Restricted area"),
                        ("customer-site", "Customer site"),
                        ("competitor", "Competitor location"),
                        ("hazardous", "Hazardous area"),
                    ],
                )
                .required(),
                FieldDefinition::text("zoneIds", "Zone IDs", "")
                    .validator(zone_id_list)
                    .help("Comma-separated zone identifiers; empty applies to all zones"),
                FieldDefinition::duration("dwellTimeThreshold", "Dwell Time Threshold", 5, "minutes")
                    .bounds(0.0, 1440.0),
                FieldDefinition::toggle("alertOnEntry", "Alert On Entry", true),
                FieldDefinition::toggle("alertOnExit", "Alert On Exit", false),
            ],
            cross_field_rule: Some(zone_direction_selected),
        },
        AlertType::PredictiveMaintenance => AlertTypeSchema {
            alert_type,
            label: "Predictive Maintenance",
            description: "Model-predicted component failure within the prediction window",
            category: AlertCategory::Maintenance,
            default_severity: Severity::Medium,
            fields: vec![
                FieldDefinition::percentage(
                    "failureProbabilityThreshold",
                    "Failure Probability Threshold",
                    75.0,
                )
                .bounds(50.0, 99.0)
                .required(),
                FieldDefinition::duration("predictionWindow", "Prediction Window", 14, "days")
                    .bounds(1.0, 90.0)
                    .required(),
                FieldDefinition::multi_select(
                    "maintenanceCategories",
                    "Maintenance Categories",
                    &["engine", "hydraulics"],
                    &[
                        ("engine", "Engine"),
                        ("hydraulics", "Hydraulics"),
                        ("electrical", "Electrical"),
                        ("tires", "Tires"),
                        ("brakes", "Brakes"),
                    ],
                )
                .required(),
                FieldDefinition::percentage("minimumConfidence", "Minimum Model Confidence", 80.0)
                    .bounds(50.0, 100.0),
            ],
            cross_field_rule: None,
        },
    }
}

fn clock_time(value: &FieldValue) -> Option<String> {
    let FieldValue::Text(text) = value else {
        return None;
    };
    let valid = text
        .split_once(':')
        .and_then(|(hours, minutes)| {
            if hours.len() != 2 || minutes.len() != 2 {
                return None;
            }
            if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((hours.parse::<u8>().ok()?, minutes.parse::<u8>().ok()?))
        })
        .is_some_and(|(hours, minutes)| hours < 24 && minutes < 60);
    (!valid).then(|| format!("'{text}' is not a valid 24-hour time (HH:MM)"))
}

fn whole_number(value: &FieldValue) -> Option<String> {
    let number = value.as_number()?;
    (number.fract() != 0.0).then(|| "must be a whole number".to_string())
}

fn zone_id_list(value: &FieldValue) -> Option<String> {
    let FieldValue::Text(text) = value else {
        return None;
    };
    if text.trim().is_empty() {
        return None;
    }
    text.split(',')
        .map(str::trim)
        .find(|id| {
            id.is_empty()
                || !id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map(|id| format!("'{id}' is not a valid zone identifier"))
}

fn number_field(values: &FieldValues, key: &str) -> Option<f64> {
    values.get(key).and_then(FieldValue::as_number)
}

fn battery_threshold_order(values: &FieldValues) -> Vec<(&'static str, String)> {
    match (
        number_field(values, "lowBatteryThreshold"),
        number_field(values, "criticalBatteryThreshold"),
    ) {
        (Some(low), Some(critical)) if critical >= low => vec![(
            "criticalBatteryThreshold",
            format!("Critical Battery Threshold ({critical}%) must be below Low Battery Threshold ({low}%)"),
        )],
        _ => Vec::new(),
    }
}

fn offline_grace_period(values: &FieldValues) -> Vec<(&'static str, String)> {
    match (
        number_field(values, "offlineThreshold"),
        number_field(values, "gracePeriod"),
    ) {
        (Some(threshold), Some(grace)) if grace >= threshold => vec![(
            "gracePeriod",
            "Grace Period must be shorter than Offline Threshold".to_string(),
        )],
        _ => Vec::new(),
    }
}

fn theft_indicator_count(values: &FieldValues) -> Vec<(&'static str, String)> {
    let multiple = values
        .get("requireMultipleIndicators")
        .and_then(FieldValue::as_bool)
        .unwrap_or(false);
    if !multiple {
        return Vec::new();
    }
    let minimum = number_field(values, "minimumIndicators").unwrap_or(2.0);
    let selected = match values.get("indicators") {
        Some(FieldValue::MultiSelect(indicators)) => indicators.len(),
        _ => 0,
    };
    if (selected as f64) < minimum {
        vec![(
            "indicators",
            format!("Select at least {minimum} indicators when multiple indicators are required"),
        )]
    } else {
        Vec::new()
    }
}

fn zone_direction_selected(values: &FieldValues) -> Vec<(&'static str, String)> {
    let on_entry = values.get("alertOnEntry").and_then(FieldValue::as_bool);
    let on_exit = values.get("alertOnExit").and_then(FieldValue::as_bool);
    if on_entry == Some(false) && on_exit == Some(false) {
        vec![(
            "alertOnEntry",
            "Enable alerts on entry, exit, or both".to_string(),
        )]
    } else {
        Vec::new()
    }
}
