//! Validators configured through the model's `validators` metadata.
//!
//! Each entry names a known validator and may rewrite the events it emits:
//!
//! ```json
//! {
//!   "name": "EmitEachSelector",
//!   "id": "NoBlobs",
//!   "severity": "WARNING",
//!   "namespaces": ["ex.weather"],
//!   "configuration": { "selector": "blob" }
//! }
//! ```
//!
//! Problems in the configuration itself are reported as events rather than
//! returned as errors, so one bad entry never hides the others.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use tessel_core::prelude::is_prelude_shape;
use tessel_core::traits::ids;
use tessel_core::{Model, Severity, ShapeId, ShapeKind, ValidationEvent};
use tessel_selector::Selector;
use tracing::{debug, warn};

use crate::validator::Validator;

/// Metadata key holding validator configuration.
pub const VALIDATORS_KEY: &str = "validators";

/// One entry of the `validators` metadata list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorConfig {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub configuration: Value,
}

/// What a configured validator checks.
#[derive(Debug)]
enum Rule {
    /// One event per shape matched by the selector.
    EmitEach {
        selector: Selector,
        bind_to_trait: Option<ShapeId>,
    },
    /// One event when the selector matches nothing.
    EmitNone { selector: Selector },
    MissingDocumentation,
}

impl Rule {
    fn default_severity(&self) -> Severity {
        match self {
            Rule::EmitEach { .. } | Rule::EmitNone { .. } => Severity::Danger,
            Rule::MissingDocumentation => Severity::Note,
        }
    }

    fn check(&self, model: &Model) -> Vec<(Option<ShapeId>, String)> {
        match self {
            Rule::EmitEach {
                selector,
                bind_to_trait,
            } => selector
                .select(model)
                .into_iter()
                .filter(|shape| bind_to_trait.as_ref().map_or(true, |t| shape.has_trait(t)))
                .map(|shape| {
                    (
                        Some(shape.id().clone()),
                        format!("shape matched selector `{selector}`"),
                    )
                })
                .collect(),
            Rule::EmitNone { selector } => {
                if selector.select(model).is_empty() {
                    vec![(None, format!("no shapes matched selector `{selector}`"))]
                } else {
                    Vec::new()
                }
            }
            Rule::MissingDocumentation => model
                .shapes()
                .filter(|shape| !is_prelude_shape(shape.id()))
                .filter(|shape| {
                    matches!(
                        shape.kind(),
                        ShapeKind::Service
                            | ShapeKind::Operation
                            | ShapeKind::Resource
                            | ShapeKind::Structure
                            | ShapeKind::Union
                    )
                })
                .flat_map(|shape| std::iter::once(shape).chain(shape.members()))
                .filter(|shape| !shape.has_trait(&ids::documentation()))
                .map(|shape| {
                    let what = if shape.is_member() { "member" } else { shape.kind().as_str() };
                    (
                        Some(shape.id().clone()),
                        format!("{what} `{}` has no documentation", shape.id()),
                    )
                })
                .collect(),
        }
    }
}

/// A validator built from a [`ValidatorConfig`].
#[derive(Debug)]
pub struct ConfiguredValidator {
    name: String,
    id: String,
    message: Option<String>,
    severity: Severity,
    namespaces: BTreeSet<String>,
    selector: Option<Selector>,
    rule: Rule,
}

impl ConfiguredValidator {
    /// The event id this validator reports under.
    pub fn event_id(&self) -> &str {
        &self.id
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    fn in_namespaces(&self, shape_id: Option<&ShapeId>) -> bool {
        if self.namespaces.is_empty() {
            return true;
        }
        shape_id.is_some_and(|id| self.namespaces.contains(id.namespace()))
    }
}

impl Validator for ConfiguredValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, model: &Model) -> Vec<ValidationEvent> {
        let scope = self.selector.as_ref().map(|s| s.select_ids(model));
        self.rule
            .check(model)
            .into_iter()
            .filter(|(shape_id, _)| self.in_namespaces(shape_id.as_ref()))
            .filter(|(shape_id, _)| match (&scope, shape_id) {
                (None, _) => true,
                (Some(scope), Some(id)) => scope.contains(id),
                (Some(_), None) => false,
            })
            .map(|(shape_id, message)| {
                let message = self.message.clone().unwrap_or(message);
                ValidationEvent::new(self.id.clone(), self.severity, shape_id, message)
            })
            .collect()
    }
}

/// Build the validators listed in the model's metadata.
///
/// Returns the validators that could be built and the events describing
/// entries that could not.
pub fn load_validators(model: &Model) -> (Vec<ConfiguredValidator>, Vec<ValidationEvent>) {
    let Some(entries) = model.metadata().get(VALIDATORS_KEY) else {
        return (Vec::new(), Vec::new());
    };
    let Some(entries) = entries.as_array() else {
        return (
            Vec::new(),
            vec![ValidationEvent::error(
                "InvalidValidatorConfig",
                None,
                "`validators` metadata must be a list",
            )],
        );
    };

    let mut validators = Vec::new();
    let mut events = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let config: ValidatorConfig = match serde_json::from_value(entry.clone()) {
            Ok(config) => config,
            Err(err) => {
                events.push(ValidationEvent::error(
                    "InvalidValidatorConfig",
                    None,
                    format!("validators[{index}] is invalid: {err}"),
                ));
                continue;
            }
        };
        if let Some(validator) = build(&config, &mut events) {
            debug!(name = %config.name, id = %validator.id, "configured validator");
            validators.push(validator);
        }
    }
    (validators, events)
}

fn build(config: &ValidatorConfig, events: &mut Vec<ValidationEvent>) -> Option<ConfiguredValidator> {
    let invalid = |message: String| {
        ValidationEvent::error(
            "InvalidValidatorConfig",
            None,
            format!("validator `{}`: {message}", config.name),
        )
    };

    let rule = match config.name.as_str() {
        "EmitEachSelector" => {
            let selector = match configured_selector(config) {
                Ok(selector) => selector,
                Err(message) => {
                    events.push(invalid(message));
                    return None;
                }
            };
            let bind_to_trait = config
                .configuration
                .get("bindToTrait")
                .and_then(Value::as_str)
                .map(|text| ShapeId::parse_relative(text, "smithy.api"))
                .transpose();
            match bind_to_trait {
                Ok(bind_to_trait) => Rule::EmitEach {
                    selector,
                    bind_to_trait,
                },
                Err(err) => {
                    events.push(invalid(format!("invalid bindToTrait: {err}")));
                    return None;
                }
            }
        }
        "EmitNoneSelector" => match configured_selector(config) {
            Ok(selector) => Rule::EmitNone { selector },
            Err(message) => {
                events.push(invalid(message));
                return None;
            }
        },
        "MissingDocumentation" => Rule::MissingDocumentation,
        unknown => {
            warn!(name = unknown, "unknown validator");
            events.push(ValidationEvent::warning(
                format!("UnknownValidator_{unknown}"),
                None,
                format!("unable to locate a validator named `{unknown}`"),
            ));
            return None;
        }
    };

    let selector = match config.selector.as_deref().map(Selector::parse).transpose() {
        Ok(selector) => selector,
        Err(err) => {
            events.push(invalid(format!("invalid selector: {err}")));
            return None;
        }
    };

    let mut severity = rule.default_severity();
    match config.severity {
        Some(Severity::Error) => events.push(ValidationEvent::warning(
            "InvalidValidatorConfig",
            None,
            format!(
                "validator `{}` cannot be configured with ERROR severity; using {severity}",
                config.name
            ),
        )),
        Some(configured) => severity = configured,
        None => {}
    }

    Some(ConfiguredValidator {
        name: config.name.clone(),
        id: config.id.clone().unwrap_or_else(|| config.name.clone()),
        message: config.message.clone(),
        severity,
        namespaces: config.namespaces.iter().cloned().collect(),
        selector,
        rule,
    })
}

fn configured_selector(config: &ValidatorConfig) -> Result<Selector, String> {
    let text = config
        .configuration
        .get("selector")
        .and_then(Value::as_str)
        .ok_or_else(|| "configuration.selector is required".to_string())?;
    Selector::parse(text).map_err(|err| format!("invalid configuration.selector: {err}"))
}
