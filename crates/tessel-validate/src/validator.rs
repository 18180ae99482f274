//! The validator trait and registry.

use std::fmt;

use tessel_core::{Model, ValidationEvent};

/// A single validation rule.
///
/// Object-safe so validators can be stored in `Box<dyn Validator>` and run
/// from several threads at once.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Name used in logs and in validator configuration.
    fn name(&self) -> &str;

    /// Check the model and return every event found.
    fn validate(&self, model: &Model) -> Vec<ValidationEvent>;
}

/// An ordered set of validators.
#[derive(Debug, Default)]
pub struct ValidatorRegistry {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    pub fn validators(&self) -> &[Box<dyn Validator>] {
        &self.validators
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Names of the registered validators, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Always;

    impl Validator for Always {
        fn name(&self) -> &str {
            "Always"
        }

        fn validate(&self, _model: &Model) -> Vec<ValidationEvent> {
            vec![ValidationEvent::note("Always", None, "always fires")]
        }
    }

    #[test]
    fn registry_keeps_order() {
        let mut registry = ValidatorRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(Always));
        assert_eq!(registry.names(), vec!["Always"]);
        let events = registry.validators()[0].validate(&Model::default());
        assert_eq!(events.len(), 1);
    }
}
