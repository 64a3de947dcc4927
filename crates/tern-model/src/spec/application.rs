use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::is_path_segment;
use crate::{
    EventHandlerSpec, Order, ResourceDescriptor, RuntimeSpec,
    error::{ModelError, ModelResult},
};

/// Declarative description of a distributed application.
///
/// `ApplicationSpec` describes *what* runs (named units with their executables,
/// resource requests and resources), *in which order* units start, and *who*
/// handles lifecycle events on the master side.
///
/// It is treated as immutable once submission begins; staging produces a
/// rewritten copy through [`ApplicationSpec::with_localized`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Application name, unique per submission namespace.
    ///
    /// Used as the first segment of the staging path, so it cannot contain `/`.
    pub name: String,
    /// Units keyed by name.
    pub units: BTreeMap<String, RuntimeSpec>,
    /// Startup order. Units not mentioned start after every listed group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<Order>,
    /// Lifecycle event handler, `None` means "log only".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_handler: Option<EventHandlerSpec>,
}

impl ApplicationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: BTreeMap::new(),
            orders: Vec::new(),
            event_handler: None,
        }
    }

    /// Add (or replace) a unit.
    pub fn with_unit(mut self, unit: RuntimeSpec) -> Self {
        self.units.insert(unit.name.clone(), unit);
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn with_event_handler(mut self, handler: EventHandlerSpec) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Handler the master will actually use.
    pub fn effective_event_handler(&self) -> EventHandlerSpec {
        self.event_handler
            .clone()
            .unwrap_or_else(EventHandlerSpec::log_only)
    }

    /// Copy with each unit's resources replaced by its localized list.
    ///
    /// Units absent from `localized` end up with no resources. Ordering,
    /// limits and executables pass through untouched; a missing event handler
    /// is replaced by the log-only handler.
    pub fn with_localized(&self, localized: &BTreeMap<String, Vec<ResourceDescriptor>>) -> Self {
        let units = self
            .units
            .iter()
            .map(|(name, unit)| {
                let resources = localized.get(name).cloned().unwrap_or_default();
                (name.clone(), unit.with_resources(resources))
            })
            .collect();

        Self {
            name: self.name.clone(),
            units,
            orders: self.orders.clone(),
            event_handler: Some(self.effective_event_handler()),
        }
    }

    /// Rules:
    /// - name is a single path segment (non-empty, no `/`, not `.` or `..`);
    /// - every unit is valid and keyed by its own name;
    /// - orders reference known units, each at most once.
    pub fn validate(&self) -> ModelResult<()> {
        if !is_path_segment(&self.name) {
            return Err(ModelError::Invalid(format!(
                "invalid application name: {:?}",
                self.name
            )));
        }
        if self.units.is_empty() {
            return Err(ModelError::Invalid(format!(
                "application '{}' has no units",
                self.name
            )));
        }
        for (key, unit) in &self.units {
            if key != &unit.name {
                return Err(ModelError::Invalid(format!(
                    "unit keyed as '{key}' is named '{}'",
                    unit.name
                )));
            }
            unit.validate()?;
        }

        let mut ordered = HashSet::new();
        for order in &self.orders {
            for name in &order.names {
                if !self.units.contains_key(name) {
                    return Err(ModelError::Invalid(format!(
                        "order references unknown unit '{name}'"
                    )));
                }
                if !ordered.insert(name.as_str()) {
                    return Err(ModelError::Invalid(format!(
                        "unit '{name}' appears in more than one order"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExecutableSpec, OrderType};

    fn two_units() -> ApplicationSpec {
        ApplicationSpec::new("wordcount")
            .with_unit(RuntimeSpec::new("A", ExecutableSpec::new("app.a")))
            .with_unit(
                RuntimeSpec::new("B", ExecutableSpec::new("app.b")).with_resource(
                    ResourceDescriptor::declared("cfg.yaml", "/tmp/cfg.yaml".parse().unwrap()),
                ),
            )
            .with_order(Order::started(["A"]))
            .with_order(Order::completed(["B"]))
    }

    #[test]
    fn valid_spec_passes() {
        two_units().validate().unwrap();
    }

    #[test]
    fn name_with_slash_is_rejected() {
        let mut spec = two_units();
        spec.name = "a/b".into();
        assert!(spec.validate().is_err());
        spec.name = "..".into();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn unknown_unit_in_order_is_rejected() {
        let spec = two_units().with_order(Order::started(["C"]));
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("'C'"), "{err}");
    }

    #[test]
    fn localized_copy_replaces_only_resources() {
        let spec = two_units();
        let staged = ResourceDescriptor::staged(
            "cfg.yaml",
            "mem:///wordcount/r1/cfg.yaml".parse().unwrap(),
            1,
            120,
        );
        let localized = BTreeMap::from([("B".to_string(), vec![staged.clone()])]);

        let out = spec.with_localized(&localized);

        assert_eq!(out.units["B"].resources, vec![staged]);
        assert!(out.units["A"].resources.is_empty());
        assert_eq!(out.orders, spec.orders);
        assert_eq!(out.orders[1].order_type, OrderType::Completed);
        assert!(out.event_handler.unwrap().is_log_only());
        assert!(spec.event_handler.is_none());
    }
}
