use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Runtime arguments handed to the application.
///
/// `application` arguments reach every unit; `units` holds extra arguments
/// for a single unit, appended after the application-wide ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arguments {
    #[serde(default)]
    pub application: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub units: BTreeMap<String, Vec<String>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_application<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.application.extend(args.into_iter().map(Into::into));
    }

    pub fn push_unit<I, S>(&mut self, unit: &str, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.units
            .entry(unit.to_string())
            .or_default()
            .extend(args.into_iter().map(Into::into));
    }

    /// Full argument list seen by `unit`.
    pub fn for_unit(&self, unit: &str) -> Vec<String> {
        let mut out = self.application.clone();
        if let Some(extra) = self.units.get(unit) {
            out.extend(extra.iter().cloned());
        }
        out
    }
}
