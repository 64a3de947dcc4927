use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// When the next group of units may start.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderType {
    /// Next group starts once every unit of this group is running.
    #[default]
    Started,
    /// Next group starts once every unit of this group has completed.
    Completed,
}

impl FromStr for OrderType {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "started" | "" => Ok(OrderType::Started),
            "completed" => Ok(OrderType::Completed),
            other => Err(ModelError::Invalid(format!("unknown order type: {other}"))),
        }
    }
}

/// One step of the startup order: a group of units started together.
///
/// Shutdown happens in reverse order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub names: Vec<String>,
    #[serde(rename = "type", default)]
    pub order_type: OrderType,
}

impl Order {
    pub fn started<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            order_type: OrderType::Started,
        }
    }

    pub fn completed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            order_type: OrderType::Completed,
        }
    }
}
