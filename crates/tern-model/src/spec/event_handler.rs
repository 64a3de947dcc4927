use serde::{Deserialize, Serialize};

use crate::{LOG_ONLY_EVENT_HANDLER, Properties};

/// Handler the master invokes on lifecycle events (e.g. a unit exceeding its failure budget).
///
/// The handler runs inside the master, so its artifact is part of the master bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHandlerSpec {
    /// Id of the code artifact implementing the handler.
    pub entry_point: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl EventHandlerSpec {
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            properties: Properties::new(),
        }
    }

    /// Handler that only logs events. Built into the master runtime.
    pub fn log_only() -> Self {
        Self::new(LOG_ONLY_EVENT_HANDLER)
    }

    pub fn is_log_only(&self) -> bool {
        self.entry_point == LOG_ONLY_EVENT_HANDLER
    }
}
