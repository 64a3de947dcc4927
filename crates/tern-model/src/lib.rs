mod domain;
pub use domain::{
    ApplicationId, ENV_APP_DIR, ENV_APP_ID, ENV_APP_NAME, ENV_CONF_DIR, ENV_COORD_CONNECT,
    ENV_FS_USER, ENV_RESERVED_MEMORY_MB, ENV_RUN_ID, LOG_ONLY_EVENT_HANDLER,
};
pub use domain::{Env, KeyValue, Properties, ResourceUri, RunId};

mod error;
pub use error::{ModelError, ModelResult};

mod spec;
pub use spec::{
    ApplicationSpec, EventHandlerSpec, ExecutableSpec, Order, OrderType, ResourceDescriptor,
    ResourceLimits, RuntimeSpec, is_path_segment,
};

mod artifact;
pub use artifact::{ArtifactKey, ArtifactMap};

mod arguments;
pub use arguments::Arguments;

mod credentials;
pub use credentials::{CredentialSet, Token};

pub mod wire;
