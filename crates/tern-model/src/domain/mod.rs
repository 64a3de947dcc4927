mod kv;
pub use kv::KeyValue;

mod env;
pub use env::Env;

mod properties;
pub use properties::Properties;

mod uri;
pub use uri::ResourceUri;

mod ids;
pub use ids::{ApplicationId, RunId};

mod constants;
pub use constants::{
    ENV_APP_DIR, ENV_APP_ID, ENV_APP_NAME, ENV_CONF_DIR, ENV_COORD_CONNECT, ENV_FS_USER,
    ENV_RESERVED_MEMORY_MB, ENV_RUN_ID, LOG_ONLY_EVENT_HANDLER,
};
