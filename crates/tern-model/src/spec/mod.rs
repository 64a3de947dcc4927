mod resource;
pub use resource::ResourceDescriptor;

mod runtime;
pub use runtime::{ExecutableSpec, ResourceLimits, RuntimeSpec};

mod order;
pub use order::{Order, OrderType};

mod event_handler;
pub use event_handler::EventHandlerSpec;

mod application;
pub use application::ApplicationSpec;

/// A name usable as a single staging path segment.
pub fn is_path_segment(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}
