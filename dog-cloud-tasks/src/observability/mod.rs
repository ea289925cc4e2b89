pub mod observer;
pub mod tracing;

pub use observer::{EventBroadcaster, FnObserver, LoggingObserver, TaskObserver};
pub use self::tracing::init_tracing;
