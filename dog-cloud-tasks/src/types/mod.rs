pub mod events;
pub mod identity;
pub mod ids;
pub mod task;

pub use events::TaskEvent;
pub use identity::QueueIdentity;
pub use ids::TaskName;
pub use task::{
    AppEngineHttpRequest, AppEngineRouting, Headers, HttpMethod, HttpRequest, OidcToken,
    RequestTarget, Task,
};
