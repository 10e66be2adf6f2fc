pub mod client;
pub mod core;
pub mod registry;
pub mod transport;

pub use crate::client::{VrTranslateClient, VrTranslateClientBuilder};
pub use crate::core::config::SdkConfig;
pub use crate::core::error::{ConfigError, ListenerError, SdkError};
pub use crate::core::traits::{FnListener, MessageListener};
pub use crate::core::types::*;
pub use crate::registry::listeners::{ListenerId, ListenerRegistry};
pub use crate::transport::http::RetryPolicy;
