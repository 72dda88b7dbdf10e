//! Message trait - binds a payload struct to its message name.
//!
//! # Learning points
//! - Associated constant (`const NAME`)
//! - Trait bounds combined (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A typed message payload.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct UserCreated { id: u64 }
///
/// impl Message for UserCreated {
///     const NAME: &'static str = "user.created";
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: &'static str;
}
