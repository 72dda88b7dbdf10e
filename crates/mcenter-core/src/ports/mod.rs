//! Ports - interfaces to the collaborators the center depends on.
//!
//! The store, the process lifecycle hook, the id source, the clock and the
//! validators are all injected through these traits at the composition root
//! ([`MessageCenterBuilder`](crate::app::MessageCenterBuilder)).

pub mod clock;
pub mod id_generator;
pub mod shutdown;
pub mod store;
pub mod validator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator, UuidGenerator};
pub use self::shutdown::{ShutdownHandler, ShutdownRegistrar};
pub use self::store::{StoreClient, StoreError};
pub use self::validator::{Validator, validator};
