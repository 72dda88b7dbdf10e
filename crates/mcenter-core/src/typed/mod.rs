//! Typed - listeners for the dispatcher.
//!
//! # Two layers
//! - **Surface (typed)**: `Message` trait, `Handler<M>` trait - payloads decoded into structs
//! - **Internal (dyn)**: `Listener` trait - object-safe, what the subscription table stores

pub mod handler;
pub mod listener;
pub mod message;

pub use self::handler::{Handler, TypedListener, typed};
pub use self::listener::{FnListener, Listener, listener_fn};
pub use self::message::Message;
