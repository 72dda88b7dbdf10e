//! Demo message set.
//!
//! - `user.created` (typed): `save`, then `welcome_email` (100ms budget)
//! - `order.placed` (validated payload): `charge`, then `ship`; every fifth
//!   order fails to charge

use async_trait::async_trait;
use mcenter_core::ports::validator;
use mcenter_core::{
    Handler, HandlerError, McenterError, Message, MessageCenter, TypeSpec, ValidationError, listener_fn, typed,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreated {
    pub id: u64,
    pub name: String,
}

impl Message for UserCreated {
    const NAME: &'static str = "user.created";
}

pub const ORDER_PLACED: &str = "order.placed";

struct SaveUser;

#[async_trait]
impl Handler<UserCreated> for SaveUser {
    type Output = Value;

    async fn handle(&self, user: UserCreated) -> Result<Value, HandlerError> {
        Ok(json!({ "row": user.id }))
    }
}

struct WelcomeEmail {
    delay: Duration,
}

#[async_trait]
impl Handler<UserCreated> for WelcomeEmail {
    type Output = String;

    async fn handle(&self, user: UserCreated) -> Result<String, HandlerError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("welcome sent to {}", user.name))
    }
}

/// Registers and subscribes the demo messages. The last subscription makes
/// the center ready.
pub fn wire(center: &MessageCenter, delay: Duration) -> Result<(), McenterError> {
    center.register(
        UserCreated::NAME,
        None,
        vec![
            TypeSpec::new("save"),
            TypeSpec::new("welcome_email").timeout_ms(100),
        ],
    )?;
    center.register(
        ORDER_PLACED,
        Some(validator(|v: &Value| match v.get("amount").and_then(Value::as_u64) {
            Some(_) => Ok(()),
            None => Err(ValidationError::new("amount must be a non-negative integer")),
        })),
        vec![
            TypeSpec::new("charge").validator(|v: &Value| {
                if v.get("receipt").is_some() {
                    Ok(())
                } else {
                    Err(ValidationError::new("charge must return a receipt"))
                }
            }),
            TypeSpec::new("ship").timeout(delay / 2),
        ],
    )?;

    center.subscribe(UserCreated::NAME, "save", typed::<UserCreated, _>(SaveUser))?;
    center.subscribe(UserCreated::NAME, "welcome_email", typed::<UserCreated, _>(WelcomeEmail { delay }))?;
    center.subscribe(
        ORDER_PLACED,
        "charge",
        listener_fn(|order| async move {
            let seq = order["seq"].as_u64().unwrap_or_default();
            if seq % 5 == 4 {
                return Err(HandlerError::failed(format!("card declined for order {seq}")));
            }
            Ok(json!({ "receipt": format!("r-{seq}"), "amount": order["amount"] }))
        }),
    )?;
    center.subscribe(
        ORDER_PLACED,
        "ship",
        listener_fn(move |order| async move {
            tokio::time::sleep(delay).await;
            Ok(json!({ "tracking": format!("t-{}", order["seq"]) }))
        }),
    )?;
    Ok(())
}

/// The i-th message of the demo batch.
pub fn payload(i: u64) -> (&'static str, Value) {
    if i % 2 == 0 {
        let user = UserCreated {
            id: i,
            name: format!("user-{i}"),
        };
        (UserCreated::NAME, json!(user))
    } else {
        (ORDER_PLACED, json!({ "seq": i, "amount": 100 + i }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_wiring_makes_the_center_ready() {
        let center = MessageCenter::builder().build().unwrap();
        wire(&center, Duration::from_millis(1)).unwrap();
        assert!(center.check_ready());
        assert!(center.get_unlinked().is_empty());
    }

    #[tokio::test]
    async fn declined_orders_are_recorded_not_raised() {
        let center = MessageCenter::builder().build().unwrap();
        wire(&center, Duration::from_millis(1)).unwrap();

        let result = center
            .publish_and_wait(ORDER_PLACED, json!({ "seq": 4, "amount": 7 }))
            .await
            .unwrap();
        assert!(result["charge"].error.is_some());
        assert!(result["ship"].is_ok());
    }

    #[tokio::test]
    async fn orders_without_amount_are_rejected() {
        let center = MessageCenter::builder().build().unwrap();
        wire(&center, Duration::from_millis(1)).unwrap();

        let err = center.publish(ORDER_PLACED, json!({ "seq": 1 }), None).unwrap_err();
        assert!(matches!(err, McenterError::InvalidPayload { .. }));
    }
}
