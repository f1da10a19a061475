// Mock collaborators for testing - no side effects

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::shipping_labels::traits::*;
use crate::shipping_labels::types::*;

/// Mock data loader returning preset addresses per order
#[derive(Debug, Default)]
pub struct MockDataLoader {
    pub orders: Mutex<HashMap<String, OrderAddresses>>,
    pub delay: Mutex<Option<Duration>>,
    pub requested_orders: Mutex<Vec<String>>,
}

impl MockDataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(self, order_id: &str, origin: Address, shipping: Address) -> Self {
        self.orders.lock().unwrap().insert(
            order_id.to_string(),
            OrderAddresses {
                origin_address: origin,
                shipping_address: shipping,
            },
        );
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn get_requested_orders(&self) -> Vec<String> {
        self.requested_orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataLoader for MockDataLoader {
    async fn load(&self, order_id: &str) -> Result<OrderAddresses> {
        self.requested_orders
            .lock()
            .unwrap()
            .push(order_id.to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| anyhow!("Order {} not found", order_id))
    }
}

/// Mock validator replaying queued outcomes; `Valid` once the queue is empty.
/// A queued `None` makes the call fail.
#[derive(Debug, Default)]
pub struct MockAddressValidator {
    pub outcomes: Mutex<VecDeque<Option<ValidationResult>>>,
    pub validated: Mutex<Vec<(Address, AddressType)>>,
}

impl MockAddressValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, result: ValidationResult) {
        self.outcomes.lock().unwrap().push_back(Some(result));
    }

    pub fn push_failure(&self) {
        self.outcomes.lock().unwrap().push_back(None);
    }

    pub fn get_validated(&self) -> Vec<(Address, AddressType)> {
        self.validated.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressValidator for MockAddressValidator {
    async fn validate(
        &self,
        address: &Address,
        address_type: AddressType,
    ) -> Result<ValidationResult> {
        self.validated
            .lock()
            .unwrap()
            .push((address.clone(), address_type));

        match self.outcomes.lock().unwrap().pop_front() {
            Some(Some(result)) => Ok(result),
            Some(None) => Err(anyhow!("Address service unavailable")),
            None => Ok(ValidationResult::Valid),
        }
    }
}

/// Sample address builder shared by the unit tests
pub fn sample_address(first_name: &str, city: &str) -> Address {
    Address {
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        address1: "60 29th St".to_string(),
        city: city.to_string(),
        state: "CA".to_string(),
        postcode: "94110".to_string(),
        country: "US".to_string(),
        ..Default::default()
    }
}
