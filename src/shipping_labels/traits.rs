// Collaborator interfaces - the state machine only names them through side effects

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shipping_labels::types::{Address, AddressType, ValidationResult};

/// Addresses loaded for an order when the flow starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAddresses {
    pub origin_address: Address,
    pub shipping_address: Address,
}

/// Loads the order data the label is created for
#[async_trait]
pub trait DataLoader: Send + Sync {
    /// Load the store (origin) and customer (shipping) addresses for an order
    async fn load(&self, order_id: &str) -> Result<OrderAddresses>;
}

/// Validates addresses against the carrier's address service
#[async_trait]
pub trait AddressValidator: Send + Sync {
    /// Validate an address. `Err` means the validation itself could not run.
    async fn validate(&self, address: &Address, address_type: AddressType)
        -> Result<ValidationResult>;
}
