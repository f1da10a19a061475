// Scripted label creation sessions driven from JSON files

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use crate::config::WorkflowConfig;
use crate::shipping_labels::{
    Address, AddressType, AddressValidator, DataLoader, Event, OrderAddresses,
    ShippingLabelWorkflow, SideEffect, State, TransitionError, TransitionRecord,
    ValidationResult,
};

/// What the scripted validator answers for one validation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScriptedValidation {
    Valid,
    Suggest { suggested: Address },
    Invalid { message: String },
    NotFound { message: String },
    /// The validation service could not be reached
    Unavailable,
}

impl ScriptedValidation {
    fn into_result(self) -> Result<ValidationResult> {
        match self {
            ScriptedValidation::Valid => Ok(ValidationResult::Valid),
            ScriptedValidation::Suggest { suggested } => {
                Ok(ValidationResult::SuggestedChanges { suggested })
            }
            ScriptedValidation::Invalid { message } => Ok(ValidationResult::Invalid { message }),
            ScriptedValidation::NotFound { message } => Ok(ValidationResult::NotFound { message }),
            ScriptedValidation::Unavailable => {
                Err(anyhow!("Address validation service unavailable"))
            }
        }
    }
}

/// A complete session: the order data, the collaborator answers and the
/// user events in the order they happen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub order_id: String,
    pub origin_address: Address,
    pub shipping_address: Address,
    #[serde(default)]
    pub load_fails: bool,
    #[serde(default)]
    pub origin_validation: Vec<ScriptedValidation>,
    #[serde(default)]
    pub destination_validation: Vec<ScriptedValidation>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }
}

/// Data loader serving the single order of a scenario
#[derive(Debug)]
pub struct ScriptedDataLoader {
    order_id: String,
    addresses: Option<OrderAddresses>,
}

impl ScriptedDataLoader {
    pub fn new(order_id: &str, addresses: Option<OrderAddresses>) -> Self {
        Self {
            order_id: order_id.to_string(),
            addresses,
        }
    }
}

#[async_trait]
impl DataLoader for ScriptedDataLoader {
    async fn load(&self, order_id: &str) -> Result<OrderAddresses> {
        if order_id != self.order_id {
            return Err(anyhow!("Unknown order {}", order_id));
        }
        self.addresses
            .clone()
            .ok_or_else(|| anyhow!("Order {} could not be loaded", order_id))
    }
}

/// Validator answering from per-address-type queues, `Valid` once exhausted
#[derive(Debug, Default)]
pub struct ScriptedAddressValidator {
    origin: Mutex<VecDeque<ScriptedValidation>>,
    destination: Mutex<VecDeque<ScriptedValidation>>,
}

impl ScriptedAddressValidator {
    pub fn new(origin: Vec<ScriptedValidation>, destination: Vec<ScriptedValidation>) -> Self {
        Self {
            origin: Mutex::new(origin.into()),
            destination: Mutex::new(destination.into()),
        }
    }
}

#[async_trait]
impl AddressValidator for ScriptedAddressValidator {
    async fn validate(
        &self,
        _address: &Address,
        address_type: AddressType,
    ) -> Result<ValidationResult> {
        let queue = match address_type {
            AddressType::Origin => &self.origin,
            AddressType::Destination => &self.destination,
        };
        let next = queue
            .lock()
            .map_err(|_| anyhow!("Scripted validator queue poisoned"))?
            .pop_front()
            .unwrap_or(ScriptedValidation::Valid);
        next.into_result()
    }
}

/// Everything the UI would have seen during a scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub effects: Vec<SideEffect>,
    pub final_state: State,
    pub history: Vec<TransitionRecord>,
}

/// Run a scenario to completion.
///
/// Stops at the first event the machine rejects; that is a scripting error,
/// not a flow outcome.
pub async fn run_scenario(
    scenario: Scenario,
    config: &WorkflowConfig,
) -> Result<ScenarioReport, TransitionError> {
    let addresses = (!scenario.load_fails).then(|| OrderAddresses {
        origin_address: scenario.origin_address.clone(),
        shipping_address: scenario.shipping_address.clone(),
    });
    let loader = ScriptedDataLoader::new(&scenario.order_id, addresses);
    let validator =
        ScriptedAddressValidator::new(scenario.origin_validation, scenario.destination_validation);
    let mut workflow = ShippingLabelWorkflow::with_config(loader, validator, config);

    let mut effects = vec![workflow.start(&scenario.order_id).await?];
    for event in scenario.events {
        effects.push(workflow.handle_event(event).await?);
    }

    Ok(ScenarioReport {
        effects,
        final_state: workflow.state().clone(),
        history: workflow.machine().history().cloned().collect(),
    })
}
