// Effect-execution shell around the shipping label state machine

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{info, warn, Instrument};

use crate::config::WorkflowConfig;
use crate::shipping_labels::state_machine::{TransitionError, WorkflowStateMachine};
use crate::shipping_labels::traits::{AddressValidator, DataLoader};
use crate::shipping_labels::types::{
    Address, AddressType, Event, SideEffect, State, ValidationResult,
};
use crate::telemetry::{create_workflow_span, generate_session_id};

/// Maps a validator outcome onto the event the state machine expects
pub fn validation_event(address: &Address, result: ValidationResult) -> Event {
    match result {
        ValidationResult::Valid => Event::AddressValidated {
            address: address.clone(),
        },
        ValidationResult::SuggestedChanges { suggested } => {
            Event::AddressChangeSuggested { suggested }
        }
        invalid @ (ValidationResult::Invalid { .. } | ValidationResult::NotFound { .. }) => {
            Event::AddressInvalid {
                address: address.clone(),
                validation_result: invalid,
            }
        }
    }
}

/// Owns one state machine for one label creation session and executes the
/// collaborator side effects (`LoadData`, `ValidateAddress`) it emits.
///
/// Collaborator results are fed back as events until the machine emits an
/// effect meant for the UI, which is returned to the caller. The UI effects
/// are also visible through [`ShippingLabelWorkflow::effects`].
pub struct ShippingLabelWorkflow<L: DataLoader, V: AddressValidator> {
    machine: WorkflowStateMachine,
    loader: L,
    validator: V,
    collaborator_timeout_ms: u64,
    session_id: String,
    order_id: Option<String>,
}

impl<L: DataLoader, V: AddressValidator> ShippingLabelWorkflow<L, V> {
    pub fn new(loader: L, validator: V) -> Self {
        Self::with_config(loader, validator, &WorkflowConfig::default())
    }

    pub fn with_config(loader: L, validator: V, config: &WorkflowConfig) -> Self {
        Self {
            machine: WorkflowStateMachine::with_history_limit(config.history_limit),
            loader,
            validator,
            collaborator_timeout_ms: config.collaborator_timeout_ms,
            session_id: generate_session_id(),
            order_id: None,
        }
    }

    pub fn machine(&self) -> &WorkflowStateMachine {
        &self.machine
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    pub fn state(&self) -> &State {
        self.machine.state()
    }

    pub fn effects(&self) -> watch::Receiver<SideEffect> {
        self.machine.effects()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    /// Start the flow for `order_id` and load its data
    pub async fn start(&mut self, order_id: &str) -> Result<SideEffect, TransitionError> {
        let effect = self.machine.start(order_id)?;
        self.order_id = Some(order_id.to_string());
        let span = create_workflow_span("start", Some(order_id), &self.session_id);
        self.drive(effect).instrument(span).await
    }

    /// Feed a user event and run any collaborator work it triggers
    pub async fn handle_event(&mut self, event: Event) -> Result<SideEffect, TransitionError> {
        let span = create_workflow_span(event.name(), self.order_id.as_deref(), &self.session_id);
        let effect = span.in_scope(|| self.machine.handle_event(event))?;
        self.drive(effect).instrument(span).await
    }

    /// Start over after the flow ended in a failure state
    pub async fn restart(&mut self, order_id: &str) -> Result<SideEffect, TransitionError> {
        self.machine.reset()?;
        info!(
            session_id = %self.session_id,
            order_id = %order_id,
            "Restarting shipping label flow"
        );
        self.start(order_id).await
    }

    async fn drive(&mut self, mut effect: SideEffect) -> Result<SideEffect, TransitionError> {
        while let Some(event) = self.execute(&effect).await {
            effect = self.machine.handle_event(event)?;
        }
        Ok(effect)
    }

    async fn execute(&self, effect: &SideEffect) -> Option<Event> {
        if !effect.requires_collaborator() {
            return None;
        }
        match effect {
            SideEffect::LoadData { order_id } => Some(self.load_data(order_id).await),
            SideEffect::ValidateAddress {
                address,
                address_type,
            } => Some(self.validate_address(address, *address_type).await),
            _ => None,
        }
    }

    fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    async fn load_data(&self, order_id: &str) -> Event {
        match timeout(self.collaborator_timeout(), self.loader.load(order_id)).await {
            Ok(Ok(addresses)) => Event::DataLoaded {
                origin_address: addresses.origin_address,
                shipping_address: addresses.shipping_address,
            },
            Ok(Err(e)) => {
                warn!(order_id = %order_id, error = %e, "Loading shipping label data failed");
                Event::DataLoadingFailed
            }
            Err(_) => {
                warn!(
                    order_id = %order_id,
                    timeout_ms = self.collaborator_timeout_ms,
                    "Loading shipping label data timed out"
                );
                Event::DataLoadingFailed
            }
        }
    }

    async fn validate_address(&self, address: &Address, address_type: AddressType) -> Event {
        match timeout(
            self.collaborator_timeout(),
            self.validator.validate(address, address_type),
        )
        .await
        {
            Ok(Ok(result)) => validation_event(address, result),
            Ok(Err(e)) => {
                warn!(address_type = %address_type, error = %e, "Address validation failed");
                Event::AddressValidationFailed
            }
            Err(_) => {
                warn!(
                    address_type = %address_type,
                    timeout_ms = self.collaborator_timeout_ms,
                    "Address validation timed out"
                );
                Event::AddressValidationFailed
            }
        }
    }
}
