use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::shipping_labels::types::{
    Address, AddressType, Event, FlowStep, LabelError, SideEffect, State, WorkflowData,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Error)]
pub enum TransitionError {
    /// The UI and the machine have desynchronized; the flow must be aborted
    #[error("Unexpected event {event} passed from {from}")]
    InvalidTransition { event: Box<Event>, from: Box<State> },
    #[error("Cannot reset from non-terminal state {state}")]
    NotTerminal { state: &'static str },
}

impl TransitionError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, TransitionError::InvalidTransition { .. })
    }
}

/// Audit entry for an accepted transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: State,
    pub to: State,
    pub event: Event,
    pub side_effect: SideEffect,
    pub at: DateTime<Utc>,
}

/// Computes the next state and side effect for `event` received in `state`.
///
/// Pure: no I/O and no access to the machine. `None` means the pair has no
/// defined transition.
pub fn transition(state: &State, event: &Event) -> Option<(State, SideEffect)> {
    let next = match (state, event) {
        (State::Idle, Event::FlowStarted { order_id }) => (
            State::DataLoading,
            SideEffect::LoadData {
                order_id: order_id.clone(),
            },
        ),

        (State::DataLoading, Event::DataLoaded { origin_address, shipping_address }) => {
            waiting_for_input(WorkflowData::new(
                origin_address.clone(),
                shipping_address.clone(),
            ))
        }
        (State::DataLoading, Event::DataLoadingFailed) => (
            State::DataLoadingFailure,
            SideEffect::ShowError {
                error: LabelError::DataLoadingError,
            },
        ),

        (State::WaitingForInput(data), event) => return from_waiting_for_input(data, event),

        (State::OriginAddressValidation(data), Event::AddressValidated { address })
        | (State::OriginAddressSuggestion(data), Event::SuggestedAddressSelected { address })
        | (State::OriginAddressEditing(data), Event::AddressValidated { address }) => {
            waiting_for_input(data.with_origin_address(address.clone()))
        }
        (State::ShippingAddressValidation(data), Event::AddressValidated { address })
        | (State::ShippingAddressSuggestion(data), Event::SuggestedAddressSelected { address })
        | (State::ShippingAddressEditing(data), Event::AddressValidated { address }) => {
            waiting_for_input(data.with_shipping_address(address.clone()))
        }

        (State::OriginAddressValidation(data), Event::AddressChangeSuggested { suggested }) => (
            State::OriginAddressSuggestion(data.clone()),
            suggestion(data, suggested, AddressType::Origin),
        ),
        (State::ShippingAddressValidation(data), Event::AddressChangeSuggested { suggested }) => (
            State::ShippingAddressSuggestion(data.clone()),
            suggestion(data, suggested, AddressType::Destination),
        ),

        (
            State::OriginAddressValidation(data),
            Event::AddressInvalid { validation_result, .. },
        ) => (
            State::OriginAddressEditing(data.clone()),
            SideEffect::OpenAddressEditor {
                address: data.address(AddressType::Origin).clone(),
                address_type: AddressType::Origin,
                validation_result: Some(validation_result.clone()),
            },
        ),
        (
            State::ShippingAddressValidation(data),
            Event::AddressInvalid { validation_result, .. },
        ) => (
            State::ShippingAddressEditing(data.clone()),
            SideEffect::OpenAddressEditor {
                address: data.address(AddressType::Destination).clone(),
                address_type: AddressType::Destination,
                validation_result: Some(validation_result.clone()),
            },
        ),

        (State::OriginAddressValidation(_), Event::AddressValidationFailed) => (
            State::OriginAddressValidationFailure,
            SideEffect::ShowError {
                error: LabelError::AddressValidationError,
            },
        ),
        (State::ShippingAddressValidation(_), Event::AddressValidationFailed) => (
            State::ShippingAddressValidationFailure,
            SideEffect::ShowError {
                error: LabelError::AddressValidationError,
            },
        ),

        (State::OriginAddressSuggestion(data), Event::EditOriginAddressRequested) => {
            edit_address(data, AddressType::Origin)
        }
        (State::ShippingAddressSuggestion(data), Event::EditShippingAddressRequested) => {
            edit_address(data, AddressType::Destination)
        }

        (State::OriginAddressEditing(data), Event::AddressEditCanceled)
        | (State::ShippingAddressEditing(data), Event::AddressEditCanceled) => {
            waiting_for_input(data.clone())
        }

        (State::PackageSelection(data), Event::PackagesSelected) => {
            waiting_for_input(data.with_step(FlowStep::Customs))
        }
        (State::CustomsDeclaration(data), Event::CustomsFormFilledOut) => {
            waiting_for_input(data.with_step(FlowStep::Carrier))
        }
        (State::ShippingCarrierSelection(data), Event::ShippingCarrierSelected) => {
            waiting_for_input(data.with_step(FlowStep::Payment))
        }
        (State::PaymentSelection(data), Event::PaymentSelected) => {
            waiting_for_input(data.with_step(FlowStep::Done))
        }

        _ => return None,
    };
    Some(next)
}

fn from_waiting_for_input(data: &WorkflowData, event: &Event) -> Option<(State, SideEffect)> {
    let next = match event {
        Event::OriginAddressValidationStarted => (
            State::OriginAddressValidation(data.clone()),
            SideEffect::ValidateAddress {
                address: data.origin_address.clone(),
                address_type: AddressType::Origin,
            },
        ),
        Event::ShippingAddressValidationStarted => (
            State::ShippingAddressValidation(data.clone()),
            SideEffect::ValidateAddress {
                address: data.shipping_address.clone(),
                address_type: AddressType::Destination,
            },
        ),
        Event::EditOriginAddressRequested => edit_address(data, AddressType::Origin),
        Event::EditShippingAddressRequested => edit_address(data, AddressType::Destination),
        Event::PackageSelectionStarted | Event::EditPackagingRequested => (
            State::PackageSelection(data.clone()),
            SideEffect::ShowPackageOptions,
        ),
        Event::CustomsDeclarationStarted | Event::EditCustomsRequested => (
            State::CustomsDeclaration(data.clone()),
            SideEffect::ShowCustomsForm,
        ),
        Event::ShippingCarrierSelectionStarted | Event::EditShippingCarrierRequested => (
            State::ShippingCarrierSelection(data.clone()),
            SideEffect::ShowCarrierOptions,
        ),
        Event::PaymentSelectionStarted | Event::EditPaymentRequested => (
            State::PaymentSelection(data.clone()),
            SideEffect::ShowPaymentDetails,
        ),
        _ => return None,
    };
    Some(next)
}

fn waiting_for_input(data: WorkflowData) -> (State, SideEffect) {
    (
        State::WaitingForInput(data.clone()),
        SideEffect::UpdateViewState { data },
    )
}

fn edit_address(data: &WorkflowData, address_type: AddressType) -> (State, SideEffect) {
    let state = match address_type {
        AddressType::Origin => State::OriginAddressEditing(data.clone()),
        AddressType::Destination => State::ShippingAddressEditing(data.clone()),
    };
    let effect = SideEffect::OpenAddressEditor {
        address: data.address(address_type).clone(),
        address_type,
        validation_result: None,
    };
    (state, effect)
}

fn suggestion(
    data: &WorkflowData,
    suggested: &Address,
    address_type: AddressType,
) -> SideEffect {
    SideEffect::ShowAddressSuggestion {
        entered: data.address(address_type).clone(),
        suggested: suggested.clone(),
        address_type,
    }
}

/// The finite-state machine that manages the shipping label creation
/// workflow.
///
/// Transitions are computed by [`transition`]; the machine keeps the current
/// state, publishes every emitted side effect to a single latest-value slot
/// and records an audit trail. It performs no work itself: the observer of
/// [`WorkflowStateMachine::effects`] executes the side effects and feeds the
/// results back through [`WorkflowStateMachine::handle_event`].
///
/// Calls must be serialized by the owner; the machine has no internal
/// synchronization.
#[derive(Debug)]
pub struct WorkflowStateMachine {
    state: State,
    effects: watch::Sender<SideEffect>,
    history: VecDeque<TransitionRecord>,
    history_limit: usize,
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowStateMachine {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        let (effects, _) = watch::channel(SideEffect::NoOp);
        Self {
            state: State::Idle,
            effects,
            history: VecDeque::new(),
            history_limit,
        }
    }

    /// Machine seeded in an arbitrary state, for exercising the transition table
    #[cfg(test)]
    pub(crate) fn with_state(state: State) -> Self {
        Self {
            state,
            ..Self::new()
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Subscribe to the side-effect slot. New subscribers see the latest value.
    pub fn effects(&self) -> watch::Receiver<SideEffect> {
        self.effects.subscribe()
    }

    pub fn latest_effect(&self) -> SideEffect {
        self.effects.borrow().clone()
    }

    pub fn history(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.history.iter()
    }

    /// Starts the initial event sequence. Only valid from `Idle`.
    pub fn start(&mut self, order_id: impl Into<String>) -> Result<SideEffect, TransitionError> {
        self.handle_event(Event::FlowStarted {
            order_id: order_id.into(),
        })
    }

    /// Incoming external event that triggers a transition (such as user input)
    pub fn handle_event(&mut self, event: Event) -> Result<SideEffect, TransitionError> {
        debug!(event = %event, state = %self.state, "Handling shipping label event");

        let Some((next, side_effect)) = transition(&self.state, &event) else {
            error!(
                event = %event,
                from = %self.state,
                "Unexpected event for current shipping label state"
            );
            return Err(TransitionError::InvalidTransition {
                event: Box::new(event),
                from: Box::new(self.state.clone()),
            });
        };

        if next.is_terminal_failure() {
            warn!(from = %self.state, to = %next, event = %event, "Shipping label flow failed");
        } else {
            info!(
                from = %self.state,
                to = %next,
                event = %event,
                side_effect = side_effect.name(),
                "Shipping label state transition"
            );
        }

        let from = std::mem::replace(&mut self.state, next);
        self.record(from, event, side_effect.clone());
        self.effects.send_replace(side_effect.clone());
        Ok(side_effect)
    }

    /// Returns a failed flow to `Idle` so it can be started again.
    ///
    /// Subscribers are kept; they observe `NoOp`. History is cleared.
    pub fn reset(&mut self) -> Result<(), TransitionError> {
        if !self.state.is_terminal_failure() {
            return Err(TransitionError::NotTerminal {
                state: self.state.name(),
            });
        }
        info!(from = %self.state, "Resetting shipping label flow");
        self.state = State::Idle;
        self.history.clear();
        self.effects.send_replace(SideEffect::NoOp);
        Ok(())
    }

    fn record(&mut self, from: State, event: Event, side_effect: SideEffect) {
        if self.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(TransitionRecord {
            from,
            to: self.state.clone(),
            event,
            side_effect,
            at: Utc::now(),
        });
    }
}
