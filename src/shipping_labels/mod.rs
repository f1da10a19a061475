// Shipping Label Creation Module - Testable State Machine
//
// Deterministic transition core with the collaborator work (data loading,
// address validation) expressed as side effects and executed by a thin shell.

pub mod types;
pub mod traits;
pub mod state_machine;
pub mod executor;

#[cfg(test)]
pub mod mocks;


pub use types::{
    Address, AddressType, Event, FlowStep, LabelError, SideEffect, State, ValidationResult,
    WorkflowData,
};
pub use traits::{AddressValidator, DataLoader, OrderAddresses};
pub use state_machine::{transition, TransitionError, TransitionRecord, WorkflowStateMachine};
pub use executor::{validation_event, ShippingLabelWorkflow};
