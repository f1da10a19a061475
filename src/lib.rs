// Shipping Labels Library - Label Creation Workflow Engine
// This exposes the core components for testing and integration

pub mod shipping_labels;
pub mod scenario;
pub mod telemetry;
pub mod config;

// Re-export key types for easy access
pub use shipping_labels::{
    Address, AddressType, AddressValidator, DataLoader, Event, FlowStep, LabelError,
    OrderAddresses, ShippingLabelWorkflow, SideEffect, State, TransitionError,
    TransitionRecord, ValidationResult, WorkflowData, WorkflowStateMachine,
};
pub use scenario::{run_scenario, Scenario, ScenarioReport, ScriptedValidation};
pub use telemetry::{init_telemetry, generate_session_id, create_workflow_span};
pub use crate::config::{ShippingLabelsConfig, WorkflowConfig};
