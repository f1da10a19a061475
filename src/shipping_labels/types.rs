// Core types for the shipping label creation state machine

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Structured postal address used for both the origin and the destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub company: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
}

impl Address {
    /// Full name of the recipient/sender, empty if neither part is set
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            self.full_name(),
            self.company.clone(),
            self.address1.clone(),
            self.address2.clone(),
            self.city.clone(),
            format!("{} {}", self.state, self.postcode).trim().to_string(),
            self.country.clone(),
        ];
        let line = parts
            .iter()
            .filter(|p| !p.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{line}")
    }
}

/// Which of the two label addresses an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Origin,
    Destination,
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressType::Origin => write!(f, "origin"),
            AddressType::Destination => write!(f, "destination"),
        }
    }
}

/// Outcome reported by an address validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationResult {
    /// Address is deliverable as entered
    Valid,
    /// Address is deliverable but the validator proposes a normalized form
    SuggestedChanges { suggested: Address },
    /// Address is malformed
    Invalid { message: String },
    /// Address is well-formed but could not be located
    NotFound { message: String },
}

/// The main shipping label creation steps.
///
/// Ordered the way the user progresses through the form; the derived `Ord`
/// keeps `flow_steps` iteration deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowStep {
    OriginAddress,
    ShippingAddress,
    Packaging,
    Customs,
    Carrier,
    Payment,
    Done,
}

/// Data passed around between states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowData {
    pub origin_address: Address,
    pub shipping_address: Address,
    pub flow_steps: BTreeSet<FlowStep>,
}

impl WorkflowData {
    /// Fresh data right after loading: only the origin step is unlocked
    pub fn new(origin_address: Address, shipping_address: Address) -> Self {
        Self {
            origin_address,
            shipping_address,
            flow_steps: BTreeSet::from([FlowStep::OriginAddress]),
        }
    }

    /// Copy with `step` marked complete; existing steps are never removed
    pub fn with_step(&self, step: FlowStep) -> Self {
        let mut flow_steps = self.flow_steps.clone();
        flow_steps.insert(step);
        Self {
            flow_steps,
            ..self.clone()
        }
    }

    pub fn with_origin_address(&self, address: Address) -> Self {
        Self {
            origin_address: address,
            ..self.with_step(FlowStep::ShippingAddress)
        }
    }

    pub fn with_shipping_address(&self, address: Address) -> Self {
        Self {
            shipping_address: address,
            ..self.with_step(FlowStep::Packaging)
        }
    }

    pub fn address(&self, address_type: AddressType) -> &Address {
        match address_type {
            AddressType::Origin => &self.origin_address,
            AddressType::Destination => &self.shipping_address,
        }
    }

    pub fn is_step_done(&self, step: FlowStep) -> bool {
        self.flow_steps.contains(&step)
    }
}

/// Error kinds surfaced to the UI through `SideEffect::ShowError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelError {
    DataLoadingError,
    AddressValidationError,
}

/// Shipping label creation states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum State {
    Idle,
    DataLoading,
    DataLoadingFailure,
    WaitingForInput(WorkflowData),

    OriginAddressValidation(WorkflowData),
    OriginAddressSuggestion(WorkflowData),
    OriginAddressEditing(WorkflowData),
    OriginAddressValidationFailure,

    ShippingAddressValidation(WorkflowData),
    ShippingAddressSuggestion(WorkflowData),
    ShippingAddressEditing(WorkflowData),
    ShippingAddressValidationFailure,

    PackageSelection(WorkflowData),
    CustomsDeclaration(WorkflowData),
    ShippingCarrierSelection(WorkflowData),
    PaymentSelection(WorkflowData),
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            State::Idle => "Idle",
            State::DataLoading => "DataLoading",
            State::DataLoadingFailure => "DataLoadingFailure",
            State::WaitingForInput(_) => "WaitingForInput",
            State::OriginAddressValidation(_) => "OriginAddressValidation",
            State::OriginAddressSuggestion(_) => "OriginAddressSuggestion",
            State::OriginAddressEditing(_) => "OriginAddressEditing",
            State::OriginAddressValidationFailure => "OriginAddressValidationFailure",
            State::ShippingAddressValidation(_) => "ShippingAddressValidation",
            State::ShippingAddressSuggestion(_) => "ShippingAddressSuggestion",
            State::ShippingAddressEditing(_) => "ShippingAddressEditing",
            State::ShippingAddressValidationFailure => "ShippingAddressValidationFailure",
            State::PackageSelection(_) => "PackageSelection",
            State::CustomsDeclaration(_) => "CustomsDeclaration",
            State::ShippingCarrierSelection(_) => "ShippingCarrierSelection",
            State::PaymentSelection(_) => "PaymentSelection",
        }
    }

    /// Workflow data owned by the state, if it carries any
    pub fn data(&self) -> Option<&WorkflowData> {
        match self {
            State::WaitingForInput(data)
            | State::OriginAddressValidation(data)
            | State::OriginAddressSuggestion(data)
            | State::OriginAddressEditing(data)
            | State::ShippingAddressValidation(data)
            | State::ShippingAddressSuggestion(data)
            | State::ShippingAddressEditing(data)
            | State::PackageSelection(data)
            | State::CustomsDeclaration(data)
            | State::ShippingCarrierSelection(data)
            | State::PaymentSelection(data) => Some(data),
            State::Idle
            | State::DataLoading
            | State::DataLoadingFailure
            | State::OriginAddressValidationFailure
            | State::ShippingAddressValidationFailure => None,
        }
    }

    /// Failure states have no outgoing transitions; only a reset leaves them
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            State::DataLoadingFailure
                | State::OriginAddressValidationFailure
                | State::ShippingAddressValidationFailure
        )
    }

    pub fn is_waiting_for_input(&self) -> bool {
        matches!(self, State::WaitingForInput(_))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Incoming triggers, from the user or from the collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    FlowStarted { order_id: String },
    DataLoaded { origin_address: Address, shipping_address: Address },
    DataLoadingFailed,

    AddressInvalid { address: Address, validation_result: ValidationResult },
    AddressValidated { address: Address },
    AddressChangeSuggested { suggested: Address },
    SuggestedAddressSelected { address: Address },
    AddressValidationFailed,
    AddressEditCanceled,

    OriginAddressValidationStarted,
    EditOriginAddressRequested,

    ShippingAddressValidationStarted,
    EditShippingAddressRequested,

    PackageSelectionStarted,
    EditPackagingRequested,
    PackagesSelected,

    CustomsDeclarationStarted,
    EditCustomsRequested,
    CustomsFormFilledOut,

    ShippingCarrierSelectionStarted,
    EditShippingCarrierRequested,
    ShippingCarrierSelected,

    PaymentSelectionStarted,
    EditPaymentRequested,
    PaymentSelected,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::FlowStarted { .. } => "FlowStarted",
            Event::DataLoaded { .. } => "DataLoaded",
            Event::DataLoadingFailed => "DataLoadingFailed",
            Event::AddressInvalid { .. } => "AddressInvalid",
            Event::AddressValidated { .. } => "AddressValidated",
            Event::AddressChangeSuggested { .. } => "AddressChangeSuggested",
            Event::SuggestedAddressSelected { .. } => "SuggestedAddressSelected",
            Event::AddressValidationFailed => "AddressValidationFailed",
            Event::AddressEditCanceled => "AddressEditCanceled",
            Event::OriginAddressValidationStarted => "OriginAddressValidationStarted",
            Event::EditOriginAddressRequested => "EditOriginAddressRequested",
            Event::ShippingAddressValidationStarted => "ShippingAddressValidationStarted",
            Event::EditShippingAddressRequested => "EditShippingAddressRequested",
            Event::PackageSelectionStarted => "PackageSelectionStarted",
            Event::EditPackagingRequested => "EditPackagingRequested",
            Event::PackagesSelected => "PackagesSelected",
            Event::CustomsDeclarationStarted => "CustomsDeclarationStarted",
            Event::EditCustomsRequested => "EditCustomsRequested",
            Event::CustomsFormFilledOut => "CustomsFormFilledOut",
            Event::ShippingCarrierSelectionStarted => "ShippingCarrierSelectionStarted",
            Event::EditShippingCarrierRequested => "EditShippingCarrierRequested",
            Event::ShippingCarrierSelected => "ShippingCarrierSelected",
            Event::PaymentSelectionStarted => "PaymentSelectionStarted",
            Event::EditPaymentRequested => "EditPaymentRequested",
            Event::PaymentSelected => "PaymentSelected",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instructions for the observer; the machine itself never performs them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    NoOp,
    LoadData { order_id: String },
    ShowError { error: LabelError },
    UpdateViewState { data: WorkflowData },

    ValidateAddress { address: Address, address_type: AddressType },
    ShowAddressSuggestion {
        entered: Address,
        suggested: Address,
        address_type: AddressType,
    },
    OpenAddressEditor {
        address: Address,
        address_type: AddressType,
        validation_result: Option<ValidationResult>,
    },

    ShowPackageOptions,
    ShowCustomsForm,
    ShowCarrierOptions,
    ShowPaymentDetails,
}

impl SideEffect {
    pub fn name(&self) -> &'static str {
        match self {
            SideEffect::NoOp => "NoOp",
            SideEffect::LoadData { .. } => "LoadData",
            SideEffect::ShowError { .. } => "ShowError",
            SideEffect::UpdateViewState { .. } => "UpdateViewState",
            SideEffect::ValidateAddress { .. } => "ValidateAddress",
            SideEffect::ShowAddressSuggestion { .. } => "ShowAddressSuggestion",
            SideEffect::OpenAddressEditor { .. } => "OpenAddressEditor",
            SideEffect::ShowPackageOptions => "ShowPackageOptions",
            SideEffect::ShowCustomsForm => "ShowCustomsForm",
            SideEffect::ShowCarrierOptions => "ShowCarrierOptions",
            SideEffect::ShowPaymentDetails => "ShowPaymentDetails",
        }
    }

    /// Effects that need a collaborator call rather than a UI update
    pub fn requires_collaborator(&self) -> bool {
        matches!(
            self,
            SideEffect::LoadData { .. } | SideEffect::ValidateAddress { .. }
        )
    }
}
