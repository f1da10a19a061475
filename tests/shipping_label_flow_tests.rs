//! Shipping label creation flow tests
//!
//! These tests drive complete label creation sessions from the scenario
//! files in `tests/scenarios` and through the public workflow API.
//!
//! Test coverage:
//! - Full flow from data loading to payment with a suggested destination
//! - Invalid origin address, editor cancel and re-entry
//! - Validation service outage ending in a terminal failure and restart
//! - Effect slot observation from a separate task

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_test::{assert_err, assert_ok};

use shipping_labels::{
    run_scenario, Address, AddressType, AddressValidator, DataLoader, Event, FlowStep,
    LabelError, OrderAddresses, Scenario, ShippingLabelWorkflow, SideEffect, State,
    ValidationResult, WorkflowConfig,
};

fn scenario(name: &str) -> Scenario {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("scenarios")
        .join(name);
    Scenario::from_file(path).expect("scenario should parse")
}

#[tokio::test]
async fn test_happy_path_scenario_completes_every_step() {
    let s = scenario("happy_path.json");
    let entered_shipping = s.shipping_address.clone();
    let report = run_scenario(s, &WorkflowConfig::default()).await.unwrap();

    assert_eq!(report.effects.len(), 12);
    match &report.effects[2] {
        SideEffect::ShowAddressSuggestion {
            entered,
            suggested,
            address_type,
        } => {
            assert_eq!(entered, &entered_shipping);
            assert_eq!(suggested.postcode, "20500-0003");
            assert_eq!(*address_type, AddressType::Destination);
        }
        other => panic!("expected address suggestion, got {:?}", other),
    }

    let data = report.final_state.data().expect("waiting for input");
    assert!(report.final_state.is_waiting_for_input());
    assert_eq!(data.shipping_address.postcode, "20500-0003");
    assert_eq!(
        data.flow_steps.iter().copied().collect::<Vec<_>>(),
        vec![
            FlowStep::OriginAddress,
            FlowStep::ShippingAddress,
            FlowStep::Packaging,
            FlowStep::Customs,
            FlowStep::Carrier,
            FlowStep::Payment,
            FlowStep::Done,
        ]
    );
    assert_eq!(
        report.effects.last(),
        Some(&SideEffect::UpdateViewState { data: data.clone() })
    );
}

#[tokio::test]
async fn test_invalid_origin_scenario_edits_and_recovers() {
    let s = scenario("invalid_origin.json");
    let entered_origin = s.origin_address.clone();
    let report = run_scenario(s, &WorkflowConfig::default()).await.unwrap();

    assert_eq!(
        report.effects[1],
        SideEffect::OpenAddressEditor {
            address: entered_origin.clone(),
            address_type: AddressType::Origin,
            validation_result: Some(ValidationResult::Invalid {
                message: "Street suffix missing".to_string()
            }),
        }
    );
    // cancel leaves the loaded data untouched
    assert_eq!(report.effects[2], report.effects[0]);
    assert_eq!(
        report.effects[3],
        SideEffect::OpenAddressEditor {
            address: entered_origin,
            address_type: AddressType::Origin,
            validation_result: None,
        }
    );

    let data = report.final_state.data().unwrap();
    assert_eq!(data.origin_address.address1, "60 29th St");
    assert!(data.is_step_done(FlowStep::ShippingAddress));
    assert!(!data.is_step_done(FlowStep::Packaging));
}

#[tokio::test]
async fn test_validation_outage_scenario_ends_in_failure() {
    let report = run_scenario(scenario("validation_outage.json"), &WorkflowConfig::default())
        .await
        .unwrap();

    assert_eq!(report.final_state, State::OriginAddressValidationFailure);
    assert_eq!(
        report.effects.last(),
        Some(&SideEffect::ShowError {
            error: LabelError::AddressValidationError
        })
    );
    let names: Vec<_> = report.history.iter().map(|r| r.to.name()).collect();
    assert_eq!(
        names,
        vec![
            "DataLoading",
            "WaitingForInput",
            "OriginAddressValidation",
            "OriginAddressValidationFailure"
        ]
    );
}

struct FlakyLoader {
    calls: AtomicUsize,
}

#[async_trait]
impl DataLoader for FlakyLoader {
    async fn load(&self, order_id: &str) -> anyhow::Result<OrderAddresses> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("connection reset while loading order {}", order_id);
        }
        Ok(OrderAddresses {
            origin_address: Address {
                city: "Austin".to_string(),
                ..Default::default()
            },
            shipping_address: Address {
                city: "Boston".to_string(),
                ..Default::default()
            },
        })
    }
}

struct AcceptAll;

#[async_trait]
impl AddressValidator for AcceptAll {
    async fn validate(
        &self,
        _address: &Address,
        _address_type: AddressType,
    ) -> anyhow::Result<ValidationResult> {
        Ok(ValidationResult::Valid)
    }
}

#[tokio::test]
async fn test_restart_after_data_loading_failure() {
    let mut workflow = ShippingLabelWorkflow::new(
        FlakyLoader {
            calls: AtomicUsize::new(0),
        },
        AcceptAll,
    );
    let mut effects = workflow.effects();

    let first = workflow.start("77").await.unwrap();
    assert_eq!(
        first,
        SideEffect::ShowError {
            error: LabelError::DataLoadingError
        }
    );
    assert!(workflow.state().is_terminal_failure());

    // starting again without a reset is a caller defect
    assert!(assert_err!(workflow.start("77").await).is_invalid_transition());

    let second = assert_ok!(workflow.restart("77").await);
    assert!(matches!(second, SideEffect::UpdateViewState { .. }));
    assert!(effects.has_changed().unwrap());
    assert_eq!(*effects.borrow_and_update(), second);
}

#[tokio::test]
async fn test_observer_task_sees_latest_effect() {
    let mut workflow = ShippingLabelWorkflow::new(
        FlakyLoader {
            calls: AtomicUsize::new(1),
        },
        AcceptAll,
    );
    let mut effects = workflow.effects();

    let observer = tokio::spawn(async move {
        loop {
            effects.changed().await.unwrap();
            let effect = effects.borrow_and_update().clone();
            if effect == SideEffect::ShowPackageOptions {
                return effect;
            }
        }
    });

    workflow.start("1").await.unwrap();
    workflow
        .handle_event(Event::PackageSelectionStarted)
        .await
        .unwrap();

    assert_eq!(observer.await.unwrap(), SideEffect::ShowPackageOptions);
}
