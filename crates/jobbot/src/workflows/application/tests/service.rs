use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::common::*;
use crate::workflows::application::domain::{PaymentDetails, PaymentMethod};
use crate::workflows::application::driver::FlowDriver;
use crate::workflows::application::flow::{
    ApplicationFlow, EnhancementStage, FlowAction, FlowError, FlowState,
};
use crate::workflows::application::registry::{FlowHandle, FlowId};
use crate::workflows::application::service::{
    ApplicationFlowService, FlowServiceError, FlowSnapshot,
};
use crate::workflows::application::{JobBotBackend, PaymentGateway, SimulatedPaymentGateway};

type ScriptedService = ApplicationFlowService<ScriptedBackend, SimulatedPaymentGateway>;

async fn answer_everything<B, P>(service: &ApplicationFlowService<B, P>, flow_id: &FlowId)
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    for answer in FIXED_ANSWERS {
        service
            .act(
                flow_id,
                FlowAction::AnswerText {
                    answer: answer.to_string(),
                },
            )
            .await
            .expect("answer accepted");
    }
    loop {
        let snapshot = service.view(flow_id).await.expect("flow exists");
        if snapshot.view.state != "answering_questions" {
            break;
        }
        service
            .act(flow_id, FlowAction::SelectOption { option: 0 })
            .await
            .expect("option selectable");
        service
            .act(flow_id, FlowAction::ConfirmChoice)
            .await
            .expect("choice confirmed");
    }
}

/// Open, start and pay by UPI; returns the snapshot after the payment action.
async fn paid_by_upi<P: PaymentGateway + 'static>(
    service: &ApplicationFlowService<ScriptedBackend, P>,
) -> FlowSnapshot {
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(service, &flow_id).await;
    service
        .act(&flow_id, FlowAction::PayAndEnhance)
        .await
        .expect("payment offered");
    service
        .act(
            &flow_id,
            FlowAction::ChoosePaymentMethod {
                method: PaymentMethod::Upi,
            },
        )
        .await
        .expect("upi chosen");
    service
        .act(
            &flow_id,
            FlowAction::Pay {
                details: PaymentDetails::Upi {
                    upi_id: "user7@okbank".to_string(),
                },
            },
        )
        .await
        .expect("payment accepted")
}

/// Answer up to the last question, then confirm it on a separate task and wait until scoring
/// is out.
async fn confirm_last_answer_in_background(
    service: &Arc<ScriptedService>,
    flow_id: &FlowId,
) -> JoinHandle<Result<FlowSnapshot, FlowServiceError>> {
    for answer in FIXED_ANSWERS {
        service
            .act(
                flow_id,
                FlowAction::AnswerText {
                    answer: answer.to_string(),
                },
            )
            .await
            .expect("answer accepted");
    }
    for action in [
        FlowAction::SelectOption { option: 0 },
        FlowAction::ConfirmChoice,
        FlowAction::SelectOption { option: 1 },
    ] {
        service.act(flow_id, action).await.expect("choice accepted");
    }

    let task = {
        let service = Arc::clone(service);
        let flow_id = flow_id.clone();
        tokio::spawn(async move { service.act(&flow_id, FlowAction::ConfirmChoice).await })
    };
    while service.view(flow_id).await.expect("flow exists").view.state != "submitting" {
        tokio::task::yield_now().await;
    }
    task
}

async fn started_flow(service: &ScriptedService) -> FlowId {
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    flow_id
}

fn flow_handle() -> FlowHandle {
    Arc::new(tokio::sync::Mutex::new(ApplicationFlow::new(
        job(),
        applicant(),
    )))
}

#[tokio::test]
async fn driver_runs_question_generation_on_start() {
    let backend = Arc::new(ScriptedBackend::scoring(82.0, true));
    let driver = FlowDriver::new(Arc::clone(&backend), instant_payments());
    let handle = flow_handle();

    let effect = handle
        .lock()
        .await
        .apply(FlowAction::Start)
        .expect("start accepted");
    assert_eq!(handle.lock().await.outstanding(), Some("generate_questions"));
    driver.drive(&handle, effect).await;

    let flow = handle.lock().await;
    assert_eq!(*flow.state(), FlowState::AnsweringQuestions);
    assert_eq!(flow.questionnaire().total(), 7);
    assert_eq!(flow.outstanding(), None);
    assert_eq!(backend.calls(), vec!["generate_questions"]);
}

#[tokio::test]
async fn driver_degrades_when_generator_fails() {
    let backend = Arc::new(ScriptedBackend::scoring(82.0, true).without_generator());
    let driver = FlowDriver::new(Arc::clone(&backend), instant_payments());
    let handle = flow_handle();

    let effect = handle
        .lock()
        .await
        .apply(FlowAction::Start)
        .expect("start accepted");
    driver.drive(&handle, effect).await;

    let flow = handle.lock().await;
    assert_eq!(*flow.state(), FlowState::AnsweringQuestions);
    assert_eq!(flow.questionnaire().total(), 5);
}

#[tokio::test]
async fn backend_engineer_scenario_reaches_qualification_passed() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true));
    let opened = service
        .open(job(), applicant())
        .await
        .expect("flow opens");
    let flow_id = opened.flow_id;

    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(&service, &flow_id).await;

    let snapshot = service.view(&flow_id).await.expect("flow exists");
    assert_eq!(snapshot.view.state, "qualification_passed");
    assert_eq!(snapshot.view.score, Some(82.0));

    let evaluations = backend.evaluations();
    assert_eq!(evaluations.len(), 1);
    assert_eq!(evaluations[0].questions.len(), 7);
    assert_eq!(evaluations[0].answers.len(), 7);
}

#[tokio::test]
async fn unqualified_scenario_never_offers_payment() {
    let (service, backend) = build_service(ScriptedBackend::scoring(40.0, false));
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(&service, &flow_id).await;

    let result = service.act(&flow_id, FlowAction::PayAndEnhance).await;

    assert!(matches!(
        result,
        Err(FlowServiceError::Flow(FlowError::InvalidTransition { .. }))
    ));
    let snapshot = service.view(&flow_id).await.expect("flow exists");
    assert_eq!(snapshot.view.state, "not_qualified");
    assert_eq!(snapshot.view.payment_method, None);

    service.close(&flow_id).await.expect("close allowed");
    assert!(backend.applications().is_empty());
}

#[tokio::test]
async fn card_payment_scenario_produces_enhanced_resume() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true));
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(&service, &flow_id).await;

    service
        .act(&flow_id, FlowAction::PayAndEnhance)
        .await
        .expect("payment offered");
    service
        .act(
            &flow_id,
            FlowAction::ChoosePaymentMethod {
                method: PaymentMethod::Card,
            },
        )
        .await
        .expect("card chosen");
    let snapshot = service
        .act(
            &flow_id,
            FlowAction::Pay {
                details: PaymentDetails::Card {
                    card_number: "4111111111111111".to_string(),
                    expiry: "12/27".to_string(),
                    cvv: "123".to_string(),
                },
            },
        )
        .await
        .expect("payment accepted");

    assert_eq!(snapshot.view.state, "resume_ready");
    let resume = service
        .enhanced_resume(&flow_id)
        .await
        .expect("resume available");
    assert!(!resume.content.is_empty());

    let enhancements = backend.enhancements();
    assert_eq!(enhancements.len(), 1);
    assert_eq!(enhancements[0].job_title, "Backend Engineer");
    assert_eq!(enhancements[0].company, "Acme Logistics");
    assert_eq!(
        enhancements[0].job_description,
        "Own the order routing services."
    );
}

#[tokio::test]
async fn repeated_sends_apply_once() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true));
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(&service, &flow_id).await;
    for action in [
        FlowAction::PayAndEnhance,
        FlowAction::ChoosePaymentMethod {
            method: PaymentMethod::Upi,
        },
        FlowAction::Pay {
            details: PaymentDetails::Upi {
                upi_id: "user7@okbank".to_string(),
            },
        },
    ] {
        service.act(&flow_id, action).await.expect("action accepted");
    }

    for _ in 0..3 {
        service
            .act(&flow_id, FlowAction::SendResume)
            .await
            .expect("send allowed");
    }
    let closed = service.close(&flow_id).await.expect("close allowed");

    assert_eq!(closed.view.state, "closed");
    let applications = backend.applications();
    assert_eq!(applications.len(), 1);
    assert!(applications[0].qualified);
    assert_eq!(applications[0].score, 82.0);
}

#[tokio::test]
async fn closing_after_qualification_sends_application_and_discards_flow() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true));
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(&service, &flow_id).await;

    let closed = service.close(&flow_id).await.expect("close allowed");

    assert!(closed.view.application_sent);
    assert_eq!(backend.applications().len(), 1);
    assert_eq!(service.open_flows(), 0);
    assert!(matches!(
        service.view(&flow_id).await,
        Err(FlowServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn closing_while_answering_sends_nothing() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true));
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");

    service.close(&flow_id).await.expect("close allowed");

    assert!(backend.applications().is_empty());
    assert!(!backend.calls().contains(&"evaluate_answers"));
}

#[tokio::test]
async fn scoring_failure_leaves_flow_halted_in_submitting() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true).without_scorer());
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(&service, &flow_id).await;

    let snapshot = service.view(&flow_id).await.expect("flow exists");
    assert_eq!(snapshot.view.state, "submitting");
    assert!(snapshot.view.halted.is_some());

    service.close(&flow_id).await.expect("close allowed");
    assert!(backend.applications().is_empty());
}

#[tokio::test]
async fn enhancement_failure_halts_but_close_still_applies() {
    let (service, backend) =
        build_service(ScriptedBackend::scoring(82.0, true).without_enhancer());
    let flow_id = service
        .open(job(), applicant())
        .await
        .expect("flow opens")
        .flow_id;
    service
        .act(&flow_id, FlowAction::Start)
        .await
        .expect("flow starts");
    answer_everything(&service, &flow_id).await;
    for action in [
        FlowAction::PayAndEnhance,
        FlowAction::ChoosePaymentMethod {
            method: PaymentMethod::Upi,
        },
        FlowAction::Pay {
            details: PaymentDetails::Upi {
                upi_id: "user7@okbank".to_string(),
            },
        },
    ] {
        service.act(&flow_id, action).await.expect("action accepted");
    }

    let snapshot = service.view(&flow_id).await.expect("flow exists");
    assert_eq!(snapshot.view.state, "enhancing");
    assert!(matches!(
        service.enhanced_resume(&flow_id).await,
        Err(FlowServiceError::ResumeNotReady(_))
    ));

    service.close(&flow_id).await.expect("close allowed");
    assert_eq!(backend.applications().len(), 1);
}

#[tokio::test]
async fn open_rejects_jobs_already_applied_to() {
    let (service, _) = build_service(ScriptedBackend::scoring(82.0, true).with_existing_application());

    let result = service.open(job(), applicant()).await;

    assert!(matches!(
        result,
        Err(FlowServiceError::AlreadyApplied { .. })
    ));
    assert_eq!(service.open_flows(), 0);
}

#[tokio::test]
async fn unknown_flow_is_not_found() {
    let (service, _) = build_service(ScriptedBackend::scoring(82.0, true));

    let result = service
        .act(&FlowId("flow-missing".to_string()), FlowAction::Start)
        .await;

    assert!(matches!(result, Err(FlowServiceError::NotFound(_))));
}

#[tokio::test]
async fn closing_during_scoring_sends_nothing_and_drops_late_verdict() {
    let gate = Arc::new(Notify::new());
    let (service, backend) =
        build_service(ScriptedBackend::scoring(82.0, true).with_scoring_gate(Arc::clone(&gate)));
    let flow_id = started_flow(&service).await;
    let scoring = confirm_last_answer_in_background(&service, &flow_id).await;

    let submitting = service
        .view(&flow_id)
        .await
        .expect("view does not wait on the scorer");
    assert_eq!(submitting.view.awaiting, Some("evaluate_answers"));

    let closed = service.close(&flow_id).await.expect("close goes through");
    assert_eq!(closed.view.state, "closed");
    assert!(!closed.view.application_sent);

    gate.notify_one();
    let late = scoring
        .await
        .expect("scoring task joins")
        .expect("last answer accepted");

    assert_eq!(late.view.state, "closed");
    assert_eq!(late.view.score, None);
    assert_eq!(backend.evaluations().len(), 1);
    assert!(backend.applications().is_empty());
    assert_eq!(service.open_flows(), 0);
}

#[tokio::test]
async fn actions_are_refused_while_scoring_is_outstanding() {
    let gate = Arc::new(Notify::new());
    let (service, backend) =
        build_service(ScriptedBackend::scoring(82.0, true).with_scoring_gate(Arc::clone(&gate)));
    let flow_id = started_flow(&service).await;
    let scoring = confirm_last_answer_in_background(&service, &flow_id).await;

    let busy = service.act(&flow_id, FlowAction::Decline).await;
    assert!(matches!(
        busy,
        Err(FlowServiceError::Busy {
            call: "evaluate_answers",
            ..
        })
    ));

    gate.notify_one();
    let scored = scoring
        .await
        .expect("scoring task joins")
        .expect("last answer accepted");
    assert_eq!(scored.view.state, "qualification_passed");
    assert_eq!(scored.view.awaiting, None);

    service
        .act(&flow_id, FlowAction::Decline)
        .await
        .expect("decline accepted once scored");
    assert_eq!(backend.applications().len(), 1);
}

#[tokio::test]
async fn declining_sends_application_and_discards_flow() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true));
    let flow_id = started_flow(&service).await;
    answer_everything(&service, &flow_id).await;

    let skipped = service
        .act(&flow_id, FlowAction::Decline)
        .await
        .expect("decline accepted");

    assert_eq!(skipped.view.state, "skipped");
    assert!(skipped.view.application_sent);
    assert_eq!(backend.applications().len(), 1);
    assert_eq!(service.open_flows(), 0);
    assert!(matches!(
        service.close(&flow_id).await,
        Err(FlowServiceError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn idle_flows_are_closed_and_evicted() {
    let idle = Duration::from_secs(1800);
    let finished = Duration::from_secs(300);
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true));
    let qualified = started_flow(&service).await;
    answer_everything(&service, &qualified).await;
    service
        .open(job(), applicant())
        .await
        .expect("second flow opens");

    tokio::time::advance(Duration::from_secs(600)).await;
    assert_eq!(service.evict_stale(idle, finished).await, 0);
    assert_eq!(service.open_flows(), 2);

    tokio::time::advance(idle).await;
    assert_eq!(service.evict_stale(idle, finished).await, 2);

    assert_eq!(service.open_flows(), 0);
    let applications = backend.applications();
    assert_eq!(applications.len(), 1, "only the qualified flow applies");
    assert!(applications[0].qualified);
    assert!(matches!(
        service.view(&qualified).await,
        Err(FlowServiceError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn finished_flows_are_evicted_sooner() {
    let idle = Duration::from_secs(1800);
    let finished = Duration::from_secs(300);
    let (service, backend) = build_service(ScriptedBackend::scoring(40.0, false));
    let flow_id = started_flow(&service).await;
    answer_everything(&service, &flow_id).await;
    assert_eq!(
        service.view(&flow_id).await.expect("flow exists").view.state,
        "not_qualified"
    );

    tokio::time::advance(finished).await;

    assert_eq!(service.evict_stale(idle, finished).await, 1);
    assert_eq!(service.open_flows(), 0);
    assert!(backend.applications().is_empty());
}

#[tokio::test]
async fn resume_fetch_failure_halts_before_rewriting_and_close_applies_once() {
    let (service, backend) = build_service(ScriptedBackend::scoring(82.0, true).without_resume());

    let halted = paid_by_upi(&service).await;

    assert_eq!(halted.view.state, "enhancing");
    assert_eq!(
        halted.view.enhancement_stage,
        Some(EnhancementStage::FetchingResume)
    );
    assert!(halted
        .view
        .halted
        .as_deref()
        .expect("halt reason recorded")
        .starts_with("resume fetch failed"));
    assert!(backend.calls().contains(&"user_resume"));
    assert!(!backend.calls().contains(&"enhance_resume"));

    let closed = service
        .close(&halted.flow_id)
        .await
        .expect("close allowed");
    assert!(closed.view.application_sent);
    assert_eq!(backend.applications().len(), 1);
    assert!(matches!(
        service.close(&halted.flow_id).await,
        Err(FlowServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_payment_halts_in_processing_and_close_applies_once() {
    for (gateway, reason) in [
        (FailingGateway::declining(), "payment declined"),
        (FailingGateway::unavailable(), "payment gateway unavailable"),
    ] {
        let (service, backend) = build_service_with(ScriptedBackend::scoring(82.0, true), gateway);

        let halted = paid_by_upi(&service).await;

        assert_eq!(halted.view.state, "processing_payment");
        assert_eq!(halted.view.payment_method, Some(PaymentMethod::Upi));
        assert!(halted
            .view
            .halted
            .as_deref()
            .expect("halt reason recorded")
            .contains(reason));
        assert!(!backend.calls().contains(&"user_resume"));
        assert!(matches!(
            service
                .act(
                    &halted.flow_id,
                    FlowAction::Pay {
                        details: PaymentDetails::Upi {
                            upi_id: "user7@okbank".to_string(),
                        },
                    },
                )
                .await,
            Err(FlowServiceError::Flow(FlowError::InvalidTransition { .. }))
        ));

        service
            .close(&halted.flow_id)
            .await
            .expect("close allowed");
        assert_eq!(backend.applications().len(), 1);
    }
}
