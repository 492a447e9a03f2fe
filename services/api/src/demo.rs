use crate::infra::{sample_job, InMemoryJobBoard};
use clap::{Args, ValueEnum};
use jobbot::error::AppError;
use jobbot::workflows::application::{
    Applicant, ApplicationFlowService, FlowAction, FlowId, FlowSnapshot, PaymentDetails,
    PaymentMethod, SimulatedPaymentGateway, UserId,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum DemoPayment {
    Upi,
    Card,
}

impl From<DemoPayment> for PaymentMethod {
    fn from(value: DemoPayment) -> Self {
        match value {
            DemoPayment::Upi => PaymentMethod::Upi,
            DemoPayment::Card => PaymentMethod::Card,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Score the in-memory scorer awards the applicant
    #[arg(long, default_value_t = 82.0)]
    pub(crate) score: f64,
    /// Minimum score that counts as qualified
    #[arg(long, default_value_t = 60.0)]
    pub(crate) pass_mark: f64,
    /// Skip the paid resume enhancement and apply straight away
    #[arg(long)]
    pub(crate) decline: bool,
    /// Payment method used for the enhancement
    #[arg(long, value_enum, default_value_t = DemoPayment::Upi)]
    pub(crate) method: DemoPayment,
    /// Simulated payment processing delay in milliseconds
    #[arg(long, default_value_t = 0)]
    pub(crate) payment_delay_ms: u64,
}

const SCRIPTED_ANSWERS: [&str; 5] = ["Pune", "yes", "yes", "B.E. Computer Science", "4"];

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let board = Arc::new(InMemoryJobBoard::new(args.score, args.pass_mark));
    let payments = Arc::new(SimulatedPaymentGateway::new(Duration::from_millis(
        args.payment_delay_ms,
    )));
    let service = ApplicationFlowService::new(Arc::clone(&board), payments);

    let job = sample_job();
    println!("Application bot demo");
    println!(
        "Job: {} at {} ({}), salary {} to {}",
        job.title,
        job.company,
        job.location,
        job.min_salary_label(),
        job.max_salary_label()
    );

    let applicant = Applicant {
        user_id: UserId("demo-user".to_string()),
    };
    let opened = service.open(job, applicant).await?;
    let flow_id = opened.flow_id.clone();
    render_snapshot(&opened);

    let mut snapshot = step(&service, &flow_id, FlowAction::Start).await?;
    for answer in SCRIPTED_ANSWERS {
        if let Some(question) = &snapshot.view.question {
            println!("  Q: {}\n  A: {answer}", question.prompt);
        }
        snapshot = step(
            &service,
            &flow_id,
            FlowAction::AnswerText {
                answer: answer.to_string(),
            },
        )
        .await?;
    }
    while let Some(question) = snapshot.view.question.clone() {
        let choice = question.options.len().saturating_sub(1);
        println!(
            "  Q: {}\n  A: {}",
            question.prompt,
            question.options.get(choice).map(String::as_str).unwrap_or("")
        );
        step(&service, &flow_id, FlowAction::SelectOption { option: choice }).await?;
        snapshot = step(&service, &flow_id, FlowAction::ConfirmChoice).await?;
    }

    let mut session_open = true;
    if snapshot.view.qualified == Some(true) {
        if args.decline {
            step(&service, &flow_id, FlowAction::Decline).await?;
            session_open = false;
        } else {
            let method = PaymentMethod::from(args.method);
            step(&service, &flow_id, FlowAction::PayAndEnhance).await?;
            step(&service, &flow_id, FlowAction::ChoosePaymentMethod { method }).await?;
            let details = match method {
                PaymentMethod::Upi => PaymentDetails::Upi {
                    upi_id: "demo@okbank".to_string(),
                },
                PaymentMethod::Card => PaymentDetails::Card {
                    card_number: "4111111111111111".to_string(),
                    expiry: "12/29".to_string(),
                    cvv: "123".to_string(),
                },
            };
            let ready = step(&service, &flow_id, FlowAction::Pay { details }).await?;
            if let Some(resume) = &ready.view.enhanced_resume {
                println!("\nEnhanced resume preview\n{resume}\n");
            }
            step(&service, &flow_id, FlowAction::SendResume).await?;
        }
    }

    // Declining ends the session on its own.
    if session_open {
        service.close(&flow_id).await?;
        println!("-> closed");
    }

    let applications = board.applications();
    if applications.is_empty() {
        println!("\nNo application was submitted");
    } else {
        println!("\nApplications received by the job board");
        for record in applications {
            println!(
                "- {} for {}: score {:.1}, qualified {}, {} answers",
                record.user_id,
                record.job_id,
                record.score,
                record.qualified,
                record.answers.len()
            );
        }
    }

    Ok(())
}

async fn step(
    service: &ApplicationFlowService<InMemoryJobBoard, SimulatedPaymentGateway>,
    flow_id: &FlowId,
    action: FlowAction,
) -> Result<FlowSnapshot, AppError> {
    let previous = service.view(flow_id).await?.view.state;
    let snapshot = service.act(flow_id, action).await?;
    if snapshot.view.state != previous {
        render_snapshot(&snapshot);
    }
    Ok(snapshot)
}

/// One-line summary of where a flow stands.
pub(crate) fn render_snapshot(snapshot: &FlowSnapshot) {
    let view = &snapshot.view;
    let mut line = format!("-> {}", view.state);
    if let Some(score) = view.score {
        line.push_str(&format!(" | score {score:.1}"));
    }
    if let Some(qualified) = view.qualified {
        line.push_str(if qualified { " | qualified" } else { " | not qualified" });
    }
    if let Some(method) = view.payment_method {
        line.push_str(&format!(" | paying by {}", method.label()));
    }
    if view.application_sent {
        line.push_str(" | application sent");
    }
    if let Some(reason) = &view.halted {
        line.push_str(&format!(" | halted: {reason}"));
    }
    println!("{line}");
}
