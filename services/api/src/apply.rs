use crate::demo::render_snapshot;
use crate::infra::load_job;
use clap::Args;
use jobbot::config::AppConfig;
use jobbot::error::AppError;
use jobbot::workflows::application::{
    Applicant, ApplicationFlowService, FlowAction, FlowId, FlowServiceError, FlowSnapshot,
    HttpJobBotBackend, JobBotBackend, PaymentDetails, PaymentGateway, PaymentMethod,
    SimulatedPaymentGateway, UserId,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

#[derive(Args, Debug)]
pub(crate) struct ApplyArgs {
    /// JSON file holding the job posting to apply to
    #[arg(long)]
    pub(crate) job: PathBuf,
    /// Id of the job seeker applying
    #[arg(long)]
    pub(crate) user_id: String,
    /// Override the job board backend base URL
    #[arg(long)]
    pub(crate) backend_url: Option<String>,
}

struct Prompt<R> {
    lines: Lines<R>,
}

impl Prompt<BufReader<Stdin>> {
    fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Print `label` and read one trimmed line; `None` once stdin is exhausted.
    async fn ask(&mut self, label: &str) -> Result<Option<String>, AppError> {
        print!("{label} ");
        std::io::stdout().flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}

pub(crate) async fn run_apply(args: ApplyArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }

    let job = load_job(&args.job)?;
    let backend = Arc::new(HttpJobBotBackend::new(&config.backend)?);
    let payments = Arc::new(SimulatedPaymentGateway::new(config.payment.delay()));
    let service: ApplicationFlowService<HttpJobBotBackend, SimulatedPaymentGateway> =
        ApplicationFlowService::new(backend, payments);

    println!("Applying to {} at {}", job.title, job.company);
    let applicant = Applicant {
        user_id: UserId(args.user_id),
    };
    let flow_id = service.open(job, applicant).await?.flow_id;

    let mut prompt = Prompt::stdin();
    let outcome = drive(&service, &flow_id, &mut prompt).await;
    match service.close(&flow_id).await {
        Ok(closed) => render_snapshot(&closed),
        // Declining already ended the session.
        Err(FlowServiceError::NotFound(_)) => {}
        Err(err) => return Err(err.into()),
    }
    outcome
}

async fn drive<B, P, R>(
    service: &ApplicationFlowService<B, P>,
    flow_id: &FlowId,
    prompt: &mut Prompt<R>,
) -> Result<(), AppError>
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut snapshot = service.act(flow_id, FlowAction::Start).await?;
    render_snapshot(&snapshot);

    while let Some(question) = snapshot.view.question.clone() {
        println!(
            "\nQuestion {} of {}: {}",
            question.index + 1,
            question.total,
            question.prompt
        );
        for (index, option) in question.options.iter().enumerate() {
            println!("  {}. {option}", index + 1);
        }
        let Some(reply) = prompt.ask(">").await? else {
            return Ok(());
        };

        let result = if question.options.is_empty() {
            service
                .act(flow_id, FlowAction::AnswerText { answer: reply })
                .await
        } else {
            match reply.parse::<usize>() {
                Ok(choice) if choice >= 1 => {
                    match service
                        .act(flow_id, FlowAction::SelectOption { option: choice - 1 })
                        .await
                    {
                        Ok(_) => service.act(flow_id, FlowAction::ConfirmChoice).await,
                        Err(err) => Err(err),
                    }
                }
                _ => {
                    println!("Pick one of the numbered options");
                    continue;
                }
            }
        };
        match result {
            Ok(next) => snapshot = next,
            Err(err) => println!("{err}"),
        }
    }
    render_snapshot(&snapshot);

    if snapshot.view.qualified != Some(true) {
        return Ok(());
    }

    let Some(reply) = prompt
        .ask("Enhance your resume for this job before applying? [y/N]")
        .await?
    else {
        return Ok(());
    };
    if !reply.eq_ignore_ascii_case("y") {
        render_snapshot(&service.act(flow_id, FlowAction::Decline).await?);
        return Ok(());
    }

    service.act(flow_id, FlowAction::PayAndEnhance).await?;
    let Some(reply) = prompt.ask("Pay with [1] UPI or [2] card?").await? else {
        return Ok(());
    };
    let method = if reply == "2" {
        PaymentMethod::Card
    } else {
        PaymentMethod::Upi
    };
    service
        .act(flow_id, FlowAction::ChoosePaymentMethod { method })
        .await?;

    let Some(details) = read_payment_details(method, prompt).await? else {
        return Ok(());
    };
    let ready = service.act(flow_id, FlowAction::Pay { details }).await?;
    render_snapshot(&ready);
    report_resume(&ready);

    if ready.view.enhanced_resume.is_some() {
        let sent = service.act(flow_id, FlowAction::SendResume).await?;
        render_snapshot(&sent);
    }
    Ok(())
}

async fn read_payment_details<R: AsyncBufRead + Unpin>(
    method: PaymentMethod,
    prompt: &mut Prompt<R>,
) -> Result<Option<PaymentDetails>, AppError> {
    let details = match method {
        PaymentMethod::Upi => {
            let Some(upi_id) = prompt.ask("UPI id:").await? else {
                return Ok(None);
            };
            PaymentDetails::Upi { upi_id }
        }
        PaymentMethod::Card => {
            let Some(card_number) = prompt.ask("Card number:").await? else {
                return Ok(None);
            };
            let Some(expiry) = prompt.ask("Expiry (MM/YY):").await? else {
                return Ok(None);
            };
            let Some(cvv) = prompt.ask("CVV:").await? else {
                return Ok(None);
            };
            PaymentDetails::Card {
                card_number,
                expiry,
                cvv,
            }
        }
    };
    Ok(Some(details))
}

fn report_resume(snapshot: &FlowSnapshot) {
    match &snapshot.view.enhanced_resume {
        Some(resume) => println!("\nEnhanced resume\n{resume}\n"),
        None => println!("Resume enhancement did not complete"),
    }
}
