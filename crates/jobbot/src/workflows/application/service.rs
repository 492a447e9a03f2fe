use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use super::backend::{BackendError, JobBotBackend};
use super::domain::{Applicant, EnhancedResume, JobId, JobPosting, UserId};
use super::driver::FlowDriver;
use super::flow::{ApplicationFlow, FlowAction, FlowError, FlowView};
use super::payment::PaymentGateway;
use super::registry::{FlowId, FlowRegistry};

/// Flow view tagged with the id clients use to address it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub flow_id: FlowId,
    #[serde(flatten)]
    pub view: FlowView,
}

/// Service composing the flow registry with the backend and payment gateway.
pub struct ApplicationFlowService<B, P> {
    driver: FlowDriver<B, P>,
    registry: FlowRegistry,
}

impl<B, P> ApplicationFlowService<B, P>
where
    B: JobBotBackend + 'static,
    P: PaymentGateway + 'static,
{
    pub fn new(backend: Arc<B>, payments: Arc<P>) -> Self {
        Self {
            driver: FlowDriver::new(backend, payments),
            registry: FlowRegistry::default(),
        }
    }

    pub fn open_flows(&self) -> usize {
        self.registry.len()
    }

    /// Open a flow for a job the applicant has not applied to yet.
    pub async fn open(
        &self,
        job: JobPosting,
        applicant: Applicant,
    ) -> Result<FlowSnapshot, FlowServiceError> {
        if self
            .driver
            .backend()
            .has_applied(&applicant.user_id, &job.job_id)
            .await?
        {
            return Err(FlowServiceError::AlreadyApplied {
                user_id: applicant.user_id,
                job_id: job.job_id,
            });
        }

        let flow = ApplicationFlow::new(job, applicant);
        let view = flow.view();
        let (flow_id, _) = self.registry.insert(flow);
        info!(%flow_id, job_id = %view.job_id, "application flow opened");
        Ok(FlowSnapshot { flow_id, view })
    }

    pub async fn view(&self, flow_id: &FlowId) -> Result<FlowSnapshot, FlowServiceError> {
        let handle = self
            .registry
            .get(flow_id)
            .ok_or_else(|| FlowServiceError::NotFound(flow_id.clone()))?;
        let flow = handle.lock().await;
        Ok(FlowSnapshot {
            flow_id: flow_id.clone(),
            view: flow.view(),
        })
    }

    /// Apply an action and run its remote calls. The flow stays unlocked while a call is out:
    /// other actions are refused as busy, but a close goes through and the late response is
    /// dropped. A flow that closed or declined enhancement is discarded.
    pub async fn act(
        &self,
        flow_id: &FlowId,
        action: FlowAction,
    ) -> Result<FlowSnapshot, FlowServiceError> {
        let handle = self
            .registry
            .get(flow_id)
            .ok_or_else(|| FlowServiceError::NotFound(flow_id.clone()))?;

        let effect = {
            let mut flow = handle.lock().await;
            // A concurrent close may have discarded the flow while we waited for the lock.
            if flow.is_closed() {
                return Err(FlowServiceError::NotFound(flow_id.clone()));
            }
            if let Some(call) = flow.outstanding() {
                if !action.is_close() {
                    return Err(FlowServiceError::Busy {
                        flow_id: flow_id.clone(),
                        call,
                    });
                }
            }
            debug!(
                %flow_id,
                action = action.label(),
                state = flow.state().label(),
                "applying flow action"
            );
            flow.apply(action)?
        };

        self.driver.drive(&handle, effect).await;

        let flow = handle.lock().await;
        if flow.state().ends_session() {
            self.registry.remove(flow_id);
        } else {
            self.registry.touch(flow_id, flow.state().is_terminal());
        }
        Ok(FlowSnapshot {
            flow_id: flow_id.clone(),
            view: flow.view(),
        })
    }

    pub async fn close(&self, flow_id: &FlowId) -> Result<FlowSnapshot, FlowServiceError> {
        self.act(flow_id, FlowAction::Close).await
    }

    /// Close and discard flows nobody touched within their retention window. Closing sends a
    /// qualified applicant's application the same way an explicit close would.
    pub async fn evict_stale(&self, idle: Duration, finished: Duration) -> usize {
        let stale = self.registry.remove_stale(idle, finished);
        let count = stale.len();
        for (flow_id, handle) in stale {
            let effect = {
                let mut flow = handle.lock().await;
                let effect = flow.close();
                flow.track(effect)
            };
            info!(%flow_id, "stale application flow evicted");
            self.driver.drive(&handle, effect).await;
        }
        count
    }

    pub async fn enhanced_resume(
        &self,
        flow_id: &FlowId,
    ) -> Result<EnhancedResume, FlowServiceError> {
        let handle = self
            .registry
            .get(flow_id)
            .ok_or_else(|| FlowServiceError::NotFound(flow_id.clone()))?;
        let flow = handle.lock().await;
        flow.state()
            .enhanced_resume()
            .cloned()
            .ok_or_else(|| FlowServiceError::ResumeNotReady(flow_id.clone()))
    }
}

/// Error raised by the flow service.
#[derive(Debug, thiserror::Error)]
pub enum FlowServiceError {
    #[error("flow {0} not found")]
    NotFound(FlowId),
    #[error("user {user_id} already applied to job {job_id}")]
    AlreadyApplied { user_id: UserId, job_id: JobId },
    #[error("flow {flow_id} is still waiting on {call}")]
    Busy {
        flow_id: FlowId,
        call: &'static str,
    },
    #[error("flow {0} has no enhanced resume yet")]
    ResumeNotReady(FlowId),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}
