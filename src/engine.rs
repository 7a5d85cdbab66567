use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::context::EvaluationContext;
use crate::error::PdpError;
use crate::loader;
use crate::policy::{PolicyDef, PolicyFinder, RootSelection};
use crate::traits::{AttributeSource, DocumentLoader};
use crate::types::{
    Decision, ExtendedIndeterminate, PolicyIdentifier, Request, Response, Status,
};

/// The main engine handle. Cloneable and thread-safe: the policy tree is
/// immutable between reloads and shared read-only across concurrent
/// evaluations.
#[derive(Clone)]
pub struct PdpEngine {
    inner: Arc<RwLock<PolicyFinder>>,
}

impl PdpEngine {
    pub fn new(roots: Vec<PolicyDef>) -> Result<Self, PdpError> {
        Ok(PdpEngine {
            inner: Arc::new(RwLock::new(PolicyFinder::new(roots)?)),
        })
    }

    /// An engine that can resolve absolute-URI policy references through the
    /// given document loader.
    pub fn with_loader(
        roots: Vec<PolicyDef>,
        document_loader: Arc<dyn DocumentLoader>,
    ) -> Result<Self, PdpError> {
        Ok(PdpEngine {
            inner: Arc::new(RwLock::new(PolicyFinder::with_loader(
                roots,
                document_loader,
            )?)),
        })
    }

    pub fn new_from_json(text: &str) -> Result<Self, PdpError> {
        PdpEngine::new(loader::policies_from_json(text)?)
    }

    /// Swap in a new policy tree. Evaluations already running finish against
    /// the old tree; the document loader is kept.
    pub fn reload(&self, roots: Vec<PolicyDef>) -> Result<(), PdpError> {
        let document_loader = self
            .inner
            .read()
            .map_err(|e| PdpError::LockError(e.to_string()))?
            .loader();
        let finder = match document_loader {
            Some(document_loader) => PolicyFinder::with_loader(roots, document_loader)?,
            None => PolicyFinder::new(roots)?,
        };
        *self
            .inner
            .write()
            .map_err(|e| PdpError::LockError(e.to_string()))? = finder;
        Ok(())
    }

    pub fn reload_from_json(&self, text: &str) -> Result<(), PdpError> {
        self.reload(loader::policies_from_json(text)?)
    }

    /// Every registered policy id and version.
    pub fn policies(&self) -> Result<Vec<PolicyIdentifier>, PdpError> {
        Ok(self
            .inner
            .read()
            .map_err(|e| PdpError::LockError(e.to_string()))?
            .policies())
    }

    /// Evaluate one decision request. Always produces a decision: faults
    /// degrade to Indeterminate with a readable status, they never escape as
    /// errors.
    pub fn decide(&self, request: &Request, source: &dyn AttributeSource) -> Response {
        debug!(
            event = "Request",
            phase = "Evaluation",
            groups = request.groups.len(),
        );

        let guard = match self.inner.read() {
            Ok(guard) => guard,
            Err(e) => {
                return Response::new(
                    Decision::Indeterminate(ExtendedIndeterminate::DenyOrPermit),
                    Status::processing_error(format!("policy store lock poisoned: {e}")),
                );
            }
        };
        let mut ctx = EvaluationContext::new(request, source, &guard);

        let mut response = match guard.root_policy(&mut ctx) {
            RootSelection::NotFound => {
                debug!(event = "Request", phase = "RootSelection", outcome = "none");
                Response::new(Decision::NotApplicable, Status::ok())
            }
            RootSelection::Error(status) => Response::new(
                Decision::Indeterminate(ExtendedIndeterminate::DenyOrPermit),
                status,
            ),
            RootSelection::Matched(def) => {
                debug!(
                    event = "Request",
                    phase = "RootSelection",
                    id = def.id().as_str(),
                );
                let evaluation = def.evaluate(&mut ctx);
                let mut response = Response::new(evaluation.decision, evaluation.status);
                response.obligations = evaluation.obligations;
                response.advice = evaluation.advice;
                response
            }
        };
        response.policy_ids = ctx.take_policy_trail();

        info!(
            event = "Request",
            phase = "Result",
            decision = %response.decision,
            status = %response.status,
        );
        response
    }
}
