//! Thread-backed remote evaluators
use super::{
    EvaluatorConfig, EvaluatorError, EvaluatorState, GlobalVars, PolicyEvaluator, WeightsMap,
};
use crate::filters::FilterMap;
use crate::policy::PolicyId;
use crate::sampler::{RolloutMetrics, SampleBatch};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Resources requested for a remote evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteArgs {
    pub num_cpus: f64,
    pub num_gpus: f64,
    /// Custom resource amounts by name.
    pub resources: BTreeMap<String, f64>,
}

/// Error communicating with a remote evaluator.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("failed to spawn evaluator thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("remote evaluator {worker_index} has terminated")]
    Terminated { worker_index: usize },
    #[error("timed out waiting for remote evaluator {worker_index}")]
    Timeout { worker_index: usize },
    #[error("remote evaluator {worker_index}: {source}")]
    Evaluator {
        worker_index: usize,
        #[source]
        source: EvaluatorError,
    },
}

type Reply<T> = Sender<Result<T, EvaluatorError>>;

enum Request {
    Sample(Reply<SampleBatch>),
    GetWeights(Option<Vec<PolicyId>>, Reply<WeightsMap>),
    SetWeights(Arc<WeightsMap>),
    SetGlobalVars(GlobalVars),
    GetGlobalVars(Reply<GlobalVars>),
    GetFilters { flush_after: bool, reply: Reply<FilterMap> },
    SyncFilters(Arc<FilterMap>),
    Save(Reply<EvaluatorState>),
    Restore(Arc<EvaluatorState>),
    GetMetrics(Reply<Vec<RolloutMetrics>>),
    Terminate,
}

/// The reply to a remote evaluator call.
#[derive(Debug)]
#[must_use]
pub struct Pending<T> {
    receiver: Receiver<Result<T, EvaluatorError>>,
    worker_index: usize,
}

impl<T> Pending<T> {
    /// Block until the reply arrives.
    pub fn get(self) -> Result<T, RemoteError> {
        let worker_index = self.worker_index;
        self.receiver
            .recv()
            .map_err(|_| RemoteError::Terminated { worker_index })?
            .map_err(|source| RemoteError::Evaluator {
                worker_index,
                source,
            })
    }

    /// Block until the reply arrives or the timeout elapses.
    pub fn get_timeout(self, timeout: Duration) -> Result<T, RemoteError> {
        let worker_index = self.worker_index;
        match self.receiver.recv_timeout(timeout) {
            Ok(reply) => reply.map_err(|source| RemoteError::Evaluator {
                worker_index,
                source,
            }),
            Err(RecvTimeoutError::Timeout) => Err(RemoteError::Timeout { worker_index }),
            Err(RecvTimeoutError::Disconnected) => Err(RemoteError::Terminated { worker_index }),
        }
    }
}

/// Handle to a [`PolicyEvaluator`] running in its own thread.
///
/// Calls are messages processed in the order they are sent.
/// Dropping the handle terminates the evaluator and joins its thread.
#[derive(Debug)]
pub struct RemoteEvaluator {
    worker_index: usize,
    resources: RemoteArgs,
    sender: Sender<Request>,
    thread: Option<JoinHandle<()>>,
}

impl RemoteEvaluator {
    /// Build an evaluator in a new thread, waiting until construction completes.
    pub fn spawn(config: EvaluatorConfig, resources: RemoteArgs) -> Result<Self, RemoteError> {
        let worker_index = config.worker_index;
        let (sender, receiver) = channel::unbounded();
        let (ready_tx, ready_rx) = channel::bounded(1);
        let thread = thread::Builder::new()
            .name(format!("evaluator-{}", worker_index))
            .spawn(move || match PolicyEvaluator::new(config) {
                Ok(evaluator) => {
                    let _ = ready_tx.send(Ok(()));
                    serve(evaluator, &receiver);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(RemoteError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!(
                    "remote evaluator {} started with {:?}",
                    worker_index, resources
                );
                Ok(Self {
                    worker_index,
                    resources,
                    sender,
                    thread: Some(thread),
                })
            }
            Ok(Err(source)) => {
                let _ = thread.join();
                Err(RemoteError::Evaluator {
                    worker_index,
                    source,
                })
            }
            Err(_) => {
                let _ = thread.join();
                Err(RemoteError::Terminated { worker_index })
            }
        }
    }

    pub const fn worker_index(&self) -> usize {
        self.worker_index
    }

    pub const fn resources(&self) -> &RemoteArgs {
        &self.resources
    }

    fn send(&self, request: Request) -> Result<(), RemoteError> {
        self.sender
            .send(request)
            .map_err(|_| RemoteError::Terminated {
                worker_index: self.worker_index,
            })
    }

    fn call<T, F>(&self, request: F) -> Result<Pending<T>, RemoteError>
    where
        F: FnOnce(Reply<T>) -> Request,
    {
        let (reply, receiver) = channel::bounded(1);
        self.send(request(reply))?;
        Ok(Pending {
            receiver,
            worker_index: self.worker_index,
        })
    }

    pub fn sample(&self) -> Result<Pending<SampleBatch>, RemoteError> {
        self.call(Request::Sample)
    }

    pub fn get_weights(
        &self,
        policies: Option<Vec<PolicyId>>,
    ) -> Result<Pending<WeightsMap>, RemoteError> {
        self.call(|reply| Request::GetWeights(policies, reply))
    }

    pub fn set_weights(&self, weights: Arc<WeightsMap>) -> Result<(), RemoteError> {
        self.send(Request::SetWeights(weights))
    }

    pub fn set_global_vars(&self, global_vars: GlobalVars) -> Result<(), RemoteError> {
        self.send(Request::SetGlobalVars(global_vars))
    }

    pub fn get_global_vars(&self) -> Result<Pending<GlobalVars>, RemoteError> {
        self.call(Request::GetGlobalVars)
    }

    pub fn get_filters(&self, flush_after: bool) -> Result<Pending<FilterMap>, RemoteError> {
        self.call(|reply| Request::GetFilters { flush_after, reply })
    }

    pub fn sync_filters(&self, filters: Arc<FilterMap>) -> Result<(), RemoteError> {
        self.send(Request::SyncFilters(filters))
    }

    pub fn save(&self) -> Result<Pending<EvaluatorState>, RemoteError> {
        self.call(Request::Save)
    }

    pub fn restore(&self, state: Arc<EvaluatorState>) -> Result<(), RemoteError> {
        self.send(Request::Restore(state))
    }

    pub fn get_metrics(&self) -> Result<Pending<Vec<RolloutMetrics>>, RemoteError> {
        self.call(Request::GetMetrics)
    }

    /// Ask the evaluator thread to exit once earlier messages are processed.
    pub fn terminate(&self) {
        let _ = self.sender.send(Request::Terminate);
    }
}

impl Drop for RemoteEvaluator {
    fn drop(&mut self) {
        self.terminate();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("remote evaluator {} panicked", self.worker_index);
            }
        }
    }
}

fn serve(mut evaluator: PolicyEvaluator, requests: &Receiver<Request>) {
    let worker_index = evaluator.worker_index();
    for request in requests {
        match request {
            Request::Sample(reply) => {
                let _ = reply.send(evaluator.sample());
            }
            Request::GetWeights(policies, reply) => {
                let _ = reply.send(evaluator.get_weights(policies.as_deref()));
            }
            Request::SetWeights(weights) => {
                if let Err(e) = evaluator.set_weights(&weights) {
                    warn!("evaluator {}: set_weights failed: {}", worker_index, e);
                }
            }
            Request::SetGlobalVars(global_vars) => evaluator.set_global_vars(global_vars),
            Request::GetGlobalVars(reply) => {
                let _ = reply.send(Ok(evaluator.get_global_vars().clone()));
            }
            Request::GetFilters { flush_after, reply } => {
                let _ = reply.send(Ok(evaluator.get_filters(flush_after)));
            }
            Request::SyncFilters(filters) => {
                if let Err(e) = evaluator.sync_filters(&filters) {
                    warn!("evaluator {}: sync_filters failed: {}", worker_index, e);
                }
            }
            Request::Save(reply) => {
                let _ = reply.send(Ok(evaluator.save()));
            }
            Request::Restore(state) => {
                if let Err(e) = evaluator.restore(&state) {
                    warn!("evaluator {}: restore failed: {}", worker_index, e);
                }
            }
            Request::GetMetrics(reply) => {
                let _ = reply.send(Ok(evaluator.get_metrics()));
            }
            Request::Terminate => break,
        }
    }
    debug!("remote evaluator {} stopped", worker_index);
}
