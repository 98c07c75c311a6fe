use super::{EvaluatorError, RemoteError, RemoteEvaluator};
use crate::filters::FilterMap;
use std::sync::Arc;

/// Synchronizes observation filters between the driver and remote evaluators.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FilterManager;

impl FilterManager {
    /// Merge the statistics gathered by each remote into `local_filters`.
    ///
    /// Remote filter buffers are flushed as they are read. When `update_remote` is set,
    /// every remote then receives a copy of the merged filters.
    pub fn synchronize(
        local_filters: &mut FilterMap,
        remotes: &[RemoteEvaluator],
        update_remote: bool,
    ) -> Result<(), RemoteError> {
        let pending = remotes
            .iter()
            .map(|remote| remote.get_filters(true))
            .collect::<Result<Vec<_>, _>>()?;
        for (remote, reply) in remotes.iter().zip(pending) {
            let remote_filters = reply.get()?;
            for (id, filter) in local_filters.iter_mut() {
                if let Some(remote_filter) = remote_filters.get(id) {
                    filter
                        .apply_changes(remote_filter, false)
                        .map_err(|source| RemoteError::Evaluator {
                            worker_index: remote.worker_index(),
                            source: EvaluatorError::Filter {
                                id: id.clone(),
                                source,
                            },
                        })?;
                }
            }
        }
        if update_remote {
            let copies = Arc::new(local_filters.clone());
            for remote in remotes {
                remote.sync_filters(Arc::clone(&copies))?;
            }
        }
        Ok(())
    }
}
