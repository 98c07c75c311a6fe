//! Observation filters
//!
//! Filters normalize observations with statistics gathered during sampling.
//! Each evaluator keeps one filter per policy; the driver periodically merges worker
//! statistics (see [`crate::evaluation::FilterManager`]).
use crate::config::FilterKind;
use crate::utils::stats::RunningStat;
use crate::Observation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Error combining two filters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("cannot combine a {found} filter into a {expected} filter")]
pub struct FilterKindMismatch {
    pub expected: FilterKind,
    pub found: FilterKind,
}

/// Filters by policy id.
pub type FilterMap = BTreeMap<String, Filter>;

/// Element-wise observation filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Passes observations through unchanged.
    NoFilter,
    /// Normalizes observations by a running mean and standard deviation.
    MeanStd(MeanStdFilter),
}

impl Filter {
    /// Create a filter of the given kind for observations of length `dim`.
    pub fn new(kind: FilterKind, dim: usize) -> Self {
        match kind {
            FilterKind::NoFilter => Self::NoFilter,
            FilterKind::MeanStdFilter => Self::MeanStd(MeanStdFilter::new(dim)),
        }
    }

    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::NoFilter => FilterKind::NoFilter,
            Self::MeanStd(_) => FilterKind::MeanStdFilter,
        }
    }

    /// Filter an observation, updating the statistics if `update` is set.
    pub fn apply(&mut self, observation: &Observation, update: bool) -> Observation {
        match self {
            Self::NoFilter => observation.clone(),
            Self::MeanStd(filter) => filter.apply(observation, update),
        }
    }

    /// Incorporate the statistics `other` has gathered since its buffer was last cleared.
    ///
    /// If `with_buffer` is set the buffer of `other` is copied as well.
    pub fn apply_changes(
        &mut self,
        other: &Self,
        with_buffer: bool,
    ) -> Result<(), FilterKindMismatch> {
        match (self, other) {
            (Self::NoFilter, Self::NoFilter) => Ok(()),
            (Self::MeanStd(this), Self::MeanStd(other)) => {
                this.apply_changes(other, with_buffer);
                Ok(())
            }
            (this, other) => Err(this.mismatch(other)),
        }
    }

    /// Replace this filter's state with a copy of `other`.
    pub fn sync(&mut self, other: &Self) -> Result<(), FilterKindMismatch> {
        match (self, other) {
            (Self::NoFilter, Self::NoFilter) => Ok(()),
            (Self::MeanStd(this), Self::MeanStd(other)) => {
                this.sync(other);
                Ok(())
            }
            (this, other) => Err(this.mismatch(other)),
        }
    }

    const fn mismatch(&self, other: &Self) -> FilterKindMismatch {
        FilterKindMismatch {
            expected: self.kind(),
            found: other.kind(),
        }
    }

    /// Forget the statistics gathered since the last flush.
    pub fn clear_buffer(&mut self) {
        if let Self::MeanStd(filter) = self {
            filter.clear_buffer()
        }
    }
}

/// Running mean / standard deviation observation filter.
///
/// `rs` holds all statistics known to this filter; `buffer` holds only the samples seen
/// since the last flush, which are the changes another filter needs to merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanStdFilter {
    pub demean: bool,
    pub destd: bool,
    /// Filtered values are clipped to `[-clip, clip]`.
    pub clip: Option<f64>,
    rs: RunningStat,
    buffer: RunningStat,
}

impl MeanStdFilter {
    pub fn new(dim: usize) -> Self {
        Self {
            demean: true,
            destd: true,
            clip: Some(10.0),
            rs: RunningStat::new(dim),
            buffer: RunningStat::new(dim),
        }
    }

    pub const fn running_stat(&self) -> &RunningStat {
        &self.rs
    }

    pub const fn buffer(&self) -> &RunningStat {
        &self.buffer
    }

    pub fn apply(&mut self, observation: &Observation, update: bool) -> Observation {
        if update {
            self.rs.push(observation);
            self.buffer.push(observation);
        }
        let mut x = observation.clone();
        if self.demean {
            x -= self.rs.mean();
        }
        if self.destd {
            x /= &(self.rs.std() + 1e-8);
        }
        if let Some(clip) = self.clip {
            x.mapv_inplace(|v| v.clamp(-clip, clip));
        }
        x
    }

    pub fn apply_changes(&mut self, other: &Self, with_buffer: bool) {
        self.rs.update(&other.buffer);
        if with_buffer {
            self.buffer = other.buffer.clone();
        }
    }

    pub fn sync(&mut self, other: &Self) {
        self.demean = other.demean;
        self.destd = other.destd;
        self.clip = other.clip;
        self.rs = other.rs.clone();
        self.buffer = other.buffer.clone();
    }

    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }
}
