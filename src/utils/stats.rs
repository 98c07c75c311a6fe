use ndarray::Array1;
use num_traits::{real::Real, Zero};
use serde::{Deserialize, Serialize};
use std::iter::{Extend, FromIterator};

/// Online mean and variance calculation using Welford's Algorithm
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OnlineMeanVariance<T> {
    mean: T,
    squared_residual_sum: T,
    count: u64,
}

impl<T: Zero> Default for OnlineMeanVariance<T> {
    fn default() -> Self {
        Self {
            mean: T::zero(),
            squared_residual_sum: T::zero(),
            count: 0,
        }
    }
}

impl<T: Copy> OnlineMeanVariance<T> {
    /// The mean of all accumulated values. `None` if no values have been added.
    pub const fn mean(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean)
        }
    }

    /// Number of accumulated values.
    pub const fn count(&self) -> u64 {
        self.count
    }
}

impl<T: Real> OnlineMeanVariance<T> {
    /// The (population) variance of all accumulated values.
    pub fn variance(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.squared_residual_sum / T::from(self.count)?)
        }
    }

    /// Add a new value to the calculation.
    pub fn push(&mut self, value: T) {
        let residual_pre = value - self.mean;
        self.count += 1;
        self.mean = self.mean + residual_pre / T::from(self.count).unwrap();
        let residual_post = value - self.mean;
        self.squared_residual_sum = self.squared_residual_sum + residual_pre * residual_post;
    }
}

impl<T: Real> Extend<T> for OnlineMeanVariance<T> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        for value in iter {
            self.push(value)
        }
    }
}

impl<T: Real> FromIterator<T> for OnlineMeanVariance<T> {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut s = Self::default();
        s.extend(iter);
        s
    }
}

/// Element-wise running mean and variance of fixed-size vectors.
///
/// Two running stats over disjoint samples can be combined with [`RunningStat::update`]
/// (Chan et al. parallel variance), which is how worker statistics are merged into the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStat {
    count: u64,
    mean: Array1<f64>,
    squared_residual_sum: Array1<f64>,
}

impl RunningStat {
    pub fn new(dim: usize) -> Self {
        Self {
            count: 0,
            mean: Array1::zeros(dim),
            squared_residual_sum: Array1::zeros(dim),
        }
    }

    pub const fn count(&self) -> u64 {
        self.count
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub const fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Sample variance; the squared mean while only one sample has been seen.
    pub fn variance(&self) -> Array1<f64> {
        if self.count > 1 {
            &self.squared_residual_sum / (self.count - 1) as f64
        } else {
            self.mean.mapv(|m| m * m)
        }
    }

    pub fn std(&self) -> Array1<f64> {
        self.variance().mapv(f64::sqrt)
    }

    /// Add a sample.
    ///
    /// # Panics
    /// If the sample does not have the same length as the statistic.
    pub fn push(&mut self, value: &Array1<f64>) {
        assert_eq!(value.len(), self.dim(), "running stat dimension mismatch");
        self.count += 1;
        if self.count == 1 {
            self.mean.assign(value);
        } else {
            let residual_pre = value - &self.mean;
            self.mean.scaled_add(1.0 / self.count as f64, &residual_pre);
            let residual_post = value - &self.mean;
            self.squared_residual_sum += &(&residual_pre * &residual_post);
        }
    }

    /// Merge the samples summarized by `other` into this statistic.
    pub fn update(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let n1 = self.count as f64;
        let n2 = other.count as f64;
        let n = n1 + n2;
        let delta = &other.mean - &self.mean;
        let delta_sq = &delta * &delta;
        self.mean.scaled_add(n2 / n, &delta);
        self.squared_residual_sum += &other.squared_residual_sum;
        self.squared_residual_sum.scaled_add(n1 * n2 / n, &delta_sq);
        self.count += other.count;
    }

    /// Drop all samples, keeping the dimension.
    pub fn clear(&mut self) {
        self.count = 0;
        self.mean.fill(0.0);
        self.squared_residual_sum.fill(0.0);
    }
}
