//! Solver configuration.

/// Smallest edge weight kept by [`WeightPolicy::Clamped`].
pub const MIN_EDGE_WEIGHT: f64 = 1e-6;

/// How cotangent weights are post-processed after accumulation.
///
/// Cotangent weights go negative on edges opposite obtuse angles. Negative
/// weights can make the constrained Laplacian indefinite, in which case the
/// Cholesky factorization is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightPolicy {
    /// Floor every edge weight at [`MIN_EDGE_WEIGHT`].
    #[default]
    Clamped,
    /// Keep raw cotangent weights, including negative ones.
    Raw,
}

impl WeightPolicy {
    /// Apply the policy to an accumulated edge weight.
    #[inline]
    pub fn apply(self, weight: f64) -> f64 {
        match self {
            WeightPolicy::Clamped => weight.max(MIN_EDGE_WEIGHT),
            WeightPolicy::Raw => weight,
        }
    }
}

/// Options for ARAP deformation.
#[derive(Debug, Clone)]
pub struct ArapOptions {
    /// Number of local/global rounds per `compute_deformation` call.
    pub iterations: usize,

    /// Whether to fit rotations in parallel (default: true).
    pub parallel: bool,

    /// Post-processing of cotangent weights, applied at `init`.
    pub weight_policy: WeightPolicy,
}

impl Default for ArapOptions {
    fn default() -> Self {
        Self {
            iterations: 5,
            parallel: true,
            weight_policy: WeightPolicy::Clamped,
        }
    }
}

impl ArapOptions {
    /// Create options with the specified number of iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the weight post-processing policy.
    pub fn with_weight_policy(mut self, policy: WeightPolicy) -> Self {
        self.weight_policy = policy;
        self
    }
}
