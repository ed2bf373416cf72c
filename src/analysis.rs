//! Algorithm selection and per-algorithm tuning parameters.
//!
//! Each supported analysis is a variant of [`AlgorithmConfig`], a closed set:
//! adding an algorithm means adding a variant, and every dispatch site is an
//! exhaustive match checked at compile time. Parameters are validated at
//! construction, so a config that reaches a worker is always in range, and
//! nothing mutates it after hand-off.

use thiserror::Error;

/// Default convergence tolerance for Naive Bayes runs.
pub const DEFAULT_TOLERANCE: f64 = 0.05;
/// Default training share (percent) for decision-tree runs.
pub const DEFAULT_PERCENT_SPLIT: u8 = 65;

/// Which analysis family a configuration selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    NaiveBayes,
    DecisionTrees,
}

impl AlgorithmKind {
    /// Human-readable name used in status messages.
    pub fn label(self) -> &'static str {
        match self {
            AlgorithmKind::NaiveBayes => "Naive Bayes",
            AlgorithmKind::DecisionTrees => "Decision Trees",
        }
    }
}

/// Clustering method paired with an analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusteringKind {
    #[default]
    KMeans,
}

impl ClusteringKind {
    pub fn label(self) -> &'static str {
        match self {
            ClusteringKind::KMeans => "k-means",
        }
    }
}

/// Parameter rejected at construction time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// Tolerance must lie in `(0, 1]`.
    #[error("tolerance must be greater than 0 and at most 1, got {0}")]
    ToleranceOutOfRange(f64),
    /// Percent split must lie in `[1, 99]` so both partitions are non-empty.
    #[error("percent split must be between 1 and 99, got {0}")]
    PercentSplitOutOfRange(u8),
}

/// Tuning for a Naive Bayes run.
#[derive(Debug, Clone, PartialEq)]
pub struct NaiveBayesConfig {
    clustering: ClusteringKind,
    tolerance: f64,
}

impl NaiveBayesConfig {
    /// Build a config with the given convergence tolerance, `(0, 1]`.
    pub fn new(tolerance: f64) -> Result<Self, ConfigurationError> {
        if !tolerance.is_finite() || tolerance <= 0.0 || tolerance > 1.0 {
            return Err(ConfigurationError::ToleranceOutOfRange(tolerance));
        }
        Ok(Self {
            clustering: ClusteringKind::KMeans,
            tolerance,
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Default for NaiveBayesConfig {
    fn default() -> Self {
        Self {
            clustering: ClusteringKind::KMeans,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Tuning for a decision-tree run.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTreesConfig {
    clustering: ClusteringKind,
    percent_split: u8,
}

impl DecisionTreesConfig {
    /// Build a config that trains on `percent_split` percent of the dataset,
    /// `[1, 99]`, and tests on the rest.
    pub fn new(percent_split: u8) -> Result<Self, ConfigurationError> {
        if !(1..=99).contains(&percent_split) {
            return Err(ConfigurationError::PercentSplitOutOfRange(percent_split));
        }
        Ok(Self {
            clustering: ClusteringKind::KMeans,
            percent_split,
        })
    }

    /// Share of the dataset used for training, in percent.
    pub fn percent_split(&self) -> u8 {
        self.percent_split
    }

    /// Share of the dataset held out for testing; both shares sum to 100.
    pub fn test_percent(&self) -> u8 {
        100 - self.percent_split
    }
}

impl Default for DecisionTreesConfig {
    fn default() -> Self {
        Self {
            clustering: ClusteringKind::KMeans,
            percent_split: DEFAULT_PERCENT_SPLIT,
        }
    }
}

/// One fully-specified analysis run. Immutable once handed to a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmConfig {
    NaiveBayes(NaiveBayesConfig),
    DecisionTrees(DecisionTreesConfig),
}

impl AlgorithmConfig {
    /// Build the default configuration for `kind`.
    pub fn default_for(kind: AlgorithmKind) -> Self {
        match kind {
            AlgorithmKind::NaiveBayes => Self::NaiveBayes(NaiveBayesConfig::default()),
            AlgorithmKind::DecisionTrees => Self::DecisionTrees(DecisionTreesConfig::default()),
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        match self {
            Self::NaiveBayes(_) => AlgorithmKind::NaiveBayes,
            Self::DecisionTrees(_) => AlgorithmKind::DecisionTrees,
        }
    }

    pub fn clustering(&self) -> ClusteringKind {
        match self {
            Self::NaiveBayes(config) => config.clustering,
            Self::DecisionTrees(config) => config.clustering,
        }
    }

    /// One-line description of the run for status messages.
    pub fn summary(&self) -> String {
        match self {
            Self::NaiveBayes(config) => format!(
                "{} with {} clustering (tolerance {})",
                self.kind().label(),
                self.clustering().label(),
                config.tolerance()
            ),
            Self::DecisionTrees(config) => format!(
                "{} with {} clustering ({}% train / {}% test)",
                self.kind().label(),
                self.clustering().label(),
                config.percent_split(),
                config.test_percent()
            ),
        }
    }
}
