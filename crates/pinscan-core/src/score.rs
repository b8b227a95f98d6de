use serde::{Deserialize, Serialize};

use crate::report::{DependencyKind, PinningReport};

/// Supply-chain hygiene score calculator.
///
/// Evaluates a repository on two axes: how much of its external surface is
/// pinned to immutable references, and whether anything is fetched and
/// executed insecurely.
#[derive(Debug, Clone)]
pub struct HygieneScoreCalculator {
    weights: HygieneScoreWeights,
}

/// Configurable weights for score components.
#[derive(Debug, Clone)]
pub struct HygieneScoreWeights {
    pub pinning: f64,
    pub insecure_downloads: f64,
}

impl Default for HygieneScoreWeights {
    fn default() -> Self {
        Self {
            pinning: 0.6,
            insecure_downloads: 0.4,
        }
    }
}

/// Score result with component breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HygieneScore {
    /// Overall score (0-100).
    pub total_score: f64,
    pub pinning_score: f64,
    pub insecure_download_score: f64,
    pub grade: HygieneGrade,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HygieneGrade {
    Excellent, // 90-100
    Good,      // 75-89
    Fair,      // 60-74
    Poor,      // 40-59
    Critical,  // 0-39
}

impl HygieneGrade {
    pub fn label(&self) -> &str {
        match self {
            HygieneGrade::Excellent => "Excellent",
            HygieneGrade::Good => "Good",
            HygieneGrade::Fair => "Fair",
            HygieneGrade::Poor => "Poor",
            HygieneGrade::Critical => "Critical",
        }
    }
}

impl Default for HygieneScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl HygieneScoreCalculator {
    pub fn new() -> Self {
        Self {
            weights: HygieneScoreWeights::default(),
        }
    }

    pub fn with_weights(weights: HygieneScoreWeights) -> Self {
        Self { weights }
    }

    pub fn calculate(&self, report: &PinningReport) -> HygieneScore {
        let pinnable = report
            .dependencies
            .iter()
            .filter(|d| !d.kind.is_insecure_fetch())
            .count();
        let pinned = report.pinned_count();

        // Pinning score (0-100); an empty surface is clean.
        let pinning_score = if pinnable == 0 {
            100.0
        } else {
            pinned as f64 / pinnable as f64 * 100.0
        };

        // Each fetch-and-execute costs a flat chunk.
        let insecure = report.count_of(DependencyKind::DownloadThenRun);
        let insecure_download_score = (100.0 - insecure as f64 * 25.0).max(0.0);

        let total_score = pinning_score * self.weights.pinning
            + insecure_download_score * self.weights.insecure_downloads;

        HygieneScore {
            total_score,
            pinning_score,
            insecure_download_score,
            grade: Self::score_to_grade(total_score),
            recommendations: Self::generate_recommendations(report, pinnable - pinned, insecure),
        }
    }

    fn score_to_grade(score: f64) -> HygieneGrade {
        if score >= 90.0 {
            HygieneGrade::Excellent
        } else if score >= 75.0 {
            HygieneGrade::Good
        } else if score >= 60.0 {
            HygieneGrade::Fair
        } else if score >= 40.0 {
            HygieneGrade::Poor
        } else {
            HygieneGrade::Critical
        }
    }

    fn generate_recommendations(
        report: &PinningReport,
        unpinned: usize,
        insecure: usize,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if insecure > 0 {
            recommendations.push(format!(
                "Replace {insecure} download-then-run pattern(s) with verified, checksummed artifacts"
            ));
        }
        let actions = report
            .dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::GithubAction && !d.pinned)
            .count();
        if actions > 0 {
            recommendations
                .push(format!("Pin {actions} GitHub Action(s) to full commit SHAs"));
        }
        let images = report
            .dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::DockerImage && !d.pinned)
            .count();
        if images > 0 {
            recommendations
                .push(format!("Pin {images} container base image(s) to sha256 digests"));
        }
        let installs = unpinned.saturating_sub(actions + images);
        if installs > 0 {
            recommendations.push(format!(
                "Lock {installs} package-manager install(s) to exact versions or hashes"
            ));
        }
        if recommendations.is_empty() {
            recommendations.push("All external dependencies are pinned".to_string());
        }

        recommendations
    }
}
