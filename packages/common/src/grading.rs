use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight of the regular (coursework) component in the total.
pub const REGULAR_WEIGHT: f64 = 0.3;
/// Weight of the midterm exam in the total.
pub const MIDTERM_WEIGHT: f64 = 0.3;
/// Weight of the final exam in the total.
pub const FINAL_WEIGHT: f64 = 0.4;

/// Letter band derived from a weighted total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum GradeLevel {
    A,
    B,
    C,
    D,
    F,
}

impl GradeLevel {
    /// Inclusive lower bounds, highest band first. Anything below the last bound is `F`.
    const CUTOFFS: &'static [(f64, GradeLevel)] = &[
        (90.0, GradeLevel::A),
        (80.0, GradeLevel::B),
        (70.0, GradeLevel::C),
        (60.0, GradeLevel::D),
    ];

    /// Bucket a total into its band. Non-finite totals fall into `F`.
    pub fn from_total(total: f64) -> Self {
        Self::CUTOFFS
            .iter()
            .find(|(bound, _)| total >= *bound)
            .map(|(_, level)| *level)
            .unwrap_or(GradeLevel::F)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived view of a score record. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GradeSummary {
    #[schema(example = 81.0)]
    pub total: f64,
    pub grade_level: GradeLevel,
}

impl GradeSummary {
    /// Returned whenever a component is missing or not a number.
    pub const FALLBACK: GradeSummary = GradeSummary {
        total: 0.0,
        grade_level: GradeLevel::F,
    };
}

/// Compute the weighted total and letter band for three component scores.
///
/// Inputs are expected in `[0, 100]` but are not re-checked here. A missing or
/// non-finite component yields [`GradeSummary::FALLBACK`] instead of an error.
pub fn summarize(regular: Option<f64>, midterm: Option<f64>, final_exam: Option<f64>) -> GradeSummary {
    let (Some(regular), Some(midterm), Some(final_exam)) = (regular, midterm, final_exam) else {
        return GradeSummary::FALLBACK;
    };
    if !(regular.is_finite() && midterm.is_finite() && final_exam.is_finite()) {
        return GradeSummary::FALLBACK;
    }

    let total = round2(regular * REGULAR_WEIGHT + midterm * MIDTERM_WEIGHT + final_exam * FINAL_WEIGHT);
    GradeSummary {
        total,
        grade_level: GradeLevel::from_total(total),
    }
}

/// Round to two decimal places. An exact half-cent goes to the even digit.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
