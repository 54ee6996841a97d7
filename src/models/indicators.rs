//! Derived performance indicators.
//!
//! Indicators are a pure function of a canonical record and are never
//! persisted: the scoring rules can change without invalidating cached
//! raw records, since every read recomputes them.

use serde::Serialize;

use super::PerformanceRecord;

/// Overall score thresholds for the qualitative level bands.
const EXCELLENT_THRESHOLD: u8 = 75;
const GOOD_THRESHOLD: u8 = 50;
const AVERAGE_THRESHOLD: u8 = 30;

/// Qualitative band for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl PerformanceLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= EXCELLENT_THRESHOLD {
            PerformanceLevel::Excellent
        } else if score >= GOOD_THRESHOLD {
            PerformanceLevel::Good
        } else if score >= AVERAGE_THRESHOLD {
            PerformanceLevel::Average
        } else {
            PerformanceLevel::NeedsImprovement
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "Excellent",
            PerformanceLevel::Good => "Good",
            PerformanceLevel::Average => "Average",
            PerformanceLevel::NeedsImprovement => "Needs Improvement",
        }
    }

    /// Presentation metadata consumed by the dashboard, not business logic.
    pub fn color(&self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "#4CAF50",
            PerformanceLevel::Good => "#8BC34A",
            PerformanceLevel::Average => "#FFC107",
            PerformanceLevel::NeedsImprovement => "#F44336",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "✅",
            PerformanceLevel::Good => "👍",
            PerformanceLevel::Average => "⚠️",
            PerformanceLevel::NeedsImprovement => "❌",
        }
    }
}

/// Employment-depth rating on average days per household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EmploymentRating {
    High,
    Medium,
    Low,
}

/// Rating band used for demand fulfillment and payment timeliness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QualityRating {
    Excellent,
    Good,
    Poor,
}

fn quality_rating(percent: f64) -> QualityRating {
    if percent >= 80.0 {
        QualityRating::Excellent
    } else if percent >= 60.0 {
        QualityRating::Good
    } else {
        QualityRating::Poor
    }
}

/// Derived view over one performance record.
#[derive(Debug, Clone, Serialize)]
pub struct Indicators {
    pub overall_score: u8,
    pub performance_level: PerformanceLevel,
    pub performance_color: &'static str,
    pub performance_icon: &'static str,

    pub employment_rating: EmploymentRating,
    pub demand_fulfillment_rating: QualityRating,
    pub payment_timeliness_rating: QualityRating,

    pub employment_rate: u32,
    pub budget_utilization: u32,
    pub women_participation: u32,
    pub payment_efficiency: u32,
    pub work_completion_rate: u32,
    pub households_100_days_percent: u32,
}

/// Percentage ratio rounded to the nearest integer; 0 when the
/// denominator is zero.
fn percent(numerator: f64, denominator: f64) -> u32 {
    if denominator > 0.0 {
        (numerator / denominator * 100.0).round().max(0.0) as u32
    } else {
        0
    }
}

impl Indicators {
    /// Compute the composite score and rating bands for a record.
    ///
    /// A component only contributes when strictly positive: a zero metric
    /// means the period did not report it, not that performance was zero.
    pub fn compute(record: &PerformanceRecord) -> Self {
        let avg_days = record.average_days_per_household;
        let demand_fulfilled = record.employment_demand_fulfilled_percent;
        let payment_timeliness = record.payment_within_15_days_percent;

        let mut score = 0.0;
        let mut components = 0u32;

        if avg_days > 0.0 {
            score += avg_days.min(100.0);
            components += 1;
        }
        if demand_fulfilled > 0.0 {
            score += demand_fulfilled;
            components += 1;
        }
        if payment_timeliness > 0.0 {
            score += payment_timeliness;
            components += 1;
        }

        let overall_score = if components > 0 {
            (score / components as f64).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        let level = PerformanceLevel::from_score(overall_score);

        let employment_rating = if avg_days >= 80.0 {
            EmploymentRating::High
        } else if avg_days >= 50.0 {
            EmploymentRating::Medium
        } else {
            EmploymentRating::Low
        };

        Self {
            overall_score,
            performance_level: level,
            performance_color: level.color(),
            performance_icon: level.icon(),

            employment_rating,
            demand_fulfillment_rating: quality_rating(demand_fulfilled),
            payment_timeliness_rating: quality_rating(payment_timeliness),

            employment_rate: percent(record.total_individuals_worked, record.active_workers),
            budget_utilization: percent(record.person_days_generated, record.approved_labour_budget)
                .min(100),
            women_participation: percent(record.women_persondays, record.person_days_generated),
            payment_efficiency: payment_timeliness.round().max(0.0) as u32,
            work_completion_rate: percent(record.total_works_completed, record.total_works_takenup),
            households_100_days_percent: percent(
                record.households_completed_100_days,
                record.households_employed,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(avg_days: f64, demand: f64, payment: f64) -> PerformanceRecord {
        PerformanceRecord {
            average_days_per_household: avg_days,
            employment_demand_fulfilled_percent: demand,
            payment_within_15_days_percent: payment,
            ..PerformanceRecord::default()
        }
    }

    #[test]
    fn test_worked_example_scores_77_excellent() {
        // 400 active of 500 registered workers gives 80% demand fulfilled
        let record = record_with(60.0, 80.0, 90.0);
        let indicators = Indicators::compute(&record);
        assert_eq!(indicators.overall_score, 77); // round((60 + 80 + 90) / 3)
        assert_eq!(indicators.performance_level, PerformanceLevel::Excellent);
    }

    #[test]
    fn test_zero_components_score_zero() {
        let indicators = Indicators::compute(&record_with(0.0, 0.0, 0.0));
        assert_eq!(indicators.overall_score, 0);
        assert_eq!(
            indicators.performance_level,
            PerformanceLevel::NeedsImprovement
        );
    }

    #[test]
    fn test_zero_components_skipped_not_averaged() {
        // Only payment reports: score is that component alone, not a
        // mean over three with zeros dragging it down.
        let indicators = Indicators::compute(&record_with(0.0, 0.0, 90.0));
        assert_eq!(indicators.overall_score, 90);
    }

    #[test]
    fn test_avg_days_component_capped_at_100() {
        let indicators = Indicators::compute(&record_with(130.0, 0.0, 0.0));
        assert_eq!(indicators.overall_score, 100);
    }

    #[test]
    fn test_level_thresholds_exact_and_adjacent() {
        let cases = [
            (75, PerformanceLevel::Excellent),
            (74, PerformanceLevel::Good),
            (76, PerformanceLevel::Excellent),
            (50, PerformanceLevel::Good),
            (49, PerformanceLevel::Average),
            (51, PerformanceLevel::Good),
            (30, PerformanceLevel::Average),
            (29, PerformanceLevel::NeedsImprovement),
            (31, PerformanceLevel::Average),
            (0, PerformanceLevel::NeedsImprovement),
            (100, PerformanceLevel::Excellent),
        ];
        for (score, expected) in cases {
            assert_eq!(PerformanceLevel::from_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_score_in_range_for_extreme_inputs() {
        let indicators = Indicators::compute(&record_with(100.0, 100.0, 100.0));
        assert!(indicators.overall_score <= 100);
        assert_eq!(indicators.overall_score, 100);
    }

    #[test]
    fn test_category_ratings() {
        let indicators = Indicators::compute(&record_with(85.0, 65.0, 40.0));
        assert_eq!(indicators.employment_rating, EmploymentRating::High);
        assert_eq!(indicators.demand_fulfillment_rating, QualityRating::Good);
        assert_eq!(indicators.payment_timeliness_rating, QualityRating::Poor);

        let indicators = Indicators::compute(&record_with(50.0, 80.0, 60.0));
        assert_eq!(indicators.employment_rating, EmploymentRating::Medium);
        assert_eq!(
            indicators.demand_fulfillment_rating,
            QualityRating::Excellent
        );
        assert_eq!(indicators.payment_timeliness_rating, QualityRating::Good);
    }

    #[test]
    fn test_ratios_zero_denominator_yield_zero() {
        let record = PerformanceRecord {
            total_individuals_worked: 100.0,
            total_works_completed: 5.0,
            households_completed_100_days: 9.0,
            women_persondays: 500.0,
            ..PerformanceRecord::default()
        };
        let indicators = Indicators::compute(&record);
        assert_eq!(indicators.employment_rate, 0);
        assert_eq!(indicators.work_completion_rate, 0);
        assert_eq!(indicators.households_100_days_percent, 0);
        assert_eq!(indicators.women_participation, 0);
        assert_eq!(indicators.budget_utilization, 0);
    }

    #[test]
    fn test_budget_utilization_capped() {
        let record = PerformanceRecord {
            person_days_generated: 250_000.0,
            approved_labour_budget: 100_000.0,
            ..PerformanceRecord::default()
        };
        let indicators = Indicators::compute(&record);
        assert_eq!(indicators.budget_utilization, 100);
    }

    #[test]
    fn test_ratio_helpers() {
        let record = PerformanceRecord {
            total_individuals_worked: 380.0,
            active_workers: 400.0,
            total_works_completed: 30.0,
            total_works_takenup: 120.0,
            households_employed: 200.0,
            households_completed_100_days: 25.0,
            ..PerformanceRecord::default()
        };
        let indicators = Indicators::compute(&record);
        assert_eq!(indicators.employment_rate, 95);
        assert_eq!(indicators.work_completion_rate, 25);
        assert_eq!(indicators.households_100_days_percent, 13); // 12.5 rounds up
    }
}
