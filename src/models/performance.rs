//! Canonical performance records and upstream normalization.
//!
//! Upstream field values arrive as strings, numbers or nulls depending on
//! the reporting period, so every numeric field goes through a tolerant
//! parse: anything that is not a number becomes `0.0`, never an error.

use serde::{Deserialize, Serialize};

use crate::api::RawRecord;

/// Assumed average working days per worker, used to estimate the number
/// of women workers from women person-days. The API reports person-days
/// only.
const AVG_WORKING_DAYS_PER_WORKER: f64 = 50.0;

/// Demand-fulfilled estimate used when the worker registry total is
/// missing or zero for a period.
const DEMAND_FULFILLED_FALLBACK: f64 = 85.0;

/// One district's monthly MGNREGA snapshot in canonical field names.
/// Identity is (`district_code`, `financial_year`, `month`); a re-sync
/// for the same period replaces the prior snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    // Identity
    pub district_code: String,
    pub district_name: String,
    pub state_code: String,
    pub state_name: String,
    pub financial_year: String,
    pub month: String,

    // Job cards and workers
    pub total_job_cards_issued: f64,
    pub active_job_cards: f64,
    pub total_workers: f64,
    pub active_workers: f64,
    pub total_individuals_worked: f64,

    // Person-days and households
    pub person_days_generated: f64,
    pub households_employed: f64,
    pub average_days_per_household: f64,
    pub households_completed_100_days: f64,

    // Demographic breakdown
    pub women_persondays: f64,
    pub women_workers: f64,
    pub sc_workers: f64,
    pub sc_persondays: f64,
    pub st_workers: f64,
    pub st_persondays: f64,
    pub differently_abled_persons_worked: f64,

    // Expenditure
    pub total_expenditure: f64,
    pub wage_expenditure: f64,
    pub material_expenditure: f64,
    pub admin_expenditure: f64,
    pub average_wage_per_day: f64,

    // Works
    pub total_works_takenup: f64,
    pub total_works_ongoing: f64,
    pub total_works_completed: f64,

    // Reported indicators
    pub approved_labour_budget: f64,
    pub payment_within_15_days_percent: f64,
    pub percent_category_b_works: f64,
    pub percent_nrm_expenditure: f64,
    pub percent_agriculture_expenditure: f64,
    pub number_of_gps_with_nil_exp: f64,

    // Derived
    pub employment_demand_fulfilled_percent: f64,

    // Meta
    pub data_source: String,
    pub remarks: String,
}

/// Tolerant numeric parse: missing, null, empty or non-numeric → 0.0.
fn number(record: &RawRecord, key: &str) -> f64 {
    match record.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn text(record: &RawRecord, key: &str) -> String {
    match record.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn text_or(record: &RawRecord, key: &str, fallback: &str) -> String {
    let value = text(record, key);
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

impl PerformanceRecord {
    /// Normalize a raw upstream record into the canonical shape.
    ///
    /// The upstream key → canonical field mapping below is the complete
    /// fixed table; upstream keys not listed here are dropped.
    pub fn from_raw(record: &RawRecord) -> Self {
        let women_persondays = number(record, "Women_Persondays");

        Self {
            district_code: text(record, "district_code"),
            district_name: text(record, "district_name"),
            state_code: text(record, "state_code"),
            state_name: text(record, "state_name"),
            financial_year: text_or(record, "fin_year", "N/A"),
            month: text_or(record, "month", "N/A"),

            total_job_cards_issued: number(record, "Total_No_of_JobCards_issued"),
            active_job_cards: number(record, "Total_No_of_Active_Job_Cards"),
            total_workers: number(record, "Total_No_of_Workers"),
            active_workers: number(record, "Total_No_of_Active_Workers"),
            total_individuals_worked: number(record, "Total_Individuals_Worked"),

            person_days_generated: number(record, "Persondays_of_Central_Liability_so_far"),
            households_employed: number(record, "Total_Households_Worked"),
            average_days_per_household: number(
                record,
                "Average_days_of_employment_provided_per_Household",
            ),
            households_completed_100_days: number(
                record,
                "Total_No_of_HHs_completed_100_Days_of_Wage_Employment",
            ),

            women_persondays,
            women_workers: (women_persondays / AVG_WORKING_DAYS_PER_WORKER).round(),
            sc_workers: number(record, "SC_workers_against_active_workers"),
            sc_persondays: number(record, "SC_persondays"),
            st_workers: number(record, "ST_workers_against_active_workers"),
            st_persondays: number(record, "ST_persondays"),
            differently_abled_persons_worked: number(record, "Differently_abled_persons_worked"),

            total_expenditure: number(record, "Total_Exp"),
            wage_expenditure: number(record, "Wages"),
            material_expenditure: number(record, "Material_and_skilled_Wages"),
            admin_expenditure: number(record, "Total_Adm_Expenditure"),
            average_wage_per_day: number(record, "Average_Wage_rate_per_day_per_person"),

            total_works_takenup: number(record, "Total_No_of_Works_Takenup"),
            total_works_ongoing: number(record, "Number_of_Ongoing_Works"),
            total_works_completed: number(record, "Number_of_Completed_Works"),

            approved_labour_budget: number(record, "Approved_Labour_Budget"),
            // Upstream's own spelling of this field is misspelled
            payment_within_15_days_percent: number(
                record,
                "percentage_payments_gererated_within_15_days",
            ),
            percent_category_b_works: number(record, "percent_of_Category_B_Works"),
            percent_nrm_expenditure: number(record, "percent_of_NRM_Expenditure"),
            percent_agriculture_expenditure: number(
                record,
                "percent_of_Expenditure_on_Agriculture_Allied_Works",
            ),
            number_of_gps_with_nil_exp: number(record, "Number_of_GPs_with_NIL_exp"),

            employment_demand_fulfilled_percent: demand_fulfilled(record),

            data_source: "data.gov.in".to_string(),
            remarks: text(record, "Remarks"),
        }
    }
}

/// Share of registered workers that are active, as a 0-100 percentage.
///
/// When the registry total is zero or missing the period cannot be
/// measured, so a fixed estimate stands in rather than reporting zero
/// performance. This is the single demand-fulfilled policy for the whole
/// crate; the individuals-worked/active-workers ratio is computed
/// separately as the `employment_rate` indicator.
fn demand_fulfilled(record: &RawRecord) -> f64 {
    let active = number(record, "Total_No_of_Active_Workers");
    let total = number(record, "Total_No_of_Workers");

    if total > 0.0 {
        (active / total * 100.0).round().clamp(0.0, 100.0)
    } else {
        DEMAND_FULFILLED_FALLBACK
    }
}
