//! CSV column titles → raw row keys.
//!
//! CMS CSV exports use human-readable titles ("Facility ID", "City/Town").
//! Known titles map onto the keys the normalizer understands; unknown titles
//! are snake-cased so they stay addressable.

use crate::dataset::kind::DatasetKind;

const HOSPITAL_HEADERS: &[(&str, &str)] = &[
    ("Facility ID", "provider_id"),
    ("Provider ID", "provider_id"),
    ("Facility Name", "hospital_name"),
    ("Hospital Name", "hospital_name"),
    ("Address", "address"),
    ("City", "city"),
    ("City/Town", "city"),
    ("State", "state"),
    ("ZIP Code", "zip_code"),
    ("Phone Number", "phone_number"),
    ("Telephone Number", "phone_number"),
    ("Hospital Type", "hospital_type"),
    ("Hospital Ownership", "hospital_ownership"),
    ("Emergency Services", "emergency_services"),
    ("Meets criteria for birthing friendly designation", "birthing_friendly"),
    ("Hospital overall rating", "hospital_overall_rating"),
    ("Overall Hospital Rating", "hospital_overall_rating"),
];

const HCAHPS_HEADERS: &[(&str, &str)] = &[
    ("Provider ID", "provider_id"),
    ("Facility ID", "facility_id"),
    ("Facility Name", "facility_name"),
    ("HCAHPS Measure ID", "hcahps_measure_id"),
    ("HCAHPS Question", "measure_name"),
    ("HCAHPS Answer Description", "answer_desc"),
    ("Patient Survey Star Rating", "hcahps_star_rating"),
    ("HCAHPS Linear Mean Value", "linear_mean_value"),
    ("HCAHPS Answer Percent", "answer_percent"),
    ("Number of Completed Surveys", "num_completed_surveys"),
    ("Survey Response Rate Percent", "survey_response_rate_percent"),
    ("Footnote", "footnote"),
];

fn table(kind: DatasetKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        DatasetKind::Hcahps => HCAHPS_HEADERS,
        DatasetKind::Hospitals | DatasetKind::Generic => HOSPITAL_HEADERS,
    }
}

/// Resolve a CSV column title: exact match, then trimmed, then case-insensitive.
pub fn header_key(kind: DatasetKind, title: &str) -> String {
    let table = table(kind);
    let trimmed = title.trim();

    table
        .iter()
        .find(|(t, _)| *t == title)
        .or_else(|| table.iter().find(|(t, _)| *t == trimmed))
        .or_else(|| table.iter().find(|(t, _)| t.eq_ignore_ascii_case(trimmed)))
        .map(|(_, key)| key.to_string())
        .unwrap_or_else(|| snake_case(trimmed))
}

fn snake_case(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
