//! Row normalization.
//!
//! Every canonical key has a fixed priority list of upstream spellings. The
//! first spelling that is present and non-blank wins; if none is, the key is
//! null. Normalization never fails.

use crate::dataset::kind::DatasetKind;
use crate::dataset::row::{CanonicalRow, HcahpsRow, HospitalRow, RawRow};

const PROVIDER_ID: &[&str] = &["provider_id", "facility_id", "ccn", "providerid"];
const HOSPITAL_NAME: &[&str] = &["hospital_name", "hospitalname", "facility_name", "name"];
const ADDRESS: &[&str] = &["address"];
const CITY: &[&str] = &["city", "city_town"];
const STATE: &[&str] = &["state"];
const ZIP_CODE: &[&str] = &["zip_code", "zip"];
const PHONE_NUMBER: &[&str] = &["phone_number", "telephone_number", "phone"];
const HOSPITAL_TYPE: &[&str] = &["hospital_type", "type"];
const HOSPITAL_OWNERSHIP: &[&str] = &["hospital_ownership", "ownership"];
const EMERGENCY_SERVICES: &[&str] = &["emergency_services"];
const BIRTHING_FRIENDLY: &[&str] = &[
    "birthing_friendly",
    "meets_criteria_for_birthing_friendly_designation",
];
const OVERALL_RATING: &[&str] = &[
    "hospital_overall_rating",
    "overall_rating",
    "hcahps_star_rating",
];

const FACILITY_NAME: &[&str] = &["facility_name", "hospital_name"];
const MEASURE_ID: &[&str] = &["hcahps_measure_id"];
const MEASURE_NAME: &[&str] = &["measure_name", "hcahps_question", "hcahps_measure_id"];
const ANSWER_DESC: &[&str] = &["answer_desc", "hcahps_answer_description"];
const STAR_RATING: &[&str] = &["hcahps_star_rating", "patient_survey_star_rating"];
const LINEAR_MEAN: &[&str] = &["linear_mean_value", "hcahps_linear_mean_value"];
const ANSWER_PERCENT: &[&str] = &["hcahps_answer_percent", "top_box", "answer_percent"];
const COMPLETED_SURVEYS: &[&str] = &["number_of_completed_surveys", "num_completed_surveys"];
const RESPONSE_RATE: &[&str] = &["survey_response_rate_percent"];

/// Map a raw upstream row onto the canonical schema for `kind`.
pub fn normalize(raw: &RawRow, kind: DatasetKind) -> CanonicalRow {
    match kind {
        DatasetKind::Hcahps => CanonicalRow::Hcahps(HcahpsRow {
            provider_id: pick(raw, PROVIDER_ID),
            facility_name: pick(raw, FACILITY_NAME),
            hcahps_measure_id: pick(raw, MEASURE_ID),
            measure_name: pick(raw, MEASURE_NAME),
            answer_desc: pick(raw, ANSWER_DESC),
            hcahps_star_rating: pick(raw, STAR_RATING),
            linear_mean_value: pick(raw, LINEAR_MEAN),
            answer_percent: pick(raw, ANSWER_PERCENT),
            num_completed_surveys: pick(raw, COMPLETED_SURVEYS),
            survey_response_rate_percent: pick(raw, RESPONSE_RATE),
        }),
        DatasetKind::Hospitals | DatasetKind::Generic => CanonicalRow::Hospital(HospitalRow {
            provider_id: pick(raw, PROVIDER_ID),
            hospital_name: pick(raw, HOSPITAL_NAME),
            address: pick(raw, ADDRESS),
            city: pick(raw, CITY),
            state: pick(raw, STATE),
            zip_code: pick(raw, ZIP_CODE),
            phone_number: pick(raw, PHONE_NUMBER),
            hospital_type: pick(raw, HOSPITAL_TYPE),
            hospital_ownership: pick(raw, HOSPITAL_OWNERSHIP),
            emergency_services: pick(raw, EMERGENCY_SERVICES),
            birthing_friendly: pick(raw, BIRTHING_FRIENDLY),
            hospital_overall_rating: pick(raw, OVERALL_RATING),
            photo_url: None,
        }),
    }
}

fn pick(raw: &RawRow, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| {
        let value = raw.field(key)?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
