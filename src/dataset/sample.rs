//! Built-in sample rows served when every upstream is down and the
//! fallback policy is `sample`.

use crate::dataset::filter::normalize_provider_id;
use crate::dataset::kind::DatasetKind;
use crate::dataset::row::{CanonicalRow, HcahpsRow, HospitalRow};

struct SampleHospital {
    provider_id: &'static str,
    name: &'static str,
    city: &'static str,
    state: &'static str,
    phone: &'static str,
    hospital_type: &'static str,
    ownership: &'static str,
    rating: &'static str,
}

const SAMPLE_HOSPITALS: &[SampleHospital] = &[
    SampleHospital {
        provider_id: "10001",
        name: "Sample General Hospital",
        city: "Springfield",
        state: "IL",
        phone: "(217) 555-0100",
        hospital_type: "Acute Care Hospitals",
        ownership: "Government - Hospital District or Authority",
        rating: "4",
    },
    SampleHospital {
        provider_id: "10002",
        name: "River Valley Medical Center",
        city: "Columbus",
        state: "OH",
        phone: "(614) 555-0102",
        hospital_type: "Acute Care Hospitals",
        ownership: "Proprietary",
        rating: "3",
    },
    SampleHospital {
        provider_id: "10003",
        name: "Coastal Health Clinic",
        city: "Savannah",
        state: "GA",
        phone: "(912) 555-0103",
        hospital_type: "Critical Access Hospitals",
        ownership: "Voluntary non-profit - Private",
        rating: "5",
    },
];

// (provider id, measure id, question, star rating, linear mean)
const SAMPLE_HCAHPS: &[(&str, &str, &str, Option<&str>, Option<&str>)] = &[
    ("110001", "H_COMP_STAR_RATING", "HCAHPS Star Rating", Some("4"), None),
    ("110001", "H_COMMUNICATE_NURSES", "Nurses always communicated well", None, Some("82")),
    ("110001", "H_CLEAN_HOSPITAL", "Room and bathroom were always clean", None, Some("79")),
    ("060001", "H_COMP_STAR_RATING", "HCAHPS Star Rating", Some("5"), None),
    ("060001", "H_COMMUNICATE_DOCTORS", "Doctors always communicated well", None, Some("89")),
    ("330001", "H_COMP_STAR_RATING", "HCAHPS Star Rating", Some("5"), None),
];

/// Sample rows for a dataset kind. HCAHPS samples are keyed by provider id.
pub fn sample_rows(kind: DatasetKind, provider_id: Option<&str>) -> Vec<CanonicalRow> {
    match kind {
        DatasetKind::Hcahps => {
            let Some(wanted) = provider_id.map(normalize_provider_id) else {
                return Vec::new();
            };
            SAMPLE_HCAHPS
                .iter()
                .filter(|(id, ..)| normalize_provider_id(id) == wanted)
                .map(|(id, measure, question, stars, mean)| {
                    CanonicalRow::Hcahps(HcahpsRow {
                        provider_id: Some(id.to_string()),
                        hcahps_measure_id: Some(measure.to_string()),
                        measure_name: Some(question.to_string()),
                        hcahps_star_rating: stars.map(str::to_string),
                        linear_mean_value: mean.map(str::to_string),
                        ..Default::default()
                    })
                })
                .collect()
        }
        DatasetKind::Hospitals | DatasetKind::Generic => SAMPLE_HOSPITALS
            .iter()
            .map(|h| {
                CanonicalRow::Hospital(HospitalRow {
                    provider_id: Some(h.provider_id.to_string()),
                    hospital_name: Some(h.name.to_string()),
                    city: Some(h.city.to_string()),
                    state: Some(h.state.to_string()),
                    phone_number: Some(h.phone.to_string()),
                    hospital_type: Some(h.hospital_type.to_string()),
                    hospital_ownership: Some(h.ownership.to_string()),
                    hospital_overall_rating: Some(h.rating.to_string()),
                    ..Default::default()
                })
            })
            .collect(),
    }
}
