//! Raw upstream rows and the canonical row shapes returned to callers.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// A JSON object as returned by the REST and Socrata APIs.
pub type JsonRow = serde_json::Map<String, Value>;

/// A row as it arrived from one upstream kind, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Object from a CMS REST dataset API.
    Rest(JsonRow),
    /// Object from a Socrata SODA resource.
    Socrata(JsonRow),
    /// CSV record keyed by mapped column names.
    Csv(HashMap<String, String>),
}

impl RawRow {
    /// Read a field as text. JSON scalars are stringified; null and nested values are absent.
    pub fn field(&self, key: &str) -> Option<Cow<'_, str>> {
        match self {
            RawRow::Rest(obj) | RawRow::Socrata(obj) => match obj.get(key)? {
                Value::String(s) => Some(Cow::Borrowed(s.as_str())),
                Value::Number(n) => Some(Cow::Owned(n.to_string())),
                Value::Bool(b) => Some(Cow::Owned(b.to_string())),
                Value::Null | Value::Array(_) | Value::Object(_) => None,
            },
            RawRow::Csv(fields) => fields.get(key).map(|v| Cow::Borrowed(v.as_str())),
        }
    }
}

/// Canonical hospital directory row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HospitalRow {
    pub provider_id: Option<String>,
    pub hospital_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub phone_number: Option<String>,
    pub hospital_type: Option<String>,
    pub hospital_ownership: Option<String>,
    pub emergency_services: Option<String>,
    pub birthing_friendly: Option<String>,
    pub hospital_overall_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Canonical HCAHPS measure row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HcahpsRow {
    pub provider_id: Option<String>,
    pub facility_name: Option<String>,
    pub hcahps_measure_id: Option<String>,
    pub measure_name: Option<String>,
    pub answer_desc: Option<String>,
    pub hcahps_star_rating: Option<String>,
    pub linear_mean_value: Option<String>,
    pub answer_percent: Option<String>,
    pub num_completed_surveys: Option<String>,
    pub survey_response_rate_percent: Option<String>,
}

/// The upstream-agnostic record shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CanonicalRow {
    Hospital(HospitalRow),
    Hcahps(HcahpsRow),
}

impl CanonicalRow {
    pub fn provider_id(&self) -> Option<&str> {
        match self {
            CanonicalRow::Hospital(row) => row.provider_id.as_deref(),
            CanonicalRow::Hcahps(row) => row.provider_id.as_deref(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            CanonicalRow::Hospital(row) => row.hospital_name.as_deref(),
            CanonicalRow::Hcahps(row) => row.facility_name.as_deref(),
        }
    }

    pub fn city(&self) -> Option<&str> {
        match self {
            CanonicalRow::Hospital(row) => row.city.as_deref(),
            CanonicalRow::Hcahps(_) => None,
        }
    }

    pub fn state(&self) -> Option<&str> {
        match self {
            CanonicalRow::Hospital(row) => row.state.as_deref(),
            CanonicalRow::Hcahps(_) => None,
        }
    }

    pub fn into_hospital(self) -> Option<HospitalRow> {
        match self {
            CanonicalRow::Hospital(row) => Some(row),
            CanonicalRow::Hcahps(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_scalars_are_stringified() {
        let Value::Object(obj) = json!({
            "rating": 4,
            "emergency": true,
            "name": "Mercy",
            "missing": null,
            "nested": {"a": 1}
        }) else {
            unreachable!()
        };
        let row = RawRow::Socrata(obj);

        assert_eq!(row.field("rating").as_deref(), Some("4"));
        assert_eq!(row.field("emergency").as_deref(), Some("true"));
        assert_eq!(row.field("name").as_deref(), Some("Mercy"));
        assert_eq!(row.field("missing"), None);
        assert_eq!(row.field("nested"), None);
        assert_eq!(row.field("absent"), None);
    }

    #[test]
    fn test_missing_fields_serialize_as_null() {
        let row = CanonicalRow::Hospital(HospitalRow {
            hospital_name: Some("Mercy".into()),
            ..Default::default()
        });
        let value = serde_json::to_value(&row).unwrap();

        assert_eq!(value["hospital_name"], "Mercy");
        assert!(value["city"].is_null());
        assert!(value.get("photo_url").is_none());
        assert!(value.get("hcahps_measure_id").is_none());
    }
}
