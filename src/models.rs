use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Multipart field names the report intake requires, in wire order.
pub const REQUIRED_REPORT_FIELDS: &[&str] = &[
    "email",
    "username",
    "deviceType",
    "browserInfo",
    "glitchType",
    "glitchLocation",
    "glitchDescription",
    "stepsToReproduce",
    "urgency",
];

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Id,
    pub uid: String,
    pub email: String,
    pub username: String,
    pub device_type: String,
    pub browser_info: String,
    pub glitch_type: String,
    pub glitch_location: String,
    pub glitch_description: String,
    pub steps_to_reproduce: String,
    pub urgency: String,
    pub attachment_url: String, // empty when no attachment was submitted
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>, // soft delete marker
}

#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub email: String,
    pub username: String,
    pub device_type: String,
    pub browser_info: String,
    pub glitch_type: String,
    pub glitch_location: String,
    pub glitch_description: String,
    pub steps_to_reproduce: String,
    pub urgency: String,
    pub attachment_url: String,
}

impl NewReport {
    /// Builds a report from collected multipart text fields. Every required
    /// field must be present and non-empty; `attachment_url` is filled in by
    /// the handler after the upload step.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, String> {
        if REQUIRED_REPORT_FIELDS
            .iter()
            .any(|f| fields.get(*f).map_or(true, |v| v.is_empty()))
        {
            return Err("invalid input: all fields are required".into());
        }
        let get = |k: &str| fields[k].clone();
        Ok(Self {
            email: get("email"),
            username: get("username"),
            device_type: get("deviceType"),
            browser_info: get("browserInfo"),
            glitch_type: get("glitchType"),
            glitch_location: get("glitchLocation"),
            glitch_description: get("glitchDescription"),
            steps_to_reproduce: get("stepsToReproduce"),
            urgency: get("urgency"),
            attachment_url: String::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactInquiry {
    pub id: Id,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub contact: String,
    #[serde(rename = "type")]
    pub inquiry_type: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>, // soft delete marker
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub contact: String,
    #[serde(rename = "type")]
    pub inquiry_type: String,
    pub subject: String,
    pub message: String,
}

impl NewInquiry {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            &self.name,
            &self.email,
            &self.contact,
            &self.inquiry_type,
            &self.subject,
            &self.message,
        ];
        if fields.iter().any(|f| f.is_empty()) {
            return Err("invalid input: all fields are required".into());
        }
        Ok(())
    }
}

/// Body of the dashboard delete/resolve endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteRequest {
    pub uid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_fields() -> HashMap<String, String> {
        REQUIRED_REPORT_FIELDS
            .iter()
            .map(|f| (f.to_string(), format!("{f}-value")))
            .collect()
    }

    #[test]
    fn report_from_fields_complete() {
        let r = NewReport::from_fields(&full_fields()).unwrap();
        assert_eq!(r.device_type, "deviceType-value");
        assert!(r.attachment_url.is_empty());
    }

    #[test]
    fn report_from_fields_rejects_each_missing_field() {
        for missing in REQUIRED_REPORT_FIELDS {
            let mut fields = full_fields();
            fields.remove(*missing);
            assert!(NewReport::from_fields(&fields).is_err(), "missing {missing}");

            let mut fields = full_fields();
            fields.insert(missing.to_string(), String::new());
            assert!(NewReport::from_fields(&fields).is_err(), "empty {missing}");
        }
    }

    #[test]
    fn inquiry_validation() {
        let ok = NewInquiry {
            name: "A".into(),
            email: "a@b.c".into(),
            contact: "123".into(),
            inquiry_type: "general".into(),
            subject: "s".into(),
            message: "m".into(),
        };
        assert!(ok.validate().is_ok());

        let mut empty = ok.clone();
        empty.subject.clear();
        assert!(empty.validate().is_err());
    }
}
