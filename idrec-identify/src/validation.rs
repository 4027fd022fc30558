//! Identify request validation
//!
//! Normalizes the raw JSON body into an [`IdentifyInput`] before it reaches
//! the resolver: blank and null fields count as absent, present fields are
//! trimmed, emails must look like addresses, and at least one identifier
//! has to survive.

use idrec_common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::services::IdentifyInput;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Raw `POST /identify` body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl IdentifyRequest {
    pub fn validate(self) -> Result<IdentifyInput> {
        let email = non_blank(self.email);
        let phone_number = non_blank(self.phone_number);

        if let Some(email) = &email {
            if !EMAIL_PATTERN.is_match(email) {
                return Err(Error::InvalidInput(format!("Invalid email: {}", email)));
            }
        }

        if email.is_none() && phone_number.is_none() {
            return Err(Error::InvalidInput(
                "At least one of email or phoneNumber is required".to_string(),
            ));
        }

        Ok(IdentifyInput {
            email,
            phone_number,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: Option<&str>, phone: Option<&str>) -> IdentifyRequest {
        IdentifyRequest {
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
        }
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let input = request(Some("   "), Some(" 555-0001 ")).validate().unwrap();

        assert_eq!(input.email, None);
        assert_eq!(input.phone_number.as_deref(), Some("555-0001"));
    }

    #[test]
    fn test_requires_one_identifier() {
        let err = request(Some(""), None).validate().unwrap_err();

        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("At least one")));
    }

    #[test]
    fn test_rejects_malformed_email() {
        for bad in ["plainaddress", "a@b", "two words@x.com", "@x.com"] {
            assert!(
                matches!(request(Some(bad), None).validate(), Err(Error::InvalidInput(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_accepts_email_only() {
        let input = request(Some("foo@x.com"), None).validate().unwrap();
        assert_eq!(input.email.as_deref(), Some("foo@x.com"));
        assert_eq!(input.phone_number, None);
    }

    #[test]
    fn test_null_fields_deserialize_as_absent() {
        let parsed: IdentifyRequest =
            serde_json::from_str(r#"{"email": null, "phoneNumber": "123"}"#).unwrap();

        let input = parsed.validate().unwrap();
        assert_eq!(input.email, None);
        assert_eq!(input.phone_number.as_deref(), Some("123"));
    }
}
