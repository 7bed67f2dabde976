// Traveler identity, contact and documents, as supplied by the caller

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::offer::Extra;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Traveler {
    #[serde(default)]
    pub id: String,
    pub date_of_birth: NaiveDate,
    pub name: TravelerName,
    pub gender: Gender,
    pub contact: Contact,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<IdentityDocument>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerName {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    #[serde(alias = "male")]
    Male,
    #[serde(alias = "female")]
    Female,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub email_address: String,
    #[serde(default)]
    pub phones: Vec<Phone>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phone {
    #[serde(default = "default_device_type")]
    pub device_type: String,
    pub country_calling_code: String,
    pub number: String,
}

fn default_device_type() -> String {
    "MOBILE".to_string()
}

impl Phone {
    pub fn mobile(country_calling_code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            device_type: default_device_type(),
            country_calling_code: country_calling_code.into(),
            number: number.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    pub document_type: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default)]
    pub holder: bool,
}

impl Traveler {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
        gender: Gender,
        contact: Contact,
    ) -> Self {
        Self {
            id: String::new(),
            date_of_birth,
            name: TravelerName {
                first_name: first_name.into(),
                last_name: last_name.into(),
            },
            gender,
            contact,
            documents: Vec::new(),
            extra: Extra::new(),
        }
    }

    pub fn with_document(mut self, document: IdentityDocument) -> Self {
        self.documents.push(document);
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name.first_name, self.name.last_name)
    }

    // `position` is 1-based and only used in the error message
    pub fn validate(&self, position: usize) -> Result<(), ValidationError> {
        let invalid = |reason: &str| {
            Err(ValidationError::InvalidTraveler {
                position,
                reason: reason.to_string(),
            })
        };

        if self.name.first_name.trim().is_empty() || self.name.last_name.trim().is_empty() {
            return invalid("first and last name are required");
        }
        let email = self.contact.email_address.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return invalid("a valid email address is required"),
        }
        if self.contact.phones.is_empty() {
            return invalid("at least one phone number is required");
        }
        for phone in &self.contact.phones {
            let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
            if !digits(&phone.country_calling_code) || !digits(&phone.number) {
                return invalid("phone numbers must be digits with a country calling code");
            }
        }
        if let Some(document) = self
            .documents
            .iter()
            .find(|doc| doc.number.trim().is_empty())
        {
            return Err(ValidationError::InvalidTraveler {
                position,
                reason: format!("{} document has no number", document.document_type),
            });
        }
        Ok(())
    }
}

impl Contact {
    pub fn new(email_address: impl Into<String>, phones: Vec<Phone>) -> Self {
        Self {
            email_address: email_address.into(),
            phones,
            extra: Extra::new(),
        }
    }
}

/// Fill blank traveler ids with their 1-based position so they line up with
/// the offer's traveler pricings.
pub fn assign_traveler_ids(travelers: &mut [Traveler]) {
    for (index, traveler) in travelers.iter_mut().enumerate() {
        if traveler.id.trim().is_empty() {
            traveler.id = (index + 1).to_string();
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_traveler() -> Traveler {
    Traveler::new(
        "Jorge",
        "Gonzalez",
        NaiveDate::from_ymd_opt(1998, 3, 10).unwrap(),
        Gender::Male,
        Contact::new("jorge.gonzalez@example.com", vec![Phone::mobile("56", "912345678")]),
    )
}
