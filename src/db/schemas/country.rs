//! Country document schema
//!
//! One document per authenticated Discord identity, holding the
//! numeric policy fields. Created lazily on first login, never deleted.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for countries
pub const COUNTRY_COLLECTION: &str = "countries";

/// Country document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CountryDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Discord user id; unique, immutable after creation
    pub user_id: String,

    /// Discord username snapshot at first login; not auto-refreshed
    pub username: String,

    pub funding: f64,
    pub companies: f64,
    pub speech_events: f64,
    pub elections: f64,
    pub healthcare: f64,
    pub education: f64,
    pub police_crime: f64,
    pub environment: f64,
    pub infrastructure: f64,
}

impl CountryDoc {
    /// Create a new country with default policy values
    pub fn new(user_id: String, username: String) -> Self {
        Self {
            id: None,
            metadata: Metadata::new(),
            user_id,
            username,
            funding: 1000.0,
            companies: 5.0,
            speech_events: 0.0,
            elections: 0.0,
            healthcare: 50.0,
            education: 50.0,
            police_crime: 50.0,
            environment: 50.0,
            infrastructure: 50.0,
        }
    }
}

impl IntoIndexes for CountryDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on userId closes the first-login create race:
            // concurrent upserts collapse to one document
            (
                doc! { "userId": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for CountryDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// The updatable policy fields.
///
/// Updates are an enumerated command: any other field name is rejected
/// with a typed error instead of being written through to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyField {
    Funding,
    Companies,
    SpeechEvents,
    Elections,
    Healthcare,
    Education,
    PoliceCrime,
    Environment,
    Infrastructure,
}

impl PolicyField {
    /// The camelCase document key for this field
    pub fn as_key(&self) -> &'static str {
        match self {
            PolicyField::Funding => "funding",
            PolicyField::Companies => "companies",
            PolicyField::SpeechEvents => "speechEvents",
            PolicyField::Elections => "elections",
            PolicyField::Healthcare => "healthcare",
            PolicyField::Education => "education",
            PolicyField::PoliceCrime => "policeCrime",
            PolicyField::Environment => "environment",
            PolicyField::Infrastructure => "infrastructure",
        }
    }
}

/// Error for a field name outside the recognized policy set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicyField(pub String);

impl fmt::Display for UnknownPolicyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown policy field: {}", self.0)
    }
}

impl std::error::Error for UnknownPolicyField {}

impl FromStr for PolicyField {
    type Err = UnknownPolicyField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "funding" => Ok(PolicyField::Funding),
            "companies" => Ok(PolicyField::Companies),
            "speechEvents" => Ok(PolicyField::SpeechEvents),
            "elections" => Ok(PolicyField::Elections),
            "healthcare" => Ok(PolicyField::Healthcare),
            "education" => Ok(PolicyField::Education),
            "policeCrime" => Ok(PolicyField::PoliceCrime),
            "environment" => Ok(PolicyField::Environment),
            "infrastructure" => Ok(PolicyField::Infrastructure),
            other => Err(UnknownPolicyField(other.to_string())),
        }
    }
}

/// Country as returned to clients (no internal metadata)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountryView {
    pub user_id: String,
    pub username: String,
    pub funding: f64,
    pub companies: f64,
    pub speech_events: f64,
    pub elections: f64,
    pub healthcare: f64,
    pub education: f64,
    pub police_crime: f64,
    pub environment: f64,
    pub infrastructure: f64,
}

impl From<&CountryDoc> for CountryView {
    fn from(doc: &CountryDoc) -> Self {
        Self {
            user_id: doc.user_id.clone(),
            username: doc.username.clone(),
            funding: doc.funding,
            companies: doc.companies,
            speech_events: doc.speech_events,
            elections: doc.elections,
            healthcare: doc.healthcare,
            education: doc.education,
            police_crime: doc.police_crime,
            environment: doc.environment,
            infrastructure: doc.infrastructure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_country_defaults() {
        let country = CountryDoc::new("1234".to_string(), "ruler".to_string());

        assert_eq!(country.user_id, "1234");
        assert_eq!(country.username, "ruler");
        assert_eq!(country.funding, 1000.0);
        assert_eq!(country.companies, 5.0);
        assert_eq!(country.speech_events, 0.0);
        assert_eq!(country.elections, 0.0);
        assert_eq!(country.healthcare, 50.0);
        assert_eq!(country.education, 50.0);
        assert_eq!(country.police_crime, 50.0);
        assert_eq!(country.environment, 50.0);
        assert_eq!(country.infrastructure, 50.0);
    }

    #[test]
    fn test_policy_field_parses_all_known_names() {
        let names = [
            "funding",
            "companies",
            "speechEvents",
            "elections",
            "healthcare",
            "education",
            "policeCrime",
            "environment",
            "infrastructure",
        ];

        for name in names {
            let field: PolicyField = name.parse().unwrap();
            assert_eq!(field.as_key(), name);
        }
    }

    #[test]
    fn test_policy_field_rejects_unknown_names() {
        assert!("userId".parse::<PolicyField>().is_err());
        assert!("username".parse::<PolicyField>().is_err());
        assert!("Funding".parse::<PolicyField>().is_err());
        assert!("".parse::<PolicyField>().is_err());
        assert!("__proto__".parse::<PolicyField>().is_err());
    }

    #[test]
    fn test_country_wire_format_is_camel_case() {
        let country = CountryDoc::new("1234".to_string(), "ruler".to_string());
        let view = CountryView::from(&country);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["userId"], "1234");
        assert_eq!(json["speechEvents"], 0.0);
        assert_eq!(json["policeCrime"], 50.0);
        assert!(json.get("metadata").is_none());
    }
}
