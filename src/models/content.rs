//! Content kinds, remote rows, and the traits the store is generic over.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::PortfolioContent;
use crate::errors::AppError;

/// The five independently versioned kinds of site content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Profile,
    Projects,
    Certificates,
    Experiences,
    Footer,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Profile,
        ContentKind::Projects,
        ContentKind::Certificates,
        ContentKind::Experiences,
        ContentKind::Footer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Profile => "profile",
            ContentKind::Projects => "projects",
            ContentKind::Certificates => "certificates",
            ContentKind::Experiences => "experiences",
            ContentKind::Footer => "footer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(ContentKind::Profile),
            "projects" => Some(ContentKind::Projects),
            "certificates" => Some(ContentKind::Certificates),
            "experiences" => Some(ContentKind::Experiences),
            "footer" => Some(ContentKind::Footer),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote row: the whole serialized collection of a kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRow {
    #[serde(rename = "content_type")]
    pub kind: ContentKind,
    pub content: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Whether a change notification reports a new row or a rewritten one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Insert,
    Update,
}

/// A realtime change notification from the remote backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ContentKind,
    pub content: serde_json::Value,
    pub updated_at: DateTime<Utc>,
    pub event_type: ChangeType,
}

impl ChangeEvent {
    pub fn from_row(row: ContentRow, event_type: ChangeType) -> Self {
        Self {
            kind: row.kind,
            content: row.content,
            updated_at: row.updated_at,
            event_type,
        }
    }
}

/// An entity living in one of the id-keyed collections.
pub trait CollectionItem: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ContentKind;

    /// Request body used to create a new item.
    type Create: DeserializeOwned + Send + 'static;
    /// Partial update; absent fields keep their current value.
    type Patch: DeserializeOwned + Send + 'static;

    fn id(&self) -> &str;

    fn from_request(id: String, request: Self::Create) -> Self;

    fn merge(&mut self, patch: Self::Patch);

    fn validate(_request: &Self::Create) -> Result<(), AppError> {
        Ok(())
    }

    fn items(content: &PortfolioContent) -> &Vec<Self>;

    fn items_mut(content: &mut PortfolioContent) -> &mut Vec<Self>;
}

/// An entity with exactly one instance (profile, footer).
pub trait SingletonItem: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ContentKind;

    type Patch: DeserializeOwned + Send + 'static;

    fn merge(&mut self, patch: Self::Patch);

    fn get(content: &PortfolioContent) -> &Self;

    fn get_mut(content: &mut PortfolioContent) -> &mut Self;
}

/// Reject a create request whose required text field is blank.
pub(crate) fn require_non_blank(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_name() {
        for kind in ContentKind::ALL {
            assert_eq!(ContentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ContentKind::parse("blog"), None);
    }

    #[test]
    fn test_row_uses_remote_column_names() {
        let row = ContentRow {
            kind: ContentKind::Footer,
            content: serde_json::json!({"text": "hi"}),
            updated_at: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["content_type"], "footer");
        assert_eq!(value["content"]["text"], "hi");
        assert!(value["updated_at"].is_string());
    }
}
