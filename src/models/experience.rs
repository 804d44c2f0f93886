//! Experience model: work, education and internship entries.

use serde::{Deserialize, Serialize};

use super::{require_non_blank, CollectionItem, ContentKind, PortfolioContent};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceType {
    #[default]
    Work,
    Education,
    Internship,
}

/// A timeline entry. `current` entries never carry an end date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: ExperienceType,
}

/// Request body for creating a new experience entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExperienceRequest {
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: ExperienceType,
}

/// Request body for updating an existing experience entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExperienceRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current: Option<bool>,
    #[serde(default)]
    pub description: Option<Vec<String>>,
    #[serde(rename = "type", default)]
    pub kind: Option<ExperienceType>,
}

impl CollectionItem for Experience {
    const KIND: ContentKind = ContentKind::Experiences;

    type Create = CreateExperienceRequest;
    type Patch = UpdateExperienceRequest;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_request(id: String, request: CreateExperienceRequest) -> Self {
        Self {
            id,
            title: request.title,
            company: request.company,
            location: request.location,
            start_date: request.start_date,
            end_date: if request.current { None } else { request.end_date },
            current: request.current,
            description: request.description,
            kind: request.kind,
        }
    }

    fn merge(&mut self, patch: UpdateExperienceRequest) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(company) = patch.company {
            self.company = company;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = Some(end_date);
            self.current = false;
        }
        if let Some(current) = patch.current {
            self.current = current;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if self.current {
            self.end_date = None;
        }
    }

    fn validate(request: &CreateExperienceRequest) -> Result<(), AppError> {
        require_non_blank(&request.title, "Title")?;
        if request.current && request.end_date.is_some() {
            return Err(AppError::Validation(
                "A current position cannot have an end date".to_string(),
            ));
        }
        Ok(())
    }

    fn items(content: &PortfolioContent) -> &Vec<Self> {
        &content.experiences
    }

    fn items_mut(content: &mut PortfolioContent) -> &mut Vec<Self> {
        &mut content.experiences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Experience {
        Experience::from_request(
            "e1".into(),
            CreateExperienceRequest {
                title: "Developer".into(),
                company: "Acme".into(),
                start_date: "2021-01".into(),
                end_date: Some("2023-06".into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_marking_current_clears_end_date() {
        let mut experience = entry();
        experience.merge(UpdateExperienceRequest {
            current: Some(true),
            ..Default::default()
        });
        assert!(experience.current);
        assert_eq!(experience.end_date, None);
        assert_eq!(experience.company, "Acme");
    }

    #[test]
    fn test_setting_end_date_ends_current_position() {
        let mut experience = entry();
        experience.merge(UpdateExperienceRequest {
            current: Some(true),
            ..Default::default()
        });
        experience.merge(UpdateExperienceRequest {
            end_date: Some("2024-02".into()),
            ..Default::default()
        });
        assert!(!experience.current);
        assert_eq!(experience.end_date.as_deref(), Some("2024-02"));
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let mut experience = entry();
        experience.kind = ExperienceType::Internship;
        let value = serde_json::to_value(&experience).unwrap();
        assert_eq!(value["type"], "internship");
        assert_eq!(value["startDate"], "2021-01");
    }

    #[test]
    fn test_current_with_end_date_is_rejected() {
        let request = CreateExperienceRequest {
            title: "Lead".into(),
            current: true,
            end_date: Some("2020-01".into()),
            ..Default::default()
        };
        assert!(Experience::validate(&request).is_err());
    }
}
