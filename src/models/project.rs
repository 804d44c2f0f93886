//! Project model.

use serde::{Deserialize, Serialize};

use super::{require_non_blank, CollectionItem, ContentKind, PortfolioContent};
use crate::errors::AppError;

/// A showcased project. Collection order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
}

/// Request body for creating a new project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
}

/// Request body for updating an existing project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub technologies: Option<Vec<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
}

impl CollectionItem for Project {
    const KIND: ContentKind = ContentKind::Projects;

    type Create = CreateProjectRequest;
    type Patch = UpdateProjectRequest;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_request(id: String, request: CreateProjectRequest) -> Self {
        Self {
            id,
            title: request.title,
            description: request.description,
            long_description: request.long_description,
            images: request.images,
            technologies: request.technologies,
            category: request.category,
            featured: request.featured,
            date: request.date,
            github_url: request.github_url,
            live_url: request.live_url,
        }
    }

    fn merge(&mut self, patch: UpdateProjectRequest) {
        self.title = patch.title.unwrap_or_else(|| self.title.clone());
        self.description = patch.description.unwrap_or_else(|| self.description.clone());
        self.long_description = patch.long_description.or(self.long_description.take());
        self.images = patch.images.unwrap_or_else(|| self.images.clone());
        self.technologies = patch.technologies.unwrap_or_else(|| self.technologies.clone());
        self.category = patch.category.unwrap_or_else(|| self.category.clone());
        self.featured = patch.featured.unwrap_or(self.featured);
        self.date = patch.date.unwrap_or_else(|| self.date.clone());
        self.github_url = patch.github_url.or(self.github_url.take());
        self.live_url = patch.live_url.or(self.live_url.take());
    }

    fn validate(request: &CreateProjectRequest) -> Result<(), AppError> {
        require_non_blank(&request.title, "Title")
    }

    fn items(content: &PortfolioContent) -> &Vec<Self> {
        &content.projects
    }

    fn items_mut(content: &mut PortfolioContent) -> &mut Vec<Self> {
        &mut content.projects
    }
}
