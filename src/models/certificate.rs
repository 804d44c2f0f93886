//! Certificate model.

use serde::{Deserialize, Serialize};

use super::{require_non_blank, CollectionItem, ContentKind, PortfolioContent};
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_url: Option<String>,
}

/// Request body for creating a new certificate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateRequest {
    pub title: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub credential_url: Option<String>,
}

/// Request body for updating an existing certificate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCertificateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub credential_url: Option<String>,
}

impl CollectionItem for Certificate {
    const KIND: ContentKind = ContentKind::Certificates;

    type Create = CreateCertificateRequest;
    type Patch = UpdateCertificateRequest;

    fn id(&self) -> &str {
        &self.id
    }

    fn from_request(id: String, request: CreateCertificateRequest) -> Self {
        Self {
            id,
            title: request.title,
            issuer: request.issuer,
            date: request.date,
            image: request.image,
            credential_url: request.credential_url,
        }
    }

    fn merge(&mut self, patch: UpdateCertificateRequest) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(issuer) = patch.issuer {
            self.issuer = issuer;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if patch.credential_url.is_some() {
            self.credential_url = patch.credential_url;
        }
    }

    fn validate(request: &CreateCertificateRequest) -> Result<(), AppError> {
        require_non_blank(&request.title, "Title")?;
        require_non_blank(&request.issuer, "Issuer")
    }

    fn items(content: &PortfolioContent) -> &Vec<Self> {
        &content.certificates
    }

    fn items_mut(content: &mut PortfolioContent) -> &mut Vec<Self> {
        &mut content.certificates
    }
}
