//! The full content set rendered by the site.

use serde::{Deserialize, Serialize};

use super::{Certificate, ContentKind, Experience, Footer, Profile, Project};
use crate::errors::AppError;

/// All five content kinds held together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioContent {
    pub profile: Profile,
    pub projects: Vec<Project>,
    pub certificates: Vec<Certificate>,
    pub experiences: Vec<Experience>,
    pub footer: Footer,
}

impl PortfolioContent {
    /// Serialize one kind the way it is stored remotely.
    pub fn kind_json(&self, kind: ContentKind) -> Result<serde_json::Value, AppError> {
        let value = match kind {
            ContentKind::Profile => serde_json::to_value(&self.profile)?,
            ContentKind::Projects => serde_json::to_value(&self.projects)?,
            ContentKind::Certificates => serde_json::to_value(&self.certificates)?,
            ContentKind::Experiences => serde_json::to_value(&self.experiences)?,
            ContentKind::Footer => serde_json::to_value(&self.footer)?,
        };
        Ok(value)
    }

    /// Replace one kind with remote content. Leaves `self` untouched on decode failure.
    pub fn apply_json(
        &mut self,
        kind: ContentKind,
        value: serde_json::Value,
    ) -> Result<(), AppError> {
        match kind {
            ContentKind::Profile => self.profile = serde_json::from_value(value)?,
            ContentKind::Projects => self.projects = serde_json::from_value(value)?,
            ContentKind::Certificates => self.certificates = serde_json::from_value(value)?,
            ContentKind::Experiences => self.experiences = serde_json::from_value(value)?,
            ContentKind::Footer => self.footer = serde_json::from_value(value)?,
        }
        Ok(())
    }

    /// Copy one kind over from another content set.
    pub fn take_kind_from(&mut self, other: &PortfolioContent, kind: ContentKind) {
        match kind {
            ContentKind::Profile => self.profile = other.profile.clone(),
            ContentKind::Projects => self.projects = other.projects.clone(),
            ContentKind::Certificates => self.certificates = other.certificates.clone(),
            ContentKind::Experiences => self.experiences = other.experiences.clone(),
            ContentKind::Footer => self.footer = other.footer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bad_payload_leaves_content_untouched() {
        let mut content = PortfolioContent::default();
        content.footer.text = "keep me".into();

        let result = content.apply_json(ContentKind::Footer, json!(["not", "a", "footer"]));

        assert!(result.is_err());
        assert_eq!(content.footer.text, "keep me");
    }

    #[test]
    fn test_apply_projects_payload() {
        let mut content = PortfolioContent::default();
        content
            .apply_json(
                ContentKind::Projects,
                json!([{ "id": "a", "title": "Alpha", "technologies": ["Rust"] }]),
            )
            .unwrap();

        assert_eq!(content.projects.len(), 1);
        assert_eq!(content.projects[0].technologies, vec!["Rust".to_string()]);
        assert_eq!(
            content.kind_json(ContentKind::Projects).unwrap()[0]["title"],
            "Alpha"
        );
    }
}
