//! Profile model: the hero/about section owner.

use serde::{Deserialize, Serialize};

use super::{ContentKind, PortfolioContent, SingletonItem};

/// Links shown next to the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub social: SocialLinks,
}

/// Request body for updating the profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub social: Option<SocialLinks>,
}

impl SingletonItem for Profile {
    const KIND: ContentKind = ContentKind::Profile;

    type Patch = UpdateProfileRequest;

    fn merge(&mut self, patch: UpdateProfileRequest) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(bio) = patch.bio {
            self.bio = bio;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(skills) = patch.skills {
            self.skills = skills;
        }
        if let Some(social) = patch.social {
            self.social = social;
        }
    }

    fn get(content: &PortfolioContent) -> &Self {
        &content.profile
    }

    fn get_mut(content: &mut PortfolioContent) -> &mut Self {
        &mut content.profile
    }
}
