//! Footer model.

use serde::{Deserialize, Serialize};

use super::{ContentKind, PortfolioContent, SingletonItem};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FooterLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub links: Vec<FooterLink>,
}

/// Request body for updating the footer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFooterRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub links: Option<Vec<FooterLink>>,
}

impl SingletonItem for Footer {
    const KIND: ContentKind = ContentKind::Footer;

    type Patch = UpdateFooterRequest;

    fn merge(&mut self, patch: UpdateFooterRequest) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(links) = patch.links {
            self.links = links;
        }
    }

    fn get(content: &PortfolioContent) -> &Self {
        &content.footer
    }

    fn get_mut(content: &mut PortfolioContent) -> &mut Self {
        &mut content.footer
    }
}
