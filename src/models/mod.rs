//! Data models for the portfolio content.
//!
//! Field names serialize as camelCase to match the site's JSON content.

mod certificate;
mod content;
mod experience;
mod footer;
mod portfolio;
mod profile;
mod project;

pub use certificate::*;
pub use content::*;
pub use experience::*;
pub use footer::*;
pub use portfolio::*;
pub use profile::*;
pub use project::*;
