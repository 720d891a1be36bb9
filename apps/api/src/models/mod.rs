pub mod posts;
pub mod profile;
pub mod targets;

use serde::{Deserialize, Deserializer, Serialize};

pub use posts::{Post, PostList};
pub use profile::{
    Basics, Company, EducationEntry, Profile, ProjectItem, SkillGroup, TrainingEntry,
};
pub use targets::{Target, TargetList};

use crate::loader::ResourceKind;

/// Deserializes a list field so that both a missing key (via `#[serde(default)]`)
/// and an explicit `null` produce an empty list.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A normalized document for one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentDocument {
    Profile(Profile),
    Targets(TargetList),
    Posts(PostList),
}

impl ContentDocument {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ContentDocument::Profile(_) => ResourceKind::Profile,
            ContentDocument::Targets(_) => ResourceKind::Targets,
            ContentDocument::Posts(_) => ResourceKind::Posts,
        }
    }

    pub fn into_profile(self) -> Option<Profile> {
        match self {
            ContentDocument::Profile(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_targets(self) -> Option<TargetList> {
        match self {
            ContentDocument::Targets(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_posts(self) -> Option<PostList> {
        match self {
            ContentDocument::Posts(p) => Some(p),
            _ => None,
        }
    }
}
