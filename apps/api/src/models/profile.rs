use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::null_as_empty;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Basics {
    pub name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillGroup {
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationEntry {
    pub school: String,
    pub major: String,
    pub period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingEntry {
    pub name: String,
    pub period: String,
}

/// A project or an initiative. Both collections share this shape; which one an
/// item belongs to is decided by the field of [`Company`] holding it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectItem {
    pub id: String,
    pub name: String,
    pub period: String,
    pub role: String,
    pub summary: String,
    pub impact: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub details: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub tech: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub role: String,
    pub period: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_text: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub projects: Vec<ProjectItem>,
    #[serde(deserialize_with = "null_as_empty")]
    pub initiatives: Vec<ProjectItem>,
}

/// The résumé/profile document shared by the resume page and the builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub basics: Basics,
    pub summary: String,
    pub intro: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub skills: Vec<SkillGroup>,
    #[serde(deserialize_with = "null_as_empty")]
    pub achievements: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub education: Vec<EducationEntry>,
    #[serde(deserialize_with = "null_as_empty")]
    pub trainings: Vec<TrainingEntry>,
    #[serde(deserialize_with = "null_as_empty")]
    pub companies: Vec<Company>,
}

impl Profile {
    /// Fills in ids for companies and items that arrived without one.
    ///
    /// Static snapshots usually carry no ids, while the builder selects items by
    /// id. Derived ids are stable for a given document: `<company-slug>` for a
    /// company and `<company-slug>/project-<n>` or `<company-slug>/initiative-<n>`
    /// for its items. A derived id never repeats one already in the document;
    /// clashes get a `-2`, `-3`, ... suffix.
    pub fn ensure_ids(&mut self) {
        let mut company_ids: HashSet<String> = HashSet::new();
        let mut item_ids: HashSet<String> = HashSet::new();
        for company in &self.companies {
            if !company.id.trim().is_empty() {
                company_ids.insert(company.id.clone());
            }
            for item in company.projects.iter().chain(&company.initiatives) {
                if !item.id.trim().is_empty() {
                    item_ids.insert(item.id.clone());
                }
            }
        }

        for (index, company) in self.companies.iter_mut().enumerate() {
            if company.id.trim().is_empty() {
                let slug = slugify(&company.name);
                let base = if slug.is_empty() {
                    format!("company-{index}")
                } else {
                    slug
                };
                company.id = claim(base, &mut company_ids);
            }
            let prefix = company.id.clone();
            for (n, item) in company.projects.iter_mut().enumerate() {
                if item.id.trim().is_empty() {
                    item.id = claim(format!("{prefix}/project-{n}"), &mut item_ids);
                }
            }
            for (n, item) in company.initiatives.iter_mut().enumerate() {
                if item.id.trim().is_empty() {
                    item.id = claim(format!("{prefix}/initiative-{n}"), &mut item_ids);
                }
            }
        }
    }
}

/// Returns `base`, or the first free `base-<k>` (k >= 2), and records it as taken.
fn claim(base: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut k = 2;
    while taken.contains(&candidate) {
        candidate = format!("{base}-{k}");
        k += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Lowercases and joins alphanumeric runs with `-`. Non-ASCII letters are kept.
fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
