//! Normalization of remote-store rows into documents.
//!
//! Rows from the store are loosely typed: list columns may be `NULL`, a JSON
//! scalar, or an array holding odd elements. Everything here turns that into
//! the document shapes with lists that are always present.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::remote::{CompanyRow, ItemRow, PostRow, SiteProfileRow, TargetRow};
use crate::models::{
    Basics, Company, Post, PostList, Profile, ProjectItem, Target, TargetList,
};

/// Icon filenames that break on static hosts because of Unicode
/// normalization, mapped to their ASCII copies.
const ICON_ALIASES: [(&str, &str); 2] = [
    ("유니크굿", "logo/unique-good.jpg"),
    ("아이아라", "logo/aiara.png"),
];

pub fn normalize_icon_image(path: Option<&str>) -> Option<String> {
    let path = path?;
    for (token, alias) in ICON_ALIASES {
        if path.contains(token) {
            return Some(alias.to_string());
        }
    }
    Some(path.to_string())
}

/// Elements of a JSON array that deserialize as `T`; anything else is empty.
pub fn coerce_list<T: DeserializeOwned>(value: Option<&Value>) -> Vec<T> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn text(value: Option<String>) -> String {
    value.unwrap_or_default()
}

pub fn item_from_row(row: ItemRow) -> ProjectItem {
    ProjectItem {
        id: row.id,
        name: text(row.name),
        period: text(row.period),
        role: text(row.role),
        summary: text(row.summary),
        impact: text(row.impact),
        tags: coerce_list(row.tags.as_ref()),
        details: coerce_list(row.details.as_ref()),
        tech: coerce_list(row.tech.as_ref()),
    }
}

/// Nests projects and initiatives under their companies, keeping the row
/// order of each list. Items pointing at an unknown company are dropped.
pub fn assemble_profile(
    profile: SiteProfileRow,
    companies: Vec<CompanyRow>,
    projects: Vec<ItemRow>,
    initiatives: Vec<ItemRow>,
) -> Profile {
    let mut companies: Vec<Company> = companies
        .into_iter()
        .map(|row| Company {
            icon_image: normalize_icon_image(row.icon_image.as_deref()),
            icon_text: row.icon_text,
            id: row.id,
            name: text(row.name),
            role: text(row.role),
            period: text(row.period),
            summary: text(row.summary),
            projects: Vec::new(),
            initiatives: Vec::new(),
        })
        .collect();

    for row in projects {
        if let Some(company) = companies.iter_mut().find(|c| c.id == row.company_id) {
            company.projects.push(item_from_row(row));
        }
    }
    for row in initiatives {
        if let Some(company) = companies.iter_mut().find(|c| c.id == row.company_id) {
            company.initiatives.push(item_from_row(row));
        }
    }

    Profile {
        basics: Basics {
            name: text(profile.name),
            title: text(profile.title),
            email: text(profile.email),
            phone: text(profile.phone),
            location: text(profile.location),
            links: coerce_list(profile.links.as_ref()),
        },
        summary: text(profile.summary),
        intro: text(profile.intro),
        skills: coerce_list(profile.skills.as_ref()),
        achievements: coerce_list(profile.achievements.as_ref()),
        education: coerce_list(profile.education.as_ref()),
        trainings: coerce_list(profile.trainings.as_ref()),
        companies,
    }
}

pub fn targets_from_rows(rows: Vec<TargetRow>) -> TargetList {
    TargetList {
        targets: rows
            .into_iter()
            .map(|row| Target {
                id: row.id,
                company: text(row.company),
                role: text(row.role),
                priority_tags: coerce_list(row.priority_tags.as_ref()),
                summary_hint: text(row.summary_hint),
            })
            .collect(),
    }
}

pub fn posts_from_rows(rows: Vec<PostRow>) -> PostList {
    PostList {
        posts: rows
            .into_iter()
            .map(|row| {
                let slug = text(row.slug);
                let href = if slug.is_empty() {
                    "#".to_string()
                } else {
                    format!("#/post/{}", urlencoding::encode(&slug))
                };
                Post {
                    id: row.id,
                    date: row
                        .published_at
                        .map(|at| at.chars().take(10).collect())
                        .unwrap_or_default(),
                    title: text(row.title),
                    excerpt: text(row.excerpt),
                    category: text(row.category),
                    slug,
                    href,
                }
            })
            .collect(),
    }
}
