//! Résumé builder: picks the projects and initiatives that fit a target.
//!
//! Matching is plain tag intersection. An item is relevant when any of its
//! tags appears in the priority list; there is no scoring or ranking.

pub mod handlers;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{
    Basics, Company, EducationEntry, Profile, SkillGroup, Target, TrainingEntry,
};

/// Splits a comma-separated tag field, trimming and dropping blanks.
pub fn parse_tag_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// The target's preset tags followed by manual ones, first occurrence wins.
pub fn priority_tags(target: Option<&Target>, manual: &[String]) -> Vec<String> {
    let preset = target.map(|t| t.priority_tags.as_slice()).unwrap_or_default();
    let mut seen = BTreeSet::new();
    preset
        .iter()
        .chain(manual)
        .filter(|tag| seen.insert(tag.as_str()))
        .cloned()
        .collect()
}

pub fn has_tag_match(tags: &[String], priorities: &[String]) -> bool {
    tags.iter().any(|tag| priorities.contains(tag))
}

/// Ids of every project and initiative that matches `priorities`.
pub fn auto_select(profile: &Profile, priorities: &[String]) -> BTreeSet<String> {
    profile
        .companies
        .iter()
        .flat_map(|c| c.projects.iter().chain(c.initiatives.iter()))
        .filter(|item| has_tag_match(&item.tags, priorities))
        .map(|item| item.id.clone())
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TailorRequest {
    pub target_id: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    /// Comma-separated, as typed into the builder form.
    pub priority_tags: String,
    /// Explicit selection. When absent, items are auto-selected by tag.
    pub selected_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailoredResume {
    pub company: String,
    pub role: String,
    pub summary_hint: String,
    pub priority_tags: Vec<String>,
    pub basics: Basics,
    pub summary: String,
    pub skills: Vec<SkillGroup>,
    pub achievements: Vec<String>,
    pub education: Vec<EducationEntry>,
    pub trainings: Vec<TrainingEntry>,
    /// Companies trimmed to the selected items. Companies with nothing
    /// selected are left out.
    pub experience: Vec<Company>,
    pub selected_ids: Vec<String>,
}

/// Builds the tailored résumé for `request`. Form fields override the
/// target's company and role when given.
pub fn tailor(
    profile: Profile,
    target: Option<&Target>,
    request: &TailorRequest,
) -> TailoredResume {
    let manual = parse_tag_list(&request.priority_tags);
    let priorities = priority_tags(target, &manual);

    let selected: BTreeSet<String> = match &request.selected_ids {
        Some(ids) => ids.iter().cloned().collect(),
        None => auto_select(&profile, &priorities),
    };

    let experience = profile
        .companies
        .into_iter()
        .filter_map(|mut company| {
            company.projects.retain(|item| selected.contains(&item.id));
            company.initiatives.retain(|item| selected.contains(&item.id));
            if company.projects.is_empty() && company.initiatives.is_empty() {
                None
            } else {
                Some(company)
            }
        })
        .collect();

    let pick = |field: &Option<String>, fallback: Option<&String>| {
        field
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .or_else(|| fallback.cloned())
            .unwrap_or_default()
    };

    TailoredResume {
        company: pick(&request.company, target.map(|t| &t.company)),
        role: pick(&request.role, target.map(|t| &t.role)),
        summary_hint: target.map(|t| t.summary_hint.clone()).unwrap_or_default(),
        priority_tags: priorities,
        basics: profile.basics,
        summary: profile.summary,
        skills: profile.skills,
        achievements: profile.achievements,
        education: profile.education,
        trainings: profile.trainings,
        experience,
        selected_ids: selected.into_iter().collect(),
    }
}
