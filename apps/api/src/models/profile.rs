//! StructuredProfile: the typed payload attached to a completed analysis job.
//!
//! Built from loosely-shaped model output by [`StructuredProfile::from_value`],
//! which never fails on shape: every absent, null or mistyped field falls back
//! to its default (empty string, empty list, `match_score = 0.5`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MATCH_SCORE: f64 = 0.5;
pub const MAX_STRENGTHS: usize = 5;
pub const MAX_AREAS_FOR_IMPROVEMENT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub portfolio: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub field_of_study: String,
    pub start_date: String,
    pub end_date: String,
    pub gpa: String,
    pub honors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    pub title: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub responsibilities: Vec<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub language: String,
    pub proficiency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub languages: Vec<LanguageSkill>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    pub authors: Vec<String>,
    pub venue: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchProject {
    pub title: String,
    pub description: String,
    pub role: String,
    pub duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conference {
    pub name: String,
    pub role: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Research {
    pub publications: Vec<Publication>,
    pub research_projects: Vec<ResearchProject>,
    pub conferences: Vec<Conference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredProfile {
    pub personal_info: PersonalInfo,
    pub education: Vec<Education>,
    pub work_experience: Vec<WorkExperience>,
    pub skills: Skills,
    pub research: Research,
    pub achievements: Vec<String>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    /// Always within [0, 1].
    pub match_score: f64,
}

impl Default for StructuredProfile {
    fn default() -> Self {
        Self {
            personal_info: PersonalInfo::default(),
            education: Vec::new(),
            work_experience: Vec::new(),
            skills: Skills::default(),
            research: Research::default(),
            achievements: Vec::new(),
            strengths: Vec::new(),
            areas_for_improvement: Vec::new(),
            match_score: DEFAULT_MATCH_SCORE,
        }
    }
}

impl StructuredProfile {
    /// Normalizes a parsed JSON object into a fully-populated profile.
    pub fn from_value(root: &Value) -> Self {
        let personal = root.get("personal_info");
        let skills = root.get("skills");
        let research = root.get("research");

        let mut strengths = string_list(root.get("strengths"));
        strengths.truncate(MAX_STRENGTHS);
        let mut areas_for_improvement = string_list(root.get("areas_for_improvement"));
        areas_for_improvement.truncate(MAX_AREAS_FOR_IMPROVEMENT);

        Self {
            personal_info: PersonalInfo {
                name: text(personal, "name"),
                email: text(personal, "email"),
                phone: text(personal, "phone"),
                location: text(personal, "location"),
                linkedin: text(personal, "linkedin"),
                portfolio: text(personal, "portfolio"),
            },
            education: objects(root.get("education"))
                .map(|e| Education {
                    degree: text(e, "degree"),
                    institution: text(e, "institution"),
                    field_of_study: text(e, "field_of_study"),
                    start_date: text(e, "start_date"),
                    end_date: text(e, "end_date"),
                    gpa: text(e, "gpa"),
                    honors: string_list(field(e, "honors")),
                })
                .collect(),
            work_experience: objects(root.get("work_experience"))
                .map(|w| WorkExperience {
                    title: text(w, "title"),
                    company: text(w, "company"),
                    location: text(w, "location"),
                    start_date: text(w, "start_date"),
                    end_date: text(w, "end_date"),
                    responsibilities: string_list(field(w, "responsibilities")),
                    achievements: string_list(field(w, "achievements")),
                })
                .collect(),
            skills: Skills {
                technical_skills: string_list(field(skills, "technical_skills")),
                soft_skills: string_list(field(skills, "soft_skills")),
                languages: objects(field(skills, "languages"))
                    .map(|l| LanguageSkill {
                        language: text(l, "language"),
                        proficiency: text(l, "proficiency"),
                    })
                    .collect(),
            },
            research: Research {
                publications: objects(field(research, "publications"))
                    .map(|p| Publication {
                        title: text(p, "title"),
                        authors: string_list(field(p, "authors")),
                        venue: text(p, "venue"),
                        year: text(p, "year"),
                    })
                    .collect(),
                research_projects: objects(field(research, "research_projects"))
                    .map(|p| ResearchProject {
                        title: text(p, "title"),
                        description: text(p, "description"),
                        role: text(p, "role"),
                        duration: text(p, "duration"),
                    })
                    .collect(),
                conferences: objects(field(research, "conferences"))
                    .map(|c| Conference {
                        name: text(c, "name"),
                        role: text(c, "role"),
                        year: text(c, "year"),
                    })
                    .collect(),
            },
            achievements: string_list(root.get("achievements")),
            strengths,
            areas_for_improvement,
            match_score: match_score(root.get("match_score")),
        }
    }
}

/// Reads `match_score`, clamping numbers into [0, 1]. Anything non-numeric
/// yields [`DEFAULT_MATCH_SCORE`].
pub fn match_score(value: Option<&Value>) -> f64 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match score {
        Some(s) if s.is_finite() => s.clamp(0.0, 1.0),
        _ => DEFAULT_MATCH_SCORE,
    }
}

fn field<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    parent.and_then(|p| p.get(key))
}

fn text(parent: Option<&Value>, key: &str) -> String {
    match field(parent, key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Iterates the object entries of an array, skipping anything else.
fn objects(value: Option<&Value>) -> impl Iterator<Item = Option<&Value>> {
    value
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter(|item| item.is_object())
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_yields_all_defaults() {
        let profile = StructuredProfile::from_value(&json!({}));
        assert_eq!(profile, StructuredProfile::default());
        assert!((profile.match_score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_null_fields_default_to_empty() {
        let profile = StructuredProfile::from_value(&json!({
            "education": null,
            "skills": null,
            "research": {"publications": null},
            "strengths": null
        }));
        assert!(profile.education.is_empty());
        assert!(profile.skills.technical_skills.is_empty());
        assert!(profile.research.publications.is_empty());
        assert!(profile.strengths.is_empty());
    }

    #[test]
    fn test_match_score_missing_or_non_numeric_is_half() {
        assert!((match_score(None) - 0.5).abs() < f64::EPSILON);
        assert!((match_score(Some(&json!("high"))) - 0.5).abs() < f64::EPSILON);
        assert!((match_score(Some(&json!(null))) - 0.5).abs() < f64::EPSILON);
        assert!((match_score(Some(&json!([0.9]))) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_match_score_is_clamped() {
        assert!((match_score(Some(&json!(1.7))) - 1.0).abs() < f64::EPSILON);
        assert!(match_score(Some(&json!(-0.2))).abs() < f64::EPSILON);
        assert!((match_score(Some(&json!("0.75"))) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_full_payload_is_mapped() {
        let profile = StructuredProfile::from_value(&json!({
            "personal_info": {"name": "Ada Lovelace", "email": "ada@example.com"},
            "education": [{"degree": "BSc", "institution": "UCL", "gpa": 3.9, "honors": ["Dean's list"]}],
            "work_experience": [{
                "title": "Analyst",
                "company": "Engines Ltd",
                "responsibilities": ["Wrote programs"],
                "achievements": ["First algorithm"]
            }],
            "skills": {
                "technical_skills": ["Mathematics"],
                "languages": [{"language": "French", "proficiency": "fluent"}]
            },
            "research": {"publications": [{"title": "Notes", "authors": ["A. Lovelace"], "year": 1843}]},
            "achievements": ["Published notes"],
            "match_score": 0.8
        }));

        assert_eq!(profile.personal_info.name, "Ada Lovelace");
        assert_eq!(profile.personal_info.phone, "");
        assert_eq!(profile.education[0].gpa, "3.9");
        assert_eq!(profile.work_experience[0].achievements, vec!["First algorithm"]);
        assert_eq!(profile.skills.languages[0].proficiency, "fluent");
        assert!(profile.skills.soft_skills.is_empty());
        assert_eq!(profile.research.publications[0].year, "1843");
        assert!(profile.research.conferences.is_empty());
        assert!((profile.match_score - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_strengths_and_areas_are_capped() {
        let profile = StructuredProfile::from_value(&json!({
            "strengths": ["a", "b", "c", "d", "e", "f", "g"],
            "areas_for_improvement": ["x", "y", "z", "w"]
        }));
        assert_eq!(profile.strengths.len(), MAX_STRENGTHS);
        assert_eq!(profile.areas_for_improvement.len(), MAX_AREAS_FOR_IMPROVEMENT);
    }

    #[test]
    fn test_non_object_array_items_are_skipped() {
        let profile = StructuredProfile::from_value(&json!({
            "education": ["BSc somewhere", {"degree": "MSc"}],
            "achievements": ["won", 3, {"nested": true}, ""]
        }));
        assert_eq!(profile.education.len(), 1);
        assert_eq!(profile.education[0].degree, "MSc");
        assert_eq!(profile.achievements, vec!["won", "3"]);
    }
}
