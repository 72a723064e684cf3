// CV analysis prompt templates.

pub const CV_ANALYSIS_PROMPT: &str = r#"You are reviewing a CV submitted as part of a graduate school application.

DOCUMENT TYPE: {document_type}
WORD COUNT: {word_count}
{quality_note}
CV TEXT:
"""
{cv_text}
"""

Extract the candidate's information and assess the CV. Return a JSON object with EXACTLY this structure:
{
  "personal_info": {
    "name": "string", "email": "string", "phone": "string",
    "location": "string", "linkedin": "string", "portfolio": "string"
  },
  "education": [
    {"degree": "string", "institution": "string", "field_of_study": "string",
     "start_date": "string", "end_date": "string", "gpa": "string", "honors": ["string"]}
  ],
  "work_experience": [
    {"title": "string", "company": "string", "location": "string",
     "start_date": "string", "end_date": "string",
     "responsibilities": ["string"], "achievements": ["string"]}
  ],
  "skills": {
    "technical_skills": ["string"],
    "soft_skills": ["string"],
    "languages": [{"language": "string", "proficiency": "string"}]
  },
  "research": {
    "publications": [{"title": "string", "authors": ["string"], "venue": "string", "year": "string"}],
    "research_projects": [{"title": "string", "description": "string", "role": "string", "duration": "string"}],
    "conferences": [{"name": "string", "role": "string", "year": "string"}]
  },
  "achievements": ["string"],
  "strengths": ["string"],
  "areas_for_improvement": ["string"],
  "match_score": 0.0
}

RULES:
1. "strengths" must contain 3 to 5 entries; "areas_for_improvement" must contain 2 to 3 entries.
2. "match_score" is a number between 0 and 1 rating how competitive the CV is for graduate admission.
3. Use "" for unknown strings and [] for empty lists. Never omit a field.
4. {grounding}
5. {json_only}"#;

pub const LOW_CONFIDENCE_NOTE: &str = "NOTE: Text extraction from this document was incomplete. \
The text may be fragmentary or out of order; extract only what is clearly stated.\n";
