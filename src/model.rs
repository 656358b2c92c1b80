//! Row types for every table the store serves.
//!
//! Field names serialize as camelCase, which is what the IPC clients read.

use serde::{Deserialize, Serialize};

use crate::db::parse_id_list;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Text,
    Combo,
    Score,
}

impl ControlType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "combo" => Some(Self::Combo),
            "score" => Some(Self::Score),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Combo => "combo",
            Self::Score => "score",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub sub_task: String,
    pub control_type: ControlType,
    pub scale_id: Option<i64>,
    pub critical_task: bool,
}

/// Writable fields of a question; the id comes from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDraft {
    pub sub_task: String,
    pub control_type: ControlType,
    pub scale_id: Option<i64>,
    pub critical_task: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub id: i64,
    pub name: String,
    /// Comma-separated, as stored.
    pub options: String,
}

impl Scale {
    pub fn option_list(&self) -> Vec<String> {
        split_options(&self.options)
    }
}

pub fn split_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Instructor,
    Student,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instructor" => Some(Self::Instructor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instructor => "instructor",
            Self::Student => "student",
        }
    }
}

/// The display name stored alongside first/last name.
pub fn full_name(first_name: &str, last_name: &str) -> String {
    format!("{}, {}", last_name, first_name)
}

/// Person row shared by `users` and the legacy `students` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub pin: String,
    pub full_name: String,
    pub role: Option<Role>,
    pub assigned_project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersonDraft {
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub pin: String,
    pub role: Option<Role>,
    pub assigned_project: Option<String>,
}

impl PersonDraft {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

pub type User = Person;
pub type Student = Person;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorStudentAssignment {
    pub id: i64,
    pub instructor_id: i64,
    pub student_id: i64,
    pub program_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub id: i64,
    pub student_id: i64,
    pub instructor_id: i64,
    pub question_id: i64,
    pub score: f64,
    pub comment: String,
    pub recorded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub student_id: i64,
    pub instructor_id: i64,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Number,
    Choice,
    Date,
}

impl InputType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "number" => Some(Self::Number),
            "choice" => Some(Self::Choice),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Choice => "choice",
            Self::Date => "date",
        }
    }
}

/// Entry in the demographics question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestion {
    pub id: i64,
    pub text: String,
    pub input_type: InputType,
    pub options: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoTemplate {
    pub id: i64,
    pub name: String,
    pub question_ids: String,
}

impl DemoTemplate {
    pub fn question_id_list(&self) -> Vec<i64> {
        parse_id_list(&self.question_ids)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: i64,
    pub template_id: i64,
    pub user_id: Option<i64>,
    pub question_id: i64,
    pub answer: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
}
