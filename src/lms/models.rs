//! LMS records
//!
//! Field names serialize as camelCase for the API. Fixtures may use either
//! camelCase or snake_case keys.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// XP needed to advance one level
pub const XP_PER_LEVEL: i64 = 100;

/// Level for an XP total. Level 1 starts at 0 XP.
pub fn level_for_xp(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Parent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "student" | "child" | "kid" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::Validation(format!("Unknown role: {}", s))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(alias = "first_name")]
    pub first_name: String,
    #[serde(alias = "last_name")]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub xp: i64,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<String>,
}

impl User {
    pub fn level(&self) -> i64 {
        level_for_xp(self.xp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default, alias = "image_url")]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub published: bool,
    #[serde(default, alias = "sort_order", alias = "order")]
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    #[serde(alias = "course_id")]
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "video_url")]
    pub video_url: Option<String>,
    #[serde(default, alias = "sort_order", alias = "order")]
    pub sort_order: i64,
    #[serde(default, alias = "duration_minutes")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    #[serde(alias = "course_id")]
    pub course_id: String,
    #[serde(default, alias = "lesson_id")]
    pub lesson_id: Option<String>,
    pub title: String,
    #[serde(default = "default_passing_score", alias = "passing_score")]
    pub passing_score: i64,
    #[serde(default, alias = "time_limit_minutes")]
    pub time_limit_minutes: Option<i64>,
    #[serde(default = "default_xp_reward", alias = "xp_reward")]
    pub xp_reward: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    #[serde(alias = "quiz_id")]
    pub quiz_id: String,
    pub question: String,
    #[serde(default, alias = "sort_order", alias = "order")]
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub id: String,
    #[serde(alias = "question_id")]
    pub question_id: String,
    pub text: String,
    #[serde(default, alias = "is_correct")]
    pub is_correct: bool,
    #[serde(default, alias = "sort_order", alias = "order")]
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: i64,
    pub quiz_id: String,
    pub user_id: String,
    pub score: i64,
    pub passed: bool,
    pub answers: serde_json::Value,
    pub created_at: String,
}

/// An option as shown to a student taking the quiz
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<PublicOption>,
}

/// A quiz without its answer key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<PublicQuestion>,
}

/// Outcome of grading one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: i64,
    pub passed: bool,
    pub correct: usize,
    pub total: usize,
    pub xp_awarded: i64,
    pub total_xp: i64,
    pub level: i64,
}

fn default_true() -> bool {
    true
}

fn default_passing_score() -> i64 {
    70
}

fn default_xp_reward() -> i64 {
    50
}
