//! Fixture Loader - one-shot idempotent import of LMS content
//!
//! Reads JSON arrays from a fixture directory and upserts them table by
//! table in foreign-key order:
//! courses → lessons → quizzes → quiz_questions → quiz_options → coupons
//!
//! Each table may be split across several files (`lessons.json`,
//! `lessons_python.json`, ...). A row that fails to parse, validate or write
//! is logged and skipped; the load carries on with the next row. There is
//! no enclosing transaction.

use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use crate::{Error, Result};
use crate::payments::{Coupon, DiscountType};
use super::models::{Course, Lesson, Quiz, QuizOption, QuizQuestion};
use super::store::LmsStore;

/// A fixture row that knows how to check and persist itself
pub trait FixtureRow: DeserializeOwned {
    /// Table name, also the fixture file stem
    const TABLE: &'static str;

    fn key(&self) -> &str;

    fn validate(&self) -> Result<()> {
        require("id", self.key())
    }

    fn upsert(&self, store: &LmsStore) -> Result<()>;
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("missing {}", field)));
    }
    Ok(())
}

impl FixtureRow for Course {
    const TABLE: &'static str = "courses";

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("title", &self.title)?;
        if self.price < 0 {
            return Err(Error::Validation(format!("negative price {}", self.price)));
        }
        Ok(())
    }

    fn upsert(&self, store: &LmsStore) -> Result<()> {
        store.upsert_course(self)
    }
}

impl FixtureRow for Lesson {
    const TABLE: &'static str = "lessons";

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("course_id", &self.course_id)?;
        require("title", &self.title)
    }

    fn upsert(&self, store: &LmsStore) -> Result<()> {
        store.upsert_lesson(self)
    }
}

impl FixtureRow for Quiz {
    const TABLE: &'static str = "quizzes";

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("course_id", &self.course_id)?;
        if !(0..=100).contains(&self.passing_score) {
            return Err(Error::Validation(format!("passing_score {} outside 0-100", self.passing_score)));
        }
        Ok(())
    }

    fn upsert(&self, store: &LmsStore) -> Result<()> {
        store.upsert_quiz(self)
    }
}

impl FixtureRow for QuizQuestion {
    const TABLE: &'static str = "quiz_questions";

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("quiz_id", &self.quiz_id)?;
        require("question", &self.question)
    }

    fn upsert(&self, store: &LmsStore) -> Result<()> {
        store.upsert_question(self)
    }
}

impl FixtureRow for QuizOption {
    const TABLE: &'static str = "quiz_options";

    fn key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        require("id", &self.id)?;
        require("question_id", &self.question_id)?;
        require("text", &self.text)
    }

    fn upsert(&self, store: &LmsStore) -> Result<()> {
        store.upsert_option(self)
    }
}

impl FixtureRow for Coupon {
    const TABLE: &'static str = "coupons";

    fn key(&self) -> &str {
        &self.code
    }

    fn validate(&self) -> Result<()> {
        require("code", &self.code)?;
        if self.discount_value < 0.0 {
            return Err(Error::Validation("negative discount".to_string()));
        }
        if self.discount_type == DiscountType::Percent && self.discount_value > 100.0 {
            return Err(Error::Validation(format!("percent discount {} above 100", self.discount_value)));
        }
        Ok(())
    }

    fn upsert(&self, store: &LmsStore) -> Result<()> {
        store.upsert_coupon(self)
    }
}

/// Per-table outcome of a load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    pub table: &'static str,
    pub files: usize,
    pub loaded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub tables: Vec<TableReport>,
}

impl LoadReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn total_loaded(&self) -> usize {
        self.tables.iter().map(|t| t.loaded).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.tables.iter().map(|t| t.failed).sum()
    }
}

pub struct FixtureLoader<'a> {
    store: &'a LmsStore,
}

impl<'a> FixtureLoader<'a> {
    pub fn new(store: &'a LmsStore) -> Self {
        Self { store }
    }

    /// Load every fixture table found in `dir`, in dependency order.
    pub fn load_dir(&self, dir: &Path) -> Result<LoadReport> {
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("fixture directory {}", dir.display())));
        }

        let tables = vec![
            self.load_table::<Course>(dir),
            self.load_table::<Lesson>(dir),
            self.load_table::<Quiz>(dir),
            self.load_table::<QuizQuestion>(dir),
            self.load_table::<QuizOption>(dir),
            self.load_table::<Coupon>(dir),
        ];

        Ok(LoadReport { tables })
    }

    fn load_table<T: FixtureRow>(&self, dir: &Path) -> TableReport {
        let mut report = TableReport {
            table: T::TABLE,
            ..Default::default()
        };

        let files = fixture_files(dir, T::TABLE);
        if files.is_empty() {
            tracing::info!("No {} fixtures in {}, skipping", T::TABLE, dir.display());
            return report;
        }

        for file in files {
            report.files += 1;
            let rows = match read_rows(&file) {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            for (idx, row) in rows.into_iter().enumerate() {
                match self.load_row::<T>(row) {
                    Ok(key) => {
                        tracing::debug!("Upserted {} {}", T::TABLE, key);
                        report.loaded += 1;
                    }
                    Err(e) => {
                        tracing::warn!("{} row {}: {}", file.display(), idx, e);
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!("{}: {} loaded, {} failed", T::TABLE, report.loaded, report.failed);
        report
    }

    fn load_row<T: FixtureRow>(&self, row: serde_json::Value) -> Result<String> {
        let record: T = serde_json::from_value(row)?;
        record.validate()?;
        record.upsert(self.store)?;
        Ok(record.key().to_string())
    }
}

/// `<table>.json` and `<table>_*.json`, sorted by name
fn fixture_files(dir: &Path, table: &str) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();
    for pattern in [format!("{}/{}.json", base, table), format!("{}/{}_*.json", base, table)] {
        match glob::glob(&pattern) {
            Ok(paths) => files.extend(paths.filter_map(|p| p.ok())),
            Err(e) => tracing::warn!("Bad fixture pattern {}: {}", pattern, e),
        }
    }
    files.sort();
    files
}

fn read_rows(path: &Path) -> Result<Vec<serde_json::Value>> {
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str(&contents)? {
        serde_json::Value::Array(rows) => Ok(rows),
        _ => Err(Error::Validation("fixture file is not a JSON array".to_string())),
    }
}
