//! SQLite storage implementation

use std::collections::{HashMap, HashSet};
use std::path::Path;
use rusqlite::{Connection, params, OptionalExtension};
use crate::{Result, Error};
use crate::payments::Coupon;
use crate::payments::coupons::normalize_code;
use super::models::{
    Course, Lesson, PublicOption, PublicQuestion, PublicQuiz, Quiz, QuizOption, QuizOutcome,
    QuizQuestion, QuizResult, Role, User, level_for_xp,
};
use super::schema;

const COURSE_COLUMNS: &str = "id, title, description, price, image_url, published, sort_order";
const LESSON_COLUMNS: &str = "id, course_id, title, content, video_url, sort_order, duration_minutes";
const QUIZ_COLUMNS: &str = "id, course_id, lesson_id, title, passing_score, time_limit_minutes, xp_reward";
const USER_COLUMNS: &str = "id, email, first_name, last_name, role, xp, created_at";

/// SQLite-backed storage for the LMS
pub struct LmsStore {
    conn: Connection,
}

impl LmsStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::PRAGMAS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Content Upserts ==========

    /// Insert or fully replace a course
    pub fn upsert_course(&self, course: &Course) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO courses (id, title, description, price, image_url, published, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                price = excluded.price,
                image_url = excluded.image_url,
                published = excluded.published,
                sort_order = excluded.sort_order,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                course.id,
                course.title,
                course.description,
                course.price,
                course.image_url,
                course.published,
                course.sort_order,
            ],
        )?;
        Ok(())
    }

    /// Insert or fully replace a lesson
    pub fn upsert_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO lessons (id, course_id, title, content, video_url, sort_order, duration_minutes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                content = excluded.content,
                video_url = excluded.video_url,
                sort_order = excluded.sort_order,
                duration_minutes = excluded.duration_minutes,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                lesson.id,
                lesson.course_id,
                lesson.title,
                lesson.content,
                lesson.video_url,
                lesson.sort_order,
                lesson.duration_minutes,
            ],
        )?;
        Ok(())
    }

    /// Insert or fully replace a quiz
    pub fn upsert_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO quizzes (id, course_id, lesson_id, title, passing_score, time_limit_minutes, xp_reward)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                lesson_id = excluded.lesson_id,
                title = excluded.title,
                passing_score = excluded.passing_score,
                time_limit_minutes = excluded.time_limit_minutes,
                xp_reward = excluded.xp_reward,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                quiz.id,
                quiz.course_id,
                quiz.lesson_id,
                quiz.title,
                quiz.passing_score,
                quiz.time_limit_minutes,
                quiz.xp_reward,
            ],
        )?;
        Ok(())
    }

    /// Insert or fully replace a quiz question
    pub fn upsert_question(&self, question: &QuizQuestion) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO quiz_questions (id, quiz_id, question, sort_order)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                quiz_id = excluded.quiz_id,
                question = excluded.question,
                sort_order = excluded.sort_order
            "#,
            params![question.id, question.quiz_id, question.question, question.sort_order],
        )?;
        Ok(())
    }

    /// Insert or fully replace a quiz option
    pub fn upsert_option(&self, option: &QuizOption) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO quiz_options (id, question_id, text, is_correct, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                question_id = excluded.question_id,
                text = excluded.text,
                is_correct = excluded.is_correct,
                sort_order = excluded.sort_order
            "#,
            params![option.id, option.question_id, option.text, option.is_correct, option.sort_order],
        )?;
        Ok(())
    }

    /// Insert or replace a coupon definition. Usage count is preserved.
    pub fn upsert_coupon(&self, coupon: &Coupon) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO coupons (code, discount_type, discount_value, product_id, active, max_uses, times_used, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(code) DO UPDATE SET
                discount_type = excluded.discount_type,
                discount_value = excluded.discount_value,
                product_id = excluded.product_id,
                active = excluded.active,
                max_uses = excluded.max_uses,
                expires_at = excluded.expires_at
            "#,
            params![
                normalize_code(&coupon.code),
                coupon.discount_type.as_str(),
                coupon.discount_value,
                coupon.product_id,
                coupon.active,
                coupon.max_uses,
                coupon.times_used,
                coupon.expires_at,
            ],
        )?;
        Ok(())
    }

    // ========== Course & Lesson Queries ==========

    /// List courses ordered for display
    pub fn list_courses(&self, published_only: bool) -> Result<Vec<Course>> {
        let sql = if published_only {
            format!("SELECT {} FROM courses WHERE published = 1 ORDER BY sort_order, id", COURSE_COLUMNS)
        } else {
            format!("SELECT {} FROM courses ORDER BY sort_order, id", COURSE_COLUMNS)
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let courses = stmt
            .query_map([], Self::row_to_course)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(courses)
    }

    pub fn get_course(&self, id: &str) -> Result<Option<Course>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLUMNS),
                [id],
                Self::row_to_course,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn lessons_for_course(&self, course_id: &str) -> Result<Vec<Lesson>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lessons WHERE course_id = ?1 ORDER BY sort_order, id",
            LESSON_COLUMNS
        ))?;
        let lessons = stmt
            .query_map([course_id], Self::row_to_lesson)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lessons)
    }

    pub fn get_lesson(&self, id: &str) -> Result<Option<Lesson>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM lessons WHERE id = ?1", LESSON_COLUMNS),
                [id],
                Self::row_to_lesson,
            )
            .optional()
            .map_err(Into::into)
    }

    fn row_to_course(row: &rusqlite::Row) -> rusqlite::Result<Course> {
        Ok(Course {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            image_url: row.get(4)?,
            published: row.get(5)?,
            sort_order: row.get(6)?,
        })
    }

    fn row_to_lesson(row: &rusqlite::Row) -> rusqlite::Result<Lesson> {
        Ok(Lesson {
            id: row.get(0)?,
            course_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            video_url: row.get(4)?,
            sort_order: row.get(5)?,
            duration_minutes: row.get(6)?,
        })
    }

    // ========== Quizzes ==========

    pub fn get_quiz(&self, id: &str) -> Result<Option<Quiz>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM quizzes WHERE id = ?1", QUIZ_COLUMNS),
                [id],
                |row| {
                    Ok(Quiz {
                        id: row.get(0)?,
                        course_id: row.get(1)?,
                        lesson_id: row.get(2)?,
                        title: row.get(3)?,
                        passing_score: row.get(4)?,
                        time_limit_minutes: row.get(5)?,
                        xp_reward: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn questions_for_quiz(&self, quiz_id: &str) -> Result<Vec<QuizQuestion>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, quiz_id, question, sort_order FROM quiz_questions WHERE quiz_id = ?1 ORDER BY sort_order, id",
        )?;
        let questions = stmt
            .query_map([quiz_id], |row| {
                Ok(QuizQuestion {
                    id: row.get(0)?,
                    quiz_id: row.get(1)?,
                    question: row.get(2)?,
                    sort_order: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(questions)
    }

    pub fn options_for_question(&self, question_id: &str) -> Result<Vec<QuizOption>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, question_id, text, is_correct, sort_order FROM quiz_options WHERE question_id = ?1 ORDER BY sort_order, id",
        )?;
        let options = stmt
            .query_map([question_id], |row| {
                Ok(QuizOption {
                    id: row.get(0)?,
                    question_id: row.get(1)?,
                    text: row.get(2)?,
                    is_correct: row.get(3)?,
                    sort_order: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(options)
    }

    /// Quiz with questions and options, answer key stripped
    pub fn public_quiz(&self, id: &str) -> Result<Option<PublicQuiz>> {
        let Some(quiz) = self.get_quiz(id)? else {
            return Ok(None);
        };

        let mut questions = Vec::new();
        for q in self.questions_for_quiz(id)? {
            let options = self
                .options_for_question(&q.id)?
                .into_iter()
                .map(|o| PublicOption { id: o.id, text: o.text })
                .collect();
            questions.push(PublicQuestion {
                id: q.id,
                question: q.question,
                options,
            });
        }

        Ok(Some(PublicQuiz { quiz, questions }))
    }

    /// question id → ids of its correct options
    fn answer_key(&self, quiz_id: &str) -> Result<HashMap<String, HashSet<String>>> {
        let mut key: HashMap<String, HashSet<String>> = self
            .questions_for_quiz(quiz_id)?
            .into_iter()
            .map(|q| (q.id, HashSet::new()))
            .collect();

        let mut stmt = self.conn.prepare(
            r#"
            SELECT o.question_id, o.id FROM quiz_options o
            JOIN quiz_questions q ON q.id = o.question_id
            WHERE q.quiz_id = ?1 AND o.is_correct = 1
            "#,
        )?;
        let rows = stmt.query_map([quiz_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (question_id, option_id) = row?;
            key.entry(question_id).or_default().insert(option_id);
        }
        Ok(key)
    }

    fn has_passed(&self, quiz_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM quiz_results WHERE quiz_id = ?1 AND user_id = ?2 AND passed = 1",
            [quiz_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Grade a submission, record the result and award XP on a first pass.
    ///
    /// `answers` maps question id → chosen option id.
    pub fn submit_quiz(&self, quiz_id: &str, user_id: &str, answers: &HashMap<String, String>) -> Result<QuizOutcome> {
        let quiz = self
            .get_quiz(quiz_id)?
            .ok_or_else(|| Error::NotFound(format!("quiz {}", quiz_id)))?;
        if self.get_user(user_id)?.is_none() {
            return Err(Error::NotFound(format!("user {}", user_id)));
        }

        let key = self.answer_key(quiz_id)?;
        if key.is_empty() {
            return Err(Error::Validation(format!("quiz {} has no questions", quiz_id)));
        }

        let total = key.len();
        let correct = key
            .iter()
            .filter(|(question_id, correct_ids)| {
                answers
                    .get(*question_id)
                    .is_some_and(|chosen| correct_ids.contains(chosen))
            })
            .count();
        let score = ((correct as f64 / total as f64) * 100.0).round() as i64;
        let passed = score >= quiz.passing_score;

        let first_pass = passed && !self.has_passed(quiz_id, user_id)?;
        let xp_awarded = if first_pass { quiz.xp_reward } else { 0 };

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO quiz_results (quiz_id, user_id, score, passed, answers) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![quiz_id, user_id, score, passed, serde_json::to_string(answers)?],
        )?;
        if xp_awarded > 0 {
            tx.execute("UPDATE users SET xp = xp + ?1 WHERE id = ?2", params![xp_awarded, user_id])?;
        }
        tx.commit()?;

        let total_xp: i64 = self
            .conn
            .query_row("SELECT xp FROM users WHERE id = ?1", [user_id], |row| row.get(0))?;

        tracing::debug!(quiz_id, user_id, score, passed, xp_awarded, "quiz graded");

        Ok(QuizOutcome {
            score,
            passed,
            correct,
            total,
            xp_awarded,
            total_xp,
            level: level_for_xp(total_xp),
        })
    }

    pub fn results_for_user(&self, user_id: &str) -> Result<Vec<QuizResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, quiz_id, user_id, score, passed, answers, created_at FROM quiz_results WHERE user_id = ?1 ORDER BY id",
        )?;
        let results = stmt
            .query_map([user_id], |row| {
                let answers: String = row.get(5)?;
                Ok(QuizResult {
                    id: row.get(0)?,
                    quiz_id: row.get(1)?,
                    user_id: row.get(2)?,
                    score: row.get(3)?,
                    passed: row.get(4)?,
                    answers: serde_json::from_str(&answers).unwrap_or(serde_json::Value::Null),
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(results)
    }

    // ========== Users & Parent Links ==========

    /// Create a user. Fails with a validation error on a duplicate email or id.
    pub fn create_user(&self, user: &User) -> Result<User> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO users (id, email, first_name, last_name, role, xp) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.email.trim().to_lowercase(),
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.xp,
            ],
        )?;
        if inserted == 0 {
            return Err(Error::Validation(format!("user {} or email {} already exists", user.id, user.email)));
        }
        self.get_user(&user.id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", user.id)))
    }

    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                [id],
                Self::row_to_user,
            )
            .optional()
            .map_err(Into::into)
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let role_str: String = row.get(4)?;
        let role: Role = role_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            role,
            xp: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    /// Link a parent account to a student account (idempotent)
    pub fn link_parent_child(&self, parent_id: &str, child_id: &str) -> Result<()> {
        if parent_id == child_id {
            return Err(Error::Validation("a user cannot be linked to themselves".to_string()));
        }
        let parent = self
            .get_user(parent_id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", parent_id)))?;
        let child = self
            .get_user(child_id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", child_id)))?;

        if parent.role != Role::Parent {
            return Err(Error::Validation(format!("user {} is not a parent account", parent_id)));
        }
        if child.role != Role::Student {
            return Err(Error::Validation(format!("user {} is not a student account", child_id)));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO parent_child_links (parent_id, child_id) VALUES (?1, ?2)",
            [parent_id, child_id],
        )?;
        Ok(())
    }

    pub fn children_of(&self, parent_id: &str) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.id, u.email, u.first_name, u.last_name, u.role, u.xp, u.created_at
            FROM parent_child_links l
            JOIN users u ON u.id = l.child_id
            WHERE l.parent_id = ?1
            ORDER BY u.first_name, u.id
            "#,
        )?;
        let children = stmt
            .query_map([parent_id], Self::row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(children)
    }

    // ========== Coupons ==========

    /// Look up a coupon, evaluating expiry against the database clock
    pub fn get_coupon(&self, code: &str) -> Result<Option<Coupon>> {
        self.conn
            .query_row(
                r#"
                SELECT code, discount_type, discount_value, product_id, active, max_uses, times_used, expires_at,
                       (expires_at IS NOT NULL AND expires_at <= datetime('now')) AS expired
                FROM coupons WHERE code = ?1
                "#,
                [normalize_code(code)],
                |row| {
                    let kind: String = row.get(1)?;
                    let discount_type = kind.parse().map_err(|e: Error| {
                        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                    })?;
                    Ok(Coupon {
                        code: row.get(0)?,
                        discount_type,
                        discount_value: row.get(2)?,
                        product_id: row.get(3)?,
                        active: row.get(4)?,
                        max_uses: row.get(5)?,
                        times_used: row.get(6)?,
                        expires_at: row.get(7)?,
                        expired: row.get(8)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Take one use of a coupon. Returns false when the coupon is missing
    /// or already at `max_uses`.
    pub fn reserve_coupon_use(&self, code: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE coupons SET times_used = times_used + 1
             WHERE code = ?1 AND (max_uses IS NULL OR times_used < max_uses)",
            [normalize_code(code)],
        )?;
        Ok(changed > 0)
    }

    /// Give back a use taken by [`reserve_coupon_use`](Self::reserve_coupon_use).
    pub fn release_coupon_use(&self, code: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE coupons SET times_used = times_used - 1 WHERE code = ?1 AND times_used > 0",
            [normalize_code(code)],
        )?;
        Ok(())
    }

    // ========== Stats ==========

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Row counts per table, in dependency order
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::with_capacity(schema::TABLES.len());
        for table in schema::TABLES {
            tables.push((*table, self.count(table)?));
        }
        Ok(DbStats { tables })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub tables: Vec<(&'static str, usize)>,
}

impl DbStats {
    pub fn get(&self, table: &str) -> usize {
        self.tables
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, count) in &self.tables {
            writeln!(f, "  {}: {}", table, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::payments::DiscountType;

    pub(crate) fn seed_quiz(store: &LmsStore) {
        store
            .upsert_course(&Course {
                id: "minecraft".to_string(),
                title: "מיינקראפט".to_string(),
                description: String::new(),
                price: 497,
                image_url: None,
                published: true,
                sort_order: 1,
            })
            .unwrap();
        store
            .upsert_lesson(&Lesson {
                id: "mc-1".to_string(),
                course_id: "minecraft".to_string(),
                title: "Blocks".to_string(),
                content: String::new(),
                video_url: None,
                sort_order: 1,
                duration_minutes: Some(45),
            })
            .unwrap();
        store
            .upsert_quiz(&Quiz {
                id: "mc-quiz".to_string(),
                course_id: "minecraft".to_string(),
                lesson_id: Some("mc-1".to_string()),
                title: "Blocks quiz".to_string(),
                passing_score: 50,
                time_limit_minutes: Some(10),
                xp_reward: 40,
            })
            .unwrap();
        for (qid, correct) in [("q1", "q1-a"), ("q2", "q2-b")] {
            store
                .upsert_question(&QuizQuestion {
                    id: qid.to_string(),
                    quiz_id: "mc-quiz".to_string(),
                    question: format!("Question {}", qid),
                    sort_order: 0,
                })
                .unwrap();
            for oid in [format!("{}-a", qid), format!("{}-b", qid)] {
                store
                    .upsert_option(&QuizOption {
                        is_correct: oid == correct,
                        id: oid,
                        question_id: qid.to_string(),
                        text: "option".to_string(),
                        sort_order: 0,
                    })
                    .unwrap();
            }
        }
    }

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            first_name: id.to_string(),
            last_name: "Test".to_string(),
            role,
            xp: 0,
            created_at: None,
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(q, o)| (q.to_string(), o.to_string())).collect()
    }

    #[test]
    fn test_upsert_replaces_without_duplicating() {
        let store = LmsStore::open_in_memory().unwrap();
        seed_quiz(&store);
        seed_quiz(&store);

        let stats = store.stats().unwrap();
        assert_eq!(stats.get("courses"), 1);
        assert_eq!(stats.get("lessons"), 1);
        assert_eq!(stats.get("quiz_options"), 4);
    }

    #[test]
    fn test_course_upsert_keeps_children() {
        let store = LmsStore::open_in_memory().unwrap();
        seed_quiz(&store);

        let mut course = store.get_course("minecraft").unwrap().unwrap();
        course.title = "Minecraft Modding".to_string();
        store.upsert_course(&course).unwrap();

        assert_eq!(store.get_course("minecraft").unwrap().unwrap().title, "Minecraft Modding");
        assert_eq!(store.lessons_for_course("minecraft").unwrap().len(), 1);
        assert_eq!(store.questions_for_quiz("mc-quiz").unwrap().len(), 2);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let store = LmsStore::open_in_memory().unwrap();
        let orphan = Lesson {
            id: "orphan".to_string(),
            course_id: "missing".to_string(),
            title: "x".to_string(),
            content: String::new(),
            video_url: None,
            sort_order: 0,
            duration_minutes: None,
        };
        assert!(matches!(store.upsert_lesson(&orphan), Err(Error::Storage(_))));
    }

    #[test]
    fn test_public_quiz_hides_answers() {
        let store = LmsStore::open_in_memory().unwrap();
        seed_quiz(&store);

        let quiz = store.public_quiz("mc-quiz").unwrap().unwrap();
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[0].options.len(), 2);
        let json = serde_json::to_string(&quiz).unwrap();
        assert!(!json.contains("isCorrect"));
        assert!(store.public_quiz("nope").unwrap().is_none());
    }

    #[test]
    fn test_submit_quiz_awards_xp_once() {
        let store = LmsStore::open_in_memory().unwrap();
        seed_quiz(&store);
        store.create_user(&user("kid", Role::Student)).unwrap();

        let all_right = answers(&[("q1", "q1-a"), ("q2", "q2-b")]);
        let first = store.submit_quiz("mc-quiz", "kid", &all_right).unwrap();
        assert_eq!(first.score, 100);
        assert!(first.passed);
        assert_eq!(first.xp_awarded, 40);
        assert_eq!(first.total_xp, 40);

        let second = store.submit_quiz("mc-quiz", "kid", &all_right).unwrap();
        assert!(second.passed);
        assert_eq!(second.xp_awarded, 0);
        assert_eq!(second.total_xp, 40);

        assert_eq!(store.results_for_user("kid").unwrap().len(), 2);
    }

    #[test]
    fn test_submit_quiz_partial_and_failing() {
        let store = LmsStore::open_in_memory().unwrap();
        seed_quiz(&store);
        store.create_user(&user("kid", Role::Student)).unwrap();

        let half = store.submit_quiz("mc-quiz", "kid", &answers(&[("q1", "q1-a")])).unwrap();
        assert_eq!(half.score, 50);
        assert_eq!(half.correct, 1);
        assert!(half.passed);

        let none = store.submit_quiz("mc-quiz", "kid", &answers(&[("q1", "q1-b"), ("q2", "q2-a")])).unwrap();
        assert_eq!(none.score, 0);
        assert!(!none.passed);
        assert_eq!(none.xp_awarded, 0);
    }

    #[test]
    fn test_submit_quiz_unknown_user_or_quiz() {
        let store = LmsStore::open_in_memory().unwrap();
        seed_quiz(&store);
        assert!(matches!(store.submit_quiz("mc-quiz", "ghost", &HashMap::new()), Err(Error::NotFound(_))));
        store.create_user(&user("kid", Role::Student)).unwrap();
        assert!(matches!(store.submit_quiz("nope", "kid", &HashMap::new()), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let store = LmsStore::open_in_memory().unwrap();
        store.create_user(&user("kid", Role::Student)).unwrap();
        assert!(matches!(store.create_user(&user("kid", Role::Student)), Err(Error::Validation(_))));
    }

    #[test]
    fn test_parent_links() {
        let store = LmsStore::open_in_memory().unwrap();
        store.create_user(&user("mom", Role::Parent)).unwrap();
        store.create_user(&user("kid", Role::Student)).unwrap();
        store.create_user(&user("kid2", Role::Student)).unwrap();

        store.link_parent_child("mom", "kid").unwrap();
        store.link_parent_child("mom", "kid").unwrap();
        store.link_parent_child("mom", "kid2").unwrap();
        assert_eq!(store.children_of("mom").unwrap().len(), 2);

        assert!(matches!(store.link_parent_child("kid", "kid2"), Err(Error::Validation(_))));
        assert!(matches!(store.link_parent_child("mom", "mom"), Err(Error::Validation(_))));
        assert!(matches!(store.link_parent_child("mom", "ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_coupon_lookup_and_usage() {
        let store = LmsStore::open_in_memory().unwrap();
        store
            .upsert_coupon(&Coupon {
                code: "summer20".to_string(),
                discount_type: DiscountType::Percent,
                discount_value: 20.0,
                product_id: None,
                active: true,
                max_uses: Some(5),
                times_used: 0,
                expires_at: None,
                expired: false,
            })
            .unwrap();
        store
            .upsert_coupon(&Coupon {
                code: "OLD".to_string(),
                discount_type: DiscountType::Flat,
                discount_value: 50.0,
                product_id: None,
                active: true,
                max_uses: None,
                times_used: 0,
                expires_at: Some("2000-01-01 00:00:00".to_string()),
                expired: false,
            })
            .unwrap();

        let coupon = store.get_coupon("Summer20").unwrap().unwrap();
        assert_eq!(coupon.code, "SUMMER20");
        assert!(!coupon.expired);

        assert!(store.reserve_coupon_use("SUMMER20").unwrap());
        assert_eq!(store.get_coupon("SUMMER20").unwrap().unwrap().times_used, 1);

        assert!(store.get_coupon("OLD").unwrap().unwrap().expired);
        assert!(store.get_coupon("MISSING").unwrap().is_none());
    }

    #[test]
    fn test_reserve_stops_at_max_uses() {
        let store = LmsStore::open_in_memory().unwrap();
        store
            .upsert_coupon(&Coupon {
                code: "ONCE".to_string(),
                discount_type: DiscountType::Flat,
                discount_value: 10.0,
                product_id: None,
                active: true,
                max_uses: Some(1),
                times_used: 0,
                expires_at: None,
                expired: false,
            })
            .unwrap();

        assert!(store.reserve_coupon_use("once").unwrap());
        assert!(!store.reserve_coupon_use("ONCE").unwrap());
        assert_eq!(store.get_coupon("ONCE").unwrap().unwrap().times_used, 1);

        store.release_coupon_use("ONCE").unwrap();
        assert_eq!(store.get_coupon("ONCE").unwrap().unwrap().times_used, 0);
        store.release_coupon_use("ONCE").unwrap();
        assert_eq!(store.get_coupon("ONCE").unwrap().unwrap().times_used, 0);

        assert!(store.reserve_coupon_use("ONCE").unwrap());
        assert!(!store.reserve_coupon_use("MISSING").unwrap());
    }
}
