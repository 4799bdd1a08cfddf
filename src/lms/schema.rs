//! Database schema definitions
//!
//! One canonical schema. Quizzes carry `time_limit_minutes`, and every
//! timestamp defaults to `CURRENT_TIMESTAMP`.

pub const PRAGMAS: &str = "PRAGMA foreign_keys = ON;";

/// SQL to create the users table
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'student' CHECK (role IN ('student', 'parent', 'admin')),
    xp INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the parent_child_links table
pub const CREATE_PARENT_CHILD_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS parent_child_links (
    parent_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    child_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (parent_id, child_id)
)
"#;

/// SQL to create the courses table
pub const CREATE_COURSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    price INTEGER NOT NULL DEFAULT 0,
    image_url TEXT,
    published INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the lessons table
pub const CREATE_LESSONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS lessons (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    video_url TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    duration_minutes INTEGER,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the quizzes table
pub const CREATE_QUIZZES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quizzes (
    id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    lesson_id TEXT REFERENCES lessons(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    passing_score INTEGER NOT NULL DEFAULT 70,
    time_limit_minutes INTEGER,
    xp_reward INTEGER NOT NULL DEFAULT 50,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the quiz_questions table
pub const CREATE_QUIZ_QUESTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quiz_questions (
    id TEXT PRIMARY KEY,
    quiz_id TEXT NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
    question TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the quiz_options table
pub const CREATE_QUIZ_OPTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quiz_options (
    id TEXT PRIMARY KEY,
    question_id TEXT NOT NULL REFERENCES quiz_questions(id) ON DELETE CASCADE,
    text TEXT NOT NULL,
    is_correct INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the quiz_results table
pub const CREATE_QUIZ_RESULTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quiz_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quiz_id TEXT NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    score INTEGER NOT NULL,
    passed INTEGER NOT NULL,
    answers TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the coupons table
pub const CREATE_COUPONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS coupons (
    code TEXT PRIMARY KEY,
    discount_type TEXT NOT NULL CHECK (discount_type IN ('percent', 'flat')),
    discount_value REAL NOT NULL,
    product_id TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    max_uses INTEGER,
    times_used INTEGER NOT NULL DEFAULT 0,
    expires_at TEXT
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons(course_id, sort_order)",
    "CREATE INDEX IF NOT EXISTS idx_quizzes_course ON quizzes(course_id)",
    "CREATE INDEX IF NOT EXISTS idx_quizzes_lesson ON quizzes(lesson_id)",
    "CREATE INDEX IF NOT EXISTS idx_questions_quiz ON quiz_questions(quiz_id, sort_order)",
    "CREATE INDEX IF NOT EXISTS idx_options_question ON quiz_options(question_id, sort_order)",
    "CREATE INDEX IF NOT EXISTS idx_results_user ON quiz_results(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_results_quiz ON quiz_results(quiz_id, user_id)",
    "CREATE INDEX IF NOT EXISTS idx_links_child ON parent_child_links(child_id)",
];

/// Tables in foreign-key dependency order
pub const TABLES: &[&str] = &[
    "users",
    "parent_child_links",
    "courses",
    "lessons",
    "quizzes",
    "quiz_questions",
    "quiz_options",
    "quiz_results",
    "coupons",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_USERS_TABLE,
        CREATE_PARENT_CHILD_LINKS_TABLE,
        CREATE_COURSES_TABLE,
        CREATE_LESSONS_TABLE,
        CREATE_QUIZZES_TABLE,
        CREATE_QUIZ_QUESTIONS_TABLE,
        CREATE_QUIZ_OPTIONS_TABLE,
        CREATE_QUIZ_RESULTS_TABLE,
        CREATE_COUPONS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
