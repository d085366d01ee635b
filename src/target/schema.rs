//! Target schema
//!
//! Surrogate ids come from one sequence per table. Natural keys carry UNIQUE
//! constraints; cross-table references are plain ids without foreign keys.

/// Tables in creation order
pub const TABLES: &[&str] = &[
    "sections",
    "users",
    "user_sections",
    "topics",
    "microblogs",
    "posts",
    "personas",
    "user_personas",
    "classrooms",
    "classroom_students",
    "feedback",
    "study",
];

/// Sequences backing surrogate ids
pub const SEQUENCES: &[&str] = &[
    "seq_sections",
    "seq_users",
    "seq_topics",
    "seq_microblogs",
    "seq_posts",
    "seq_personas",
    "seq_classrooms",
    "seq_feedback",
    "seq_study",
];

pub const CREATE_SCHEMA: &str = r"
CREATE SEQUENCE seq_sections START 1;
CREATE SEQUENCE seq_users START 1;
CREATE SEQUENCE seq_topics START 1;
CREATE SEQUENCE seq_microblogs START 1;
CREATE SEQUENCE seq_posts START 1;
CREATE SEQUENCE seq_personas START 1;
CREATE SEQUENCE seq_classrooms START 1;
CREATE SEQUENCE seq_feedback START 1;
CREATE SEQUENCE seq_study START 1;

CREATE TABLE sections (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_sections'),
    abbreviation VARCHAR NOT NULL UNIQUE,
    name VARCHAR
);

CREATE TABLE users (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_users'),
    uid VARCHAR NOT NULL UNIQUE,
    name VARCHAR,
    email VARCHAR,
    password VARCHAR NOT NULL DEFAULT '',
    sid VARCHAR,
    role VARCHAR NOT NULL DEFAULT 'User',
    pfp VARCHAR,
    kasm_server_needed BOOLEAN NOT NULL DEFAULT false,
    grade_data VARCHAR,
    ap_exam VARCHAR,
    school VARCHAR,
    classes VARCHAR
);

CREATE TABLE user_sections (
    user_id BIGINT NOT NULL,
    section_id BIGINT NOT NULL,
    PRIMARY KEY (user_id, section_id)
);

CREATE TABLE topics (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_topics'),
    page_path VARCHAR NOT NULL UNIQUE,
    page_title VARCHAR,
    page_description VARCHAR,
    display_name VARCHAR,
    color VARCHAR NOT NULL DEFAULT '#007bff',
    icon VARCHAR,
    allow_anonymous BOOLEAN NOT NULL DEFAULT false,
    moderated BOOLEAN NOT NULL DEFAULT false,
    max_posts_per_user BIGINT NOT NULL DEFAULT 10,
    settings VARCHAR NOT NULL DEFAULT '{}'
);

CREATE TABLE microblogs (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_microblogs'),
    user_id BIGINT NOT NULL,
    topic_id BIGINT,
    content VARCHAR NOT NULL,
    data VARCHAR NOT NULL DEFAULT '{}'
);

CREATE TABLE posts (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_posts'),
    user_id BIGINT NOT NULL,
    parent_id BIGINT,
    content VARCHAR,
    grade_received DOUBLE,
    page_url VARCHAR,
    page_title VARCHAR
);

CREATE TABLE personas (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_personas'),
    alias VARCHAR NOT NULL UNIQUE,
    category VARCHAR,
    bio_map VARCHAR,
    empathy_map VARCHAR
);

CREATE TABLE user_personas (
    user_id BIGINT NOT NULL,
    persona_id BIGINT NOT NULL,
    weight BIGINT NOT NULL,
    selected_at VARCHAR,
    PRIMARY KEY (user_id, persona_id)
);

CREATE TABLE classrooms (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_classrooms'),
    name VARCHAR,
    school_name VARCHAR,
    owner_id BIGINT NOT NULL,
    status VARCHAR NOT NULL DEFAULT 'active'
);

CREATE TABLE classroom_students (
    classroom_id BIGINT NOT NULL,
    user_id BIGINT NOT NULL,
    PRIMARY KEY (classroom_id, user_id)
);

CREATE TABLE feedback (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_feedback'),
    title VARCHAR,
    body VARCHAR,
    feedback_type VARCHAR NOT NULL DEFAULT 'Other',
    github_username VARCHAR,
    github_issue_url VARCHAR
);

CREATE TABLE study (
    id BIGINT PRIMARY KEY DEFAULT nextval('seq_study'),
    user_id BIGINT,
    topic VARCHAR,
    subtopic VARCHAR,
    studied BOOLEAN NOT NULL DEFAULT false,
    recorded_at VARCHAR
);
";
