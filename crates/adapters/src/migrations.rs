/// Applied in order on every start; each statement is idempotent.
pub const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS categories (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        parent_id INTEGER,
        representative_id INTEGER,
        thumbnail_url TEXT NOT NULL DEFAULT '',
        picture_count INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_categories_parent ON categories(parent_id);",
    "CREATE TABLE IF NOT EXISTS pictures (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        file TEXT NOT NULL DEFAULT '',
        width INTEGER NOT NULL DEFAULT 0,
        height INTEGER NOT NULL DEFAULT 0,
        created_at TEXT,
        archived INTEGER NOT NULL DEFAULT 0,
        thumbnail_url TEXT NOT NULL DEFAULT '',
        full_url TEXT NOT NULL DEFAULT '',
        large_url TEXT NOT NULL DEFAULT '',
        element_url TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_pictures_created_at ON pictures(created_at, id);",
    "CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL,
        email TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT ''
    );",
    "CREATE TABLE IF NOT EXISTS picture_categories (
        picture_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        PRIMARY KEY (picture_id, category_id)
    );
    CREATE INDEX IF NOT EXISTS idx_picture_categories_category
        ON picture_categories(category_id);
    CREATE TABLE IF NOT EXISTS picture_tags (
        picture_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (picture_id, tag_id)
    );
    CREATE INDEX IF NOT EXISTS idx_picture_tags_tag ON picture_tags(tag_id);",
];
