use chrono::NaiveDateTime;
use jpics_application::{NameMatch, PictureScope};
use jpics_domain::{Category, DomainError, Picture, Tag, User};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result, Row};

use crate::piwigo::DATE_FORMAT;

const CATEGORY_COLUMNS: &str =
    "id, name, parent_id, representative_id, thumbnail_url, picture_count";
const PICTURE_COLUMNS: &str = "id, name, file, width, height, created_at, archived, \
     thumbnail_url, full_url, large_url, element_url";

fn id_column<T: TryFrom<i64, Error = DomainError>>(row: &Row<'_>, index: usize) -> Result<T> {
    let value: i64 = row.get(index)?;
    T::try_from(value)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error)))
}

fn optional_id_column<T: TryFrom<i64, Error = DomainError>>(
    row: &Row<'_>,
    index: usize,
) -> Result<Option<T>> {
    let value: Option<i64> = row.get(index)?;
    value
        .map(|value| {
            T::try_from(value).map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(index, Type::Integer, Box::new(error))
            })
        })
        .transpose()
}

fn category_from_row(row: &Row<'_>) -> Result<Category> {
    Ok(Category {
        id: id_column(row, 0)?,
        name: row.get(1)?,
        parent: optional_id_column(row, 2)?,
        representative: optional_id_column(row, 3)?,
        thumbnail_url: row.get(4)?,
        picture_count: row.get(5)?,
    })
}

fn picture_from_row(row: &Row<'_>) -> Result<Picture> {
    let created_at: Option<String> = row.get(5)?;
    let created_at = created_at
        .map(|text| {
            NaiveDateTime::parse_from_str(&text, DATE_FORMAT).map_err(|error| {
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error))
            })
        })
        .transpose()?;
    Ok(Picture {
        id: id_column(row, 0)?,
        name: row.get(1)?,
        file: row.get(2)?,
        width: row.get(3)?,
        height: row.get(4)?,
        created_at,
        archived: row.get(6)?,
        thumbnail_url: row.get(7)?,
        full_url: row.get(8)?,
        large_url: row.get(9)?,
        element_url: row.get(10)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> Result<Tag> {
    Ok(Tag {
        id: id_column(row, 0)?,
        name: row.get(1)?,
    })
}

fn user_from_row(row: &Row<'_>) -> Result<User> {
    Ok(User {
        id: id_column(row, 0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        status: row.get(3)?,
    })
}

/// Case-sensitive, like the in-memory comparison it mirrors.
fn name_clause(column: &str, mode: NameMatch) -> String {
    match mode {
        NameMatch::Exact => format!("{column} = ?1"),
        NameMatch::Prefix => format!("instr({column}, ?1) = 1"),
        NameMatch::Contains => format!("instr({column}, ?1) > 0"),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub fn ids(conn: &Connection, table: &str) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!("SELECT id FROM {table} ORDER BY id"))?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

pub fn upsert_category(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories
         (id, name, parent_id, representative_id, thumbnail_url, picture_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            parent_id = excluded.parent_id,
            representative_id = excluded.representative_id,
            thumbnail_url = excluded.thumbnail_url,
            picture_count = excluded.picture_count",
        params![
            category.id.get(),
            category.name,
            category.parent.map(|id| id.get()),
            category.representative.map(|id| id.get()),
            category.thumbnail_url,
            category.picture_count,
        ],
    )?;
    Ok(())
}

pub fn delete_category(conn: &Connection, category: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM picture_categories WHERE category_id = ?1",
        params![category],
    )?;
    conn.execute("DELETE FROM categories WHERE id = ?1", params![category])?;
    Ok(())
}

pub fn find_category(conn: &Connection, category: i64) -> Result<Option<Category>> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
        params![category],
        category_from_row,
    )
    .optional()
}

pub fn find_category_by_name(
    conn: &Connection,
    name: &str,
    mode: NameMatch,
) -> Result<Option<Category>> {
    conn.query_row(
        &format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE {} ORDER BY id LIMIT 1",
            name_clause("name", mode)
        ),
        params![name],
        category_from_row,
    )
    .optional()
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id"
    ))?;
    let rows = stmt.query_map([], category_from_row)?;
    rows.collect()
}

pub fn upsert_picture(conn: &Connection, picture: &Picture) -> Result<()> {
    conn.execute(
        "INSERT INTO pictures
         (id, name, file, width, height, created_at, archived,
          thumbnail_url, full_url, large_url, element_url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            file = excluded.file,
            width = excluded.width,
            height = excluded.height,
            created_at = excluded.created_at,
            archived = excluded.archived,
            thumbnail_url = excluded.thumbnail_url,
            full_url = excluded.full_url,
            large_url = excluded.large_url,
            element_url = excluded.element_url",
        params![
            picture.id.get(),
            picture.name,
            picture.file,
            picture.width,
            picture.height,
            picture
                .created_at
                .map(|date| date.format(DATE_FORMAT).to_string()),
            picture.archived,
            picture.thumbnail_url,
            picture.full_url,
            picture.large_url,
            picture.element_url,
        ],
    )?;
    Ok(())
}

pub fn delete_picture(conn: &Connection, picture: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM picture_categories WHERE picture_id = ?1",
        params![picture],
    )?;
    conn.execute("DELETE FROM picture_tags WHERE picture_id = ?1", params![picture])?;
    conn.execute("DELETE FROM pictures WHERE id = ?1", params![picture])?;
    Ok(())
}

pub fn find_picture(conn: &Connection, picture: i64) -> Result<Option<Picture>> {
    conn.query_row(
        &format!("SELECT {PICTURE_COLUMNS} FROM pictures WHERE id = ?1"),
        params![picture],
        picture_from_row,
    )
    .optional()
}

pub fn list_pictures(conn: &Connection, scope: &PictureScope) -> Result<Vec<Picture>> {
    let (filter, values): (String, Vec<i64>) = match scope {
        PictureScope::All { include_archived } => (
            archived_filter(*include_archived).to_string(),
            Vec::new(),
        ),
        PictureScope::InCategories {
            categories,
            include_archived,
        } => {
            if categories.is_empty() {
                return Ok(Vec::new());
            }
            (
                format!(
                    "{} AND id IN (SELECT picture_id FROM picture_categories
                                   WHERE category_id IN ({}))",
                    archived_filter(*include_archived),
                    placeholders(categories.len())
                ),
                categories.iter().map(|id| id.get()).collect(),
            )
        }
        PictureScope::Archived => ("archived = 1".to_string(), Vec::new()),
        PictureScope::Tagged(tag) => (
            "archived = 0 AND id IN (SELECT picture_id FROM picture_tags WHERE tag_id = ?)"
                .to_string(),
            vec![tag.get()],
        ),
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {PICTURE_COLUMNS} FROM pictures WHERE {filter} ORDER BY created_at, id"
    ))?;
    let rows = stmt.query_map(params_from_iter(values), picture_from_row)?;
    rows.collect()
}

fn archived_filter(include_archived: bool) -> &'static str {
    if include_archived {
        "1 = 1"
    } else {
        "archived = 0"
    }
}

pub fn upsert_tag(conn: &Connection, tag: &Tag) -> Result<()> {
    conn.execute(
        "INSERT INTO tags (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![tag.id.get(), tag.name],
    )?;
    Ok(())
}

pub fn delete_tag(conn: &Connection, tag: i64) -> Result<()> {
    conn.execute("DELETE FROM picture_tags WHERE tag_id = ?1", params![tag])?;
    conn.execute("DELETE FROM tags WHERE id = ?1", params![tag])?;
    Ok(())
}

pub fn find_tag(conn: &Connection, tag: i64) -> Result<Option<Tag>> {
    conn.query_row(
        "SELECT id, name FROM tags WHERE id = ?1",
        params![tag],
        tag_from_row,
    )
    .optional()
}

pub fn find_tag_by_name(conn: &Connection, name: &str, mode: NameMatch) -> Result<Option<Tag>> {
    conn.query_row(
        &format!(
            "SELECT id, name FROM tags WHERE {} ORDER BY id LIMIT 1",
            name_clause("name", mode)
        ),
        params![name],
        tag_from_row,
    )
    .optional()
}

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY id")?;
    let rows = stmt.query_map([], tag_from_row)?;
    rows.collect()
}

pub fn upsert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, username, email, status) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            email = excluded.email,
            status = excluded.status",
        params![user.id.get(), user.username, user.email, user.status],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, user: i64) -> Result<()> {
    conn.execute("DELETE FROM users WHERE id = ?1", params![user])?;
    Ok(())
}

pub fn find_user(conn: &Connection, user: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, email, status FROM users WHERE id = ?1",
        params![user],
        user_from_row,
    )
    .optional()
}

pub fn find_user_by_name(conn: &Connection, name: &str, mode: NameMatch) -> Result<Option<User>> {
    conn.query_row(
        &format!(
            "SELECT id, username, email, status FROM users WHERE {} ORDER BY id LIMIT 1",
            name_clause("username", mode)
        ),
        params![name],
        user_from_row,
    )
    .optional()
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, username, email, status FROM users ORDER BY id")?;
    let rows = stmt.query_map([], user_from_row)?;
    rows.collect()
}

/// `table` holds `(picture_id, <other>)` pairs.
pub fn link(conn: &Connection, table: &str, other: &str, picture: i64, value: i64) -> Result<()> {
    conn.execute(
        &format!("INSERT OR IGNORE INTO {table} (picture_id, {other}) VALUES (?1, ?2)"),
        params![picture, value],
    )?;
    Ok(())
}

pub fn unlink(conn: &Connection, table: &str, other: &str, picture: i64, value: i64) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {table} WHERE picture_id = ?1 AND {other} = ?2"),
        params![picture, value],
    )?;
    Ok(())
}

/// Values linked to `picture`, or pictures linked to `value` when
/// `by_picture` is false.
pub fn linked(
    conn: &Connection,
    table: &str,
    other: &str,
    key: i64,
    by_picture: bool,
) -> Result<Vec<i64>> {
    let (select, filter) = if by_picture {
        (other, "picture_id")
    } else {
        ("picture_id", other)
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {select} FROM {table} WHERE {filter} = ?1 ORDER BY {select}"
    ))?;
    let rows = stmt.query_map(params![key], |row| row.get(0))?;
    rows.collect()
}
