mod queries;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jpics_application::{ApplicationError, GalleryStore, NameMatch, PictureScope};
use jpics_domain::{Category, CategoryId, DomainError, Picture, PictureId, Tag, TagId, User, UserId};
use rusqlite::{Connection, Transaction};
use tracing::debug;

use crate::migrations::MIGRATIONS;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PICTURE_CATEGORIES: (&str, &str) = ("picture_categories", "category_id");
const PICTURE_TAGS: (&str, &str) = ("picture_tags", "tag_id");

fn persistence(error: rusqlite::Error) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn typed<T: TryFrom<i64, Error = DomainError>>(values: Vec<i64>) -> Result<Vec<T>, ApplicationError> {
    values
        .into_iter()
        .map(|value| T::try_from(value).map_err(ApplicationError::from))
        .collect()
}

fn raw<T: Copy + Into<i64>>(values: &[T]) -> Vec<i64> {
    values.iter().map(|value| (*value).into()).collect()
}

/// Local mirror of the gallery in one SQLite file. Every call opens its own
/// connection, so the store can be shared freely across tasks.
#[derive(Debug, Clone)]
pub struct SqliteGalleryStore {
    path: PathBuf,
}

impl SqliteGalleryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_connection(&self) -> Result<Connection, ApplicationError> {
        let conn = Connection::open(&self.path).map_err(persistence)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(persistence)?;
        Ok(conn)
    }

    fn write<F>(&self, apply: F) -> Result<(), ApplicationError>
    where
        F: FnOnce(&Transaction<'_>) -> rusqlite::Result<()>,
    {
        let mut conn = self.open_connection()?;
        let tx = conn.transaction().map_err(persistence)?;
        apply(&tx).map_err(persistence)?;
        tx.commit().map_err(persistence)
    }

    fn read<T, F>(&self, query: F) -> Result<T, ApplicationError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.open_connection()?;
        query(&conn).map_err(persistence)
    }

    /// Deletes the rows of `table` not in `keep` with `delete`, returning
    /// the removed ids.
    fn retain(
        &self,
        table: &str,
        keep: &[i64],
        delete: fn(&Connection, i64) -> rusqlite::Result<()>,
    ) -> Result<Vec<i64>, ApplicationError> {
        let mut conn = self.open_connection()?;
        let tx = conn.transaction().map_err(persistence)?;
        let removed: Vec<i64> = queries::ids(&tx, table)
            .map_err(persistence)?
            .into_iter()
            .filter(|id| !keep.contains(id))
            .collect();
        for id in &removed {
            delete(&tx, *id).map_err(persistence)?;
        }
        tx.commit().map_err(persistence)?;
        if !removed.is_empty() {
            debug!(table, removed = removed.len(), "dropped rows missing on the server");
        }
        Ok(removed)
    }

    fn retain_links(
        &self,
        (table, other): (&str, &str),
        key: i64,
        by_picture: bool,
        keep: &[i64],
    ) -> Result<(), ApplicationError> {
        self.write(|tx| {
            for linked in queries::linked(tx, table, other, key, by_picture)? {
                if keep.contains(&linked) {
                    continue;
                }
                let (picture, value) = if by_picture { (key, linked) } else { (linked, key) };
                queries::unlink(tx, table, other, picture, value)?;
            }
            Ok(())
        })
    }
}

impl GalleryStore for SqliteGalleryStore {
    fn initialize(&self) -> Result<(), ApplicationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ApplicationError::InvalidInput(
                "database path must not be empty".to_string(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|error| ApplicationError::Io(error.to_string()))?;
            }
        }

        let conn = self.open_connection()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(persistence)?;

        for migration in MIGRATIONS {
            conn.execute_batch(migration).map_err(persistence)?;
        }

        Ok(())
    }

    fn upsert_categories(&self, categories: &[Category]) -> Result<(), ApplicationError> {
        self.write(|tx| {
            categories
                .iter()
                .try_for_each(|category| queries::upsert_category(tx, category))
        })
    }

    fn retain_categories(&self, keep: &[CategoryId]) -> Result<Vec<CategoryId>, ApplicationError> {
        let removed = self.retain("categories", &raw(keep), queries::delete_category)?;
        typed(removed)
    }

    fn delete_category(&self, category: CategoryId) -> Result<(), ApplicationError> {
        self.write(|tx| queries::delete_category(tx, category.get()))
    }

    fn find_category(&self, category: CategoryId) -> Result<Option<Category>, ApplicationError> {
        self.read(|conn| queries::find_category(conn, category.get()))
    }

    fn find_category_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<Category>, ApplicationError> {
        self.read(|conn| queries::find_category_by_name(conn, name, mode))
    }

    fn list_categories(&self) -> Result<Vec<Category>, ApplicationError> {
        self.read(queries::list_categories)
    }

    fn upsert_pictures(&self, pictures: &[Picture]) -> Result<(), ApplicationError> {
        self.write(|tx| {
            pictures
                .iter()
                .try_for_each(|picture| queries::upsert_picture(tx, picture))
        })
    }

    fn retain_pictures(&self, keep: &[PictureId]) -> Result<Vec<PictureId>, ApplicationError> {
        let removed = self.retain("pictures", &raw(keep), queries::delete_picture)?;
        typed(removed)
    }

    fn delete_pictures(&self, pictures: &[PictureId]) -> Result<(), ApplicationError> {
        self.write(|tx| {
            pictures
                .iter()
                .try_for_each(|picture| queries::delete_picture(tx, picture.get()))
        })
    }

    fn find_picture(&self, picture: PictureId) -> Result<Option<Picture>, ApplicationError> {
        self.read(|conn| queries::find_picture(conn, picture.get()))
    }

    fn find_pictures(&self, pictures: &[PictureId]) -> Result<Vec<Picture>, ApplicationError> {
        self.read(|conn| {
            let mut found = Vec::with_capacity(pictures.len());
            for picture in pictures {
                if let Some(row) = queries::find_picture(conn, picture.get())? {
                    found.push(row);
                }
            }
            Ok(found)
        })
    }

    fn list_pictures(&self, scope: &PictureScope) -> Result<Vec<Picture>, ApplicationError> {
        self.read(|conn| queries::list_pictures(conn, scope))
    }

    fn upsert_tags(&self, tags: &[Tag]) -> Result<(), ApplicationError> {
        self.write(|tx| tags.iter().try_for_each(|tag| queries::upsert_tag(tx, tag)))
    }

    fn retain_tags(&self, keep: &[TagId]) -> Result<Vec<TagId>, ApplicationError> {
        let removed = self.retain("tags", &raw(keep), queries::delete_tag)?;
        typed(removed)
    }

    fn find_tag(&self, tag: TagId) -> Result<Option<Tag>, ApplicationError> {
        self.read(|conn| queries::find_tag(conn, tag.get()))
    }

    fn find_tag_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<Tag>, ApplicationError> {
        self.read(|conn| queries::find_tag_by_name(conn, name, mode))
    }

    fn list_tags(&self) -> Result<Vec<Tag>, ApplicationError> {
        self.read(queries::list_tags)
    }

    fn upsert_users(&self, users: &[User]) -> Result<(), ApplicationError> {
        self.write(|tx| users.iter().try_for_each(|user| queries::upsert_user(tx, user)))
    }

    fn retain_users(&self, keep: &[UserId]) -> Result<Vec<UserId>, ApplicationError> {
        let removed = self.retain("users", &raw(keep), queries::delete_user)?;
        typed(removed)
    }

    fn find_user(&self, user: UserId) -> Result<Option<User>, ApplicationError> {
        self.read(|conn| queries::find_user(conn, user.get()))
    }

    fn find_user_by_name(
        &self,
        name: &str,
        mode: NameMatch,
    ) -> Result<Option<User>, ApplicationError> {
        self.read(|conn| queries::find_user_by_name(conn, name, mode))
    }

    fn list_users(&self) -> Result<Vec<User>, ApplicationError> {
        self.read(queries::list_users)
    }

    fn link_picture_categories(
        &self,
        links: &[(PictureId, CategoryId)],
    ) -> Result<(), ApplicationError> {
        let (table, other) = PICTURE_CATEGORIES;
        self.write(|tx| {
            links.iter().try_for_each(|(picture, category)| {
                queries::link(tx, table, other, picture.get(), category.get())
            })
        })
    }

    fn unlink_picture_category(
        &self,
        picture: PictureId,
        category: CategoryId,
    ) -> Result<(), ApplicationError> {
        let (table, other) = PICTURE_CATEGORIES;
        self.write(|tx| queries::unlink(tx, table, other, picture.get(), category.get()))
    }

    fn retain_picture_categories(
        &self,
        picture: PictureId,
        keep: &[CategoryId],
    ) -> Result<(), ApplicationError> {
        self.retain_links(PICTURE_CATEGORIES, picture.get(), true, &raw(keep))
    }

    fn retain_category_pictures(
        &self,
        category: CategoryId,
        keep: &[PictureId],
    ) -> Result<(), ApplicationError> {
        self.retain_links(PICTURE_CATEGORIES, category.get(), false, &raw(keep))
    }

    fn picture_categories(&self, picture: PictureId) -> Result<Vec<CategoryId>, ApplicationError> {
        let (table, other) = PICTURE_CATEGORIES;
        typed(self.read(|conn| queries::linked(conn, table, other, picture.get(), true))?)
    }

    fn category_pictures(&self, category: CategoryId) -> Result<Vec<PictureId>, ApplicationError> {
        let (table, other) = PICTURE_CATEGORIES;
        typed(self.read(|conn| queries::linked(conn, table, other, category.get(), false))?)
    }

    fn link_picture_tags(&self, links: &[(PictureId, TagId)]) -> Result<(), ApplicationError> {
        let (table, other) = PICTURE_TAGS;
        self.write(|tx| {
            links
                .iter()
                .try_for_each(|(picture, tag)| queries::link(tx, table, other, picture.get(), tag.get()))
        })
    }

    fn retain_picture_tags(
        &self,
        picture: PictureId,
        keep: &[TagId],
    ) -> Result<(), ApplicationError> {
        self.retain_links(PICTURE_TAGS, picture.get(), true, &raw(keep))
    }

    fn retain_tag_pictures(&self, tag: TagId, keep: &[PictureId]) -> Result<(), ApplicationError> {
        self.retain_links(PICTURE_TAGS, tag.get(), false, &raw(keep))
    }

    fn picture_tags(&self, picture: PictureId) -> Result<Vec<TagId>, ApplicationError> {
        let (table, other) = PICTURE_TAGS;
        typed(self.read(|conn| queries::linked(conn, table, other, picture.get(), true))?)
    }

    fn tag_pictures(&self, tag: TagId) -> Result<Vec<PictureId>, ApplicationError> {
        let (table, other) = PICTURE_TAGS;
        typed(self.read(|conn| queries::linked(conn, table, other, tag.get(), false))?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;

    fn category_id(value: i64) -> CategoryId {
        CategoryId::new(value).expect("category id")
    }

    fn picture_id(value: i64) -> PictureId {
        PictureId::new(value).expect("picture id")
    }

    fn tag_id(value: i64) -> TagId {
        TagId::new(value).expect("tag id")
    }

    fn picture(value: i64, day: u32) -> Picture {
        let mut picture = Picture::new(picture_id(value), format!("IMG_{value}"));
        picture.created_at = NaiveDate::from_ymd_opt(2023, 1, day)
            .and_then(|date| date.and_hms_opt(12, 0, 0));
        picture
    }

    fn store(dir: &TempDir) -> SqliteGalleryStore {
        let store = SqliteGalleryStore::new(dir.path().join("nested").join("gallery.sqlite3"));
        store.initialize().expect("initialize");
        store
    }

    #[test]
    fn initialize_creates_schema_and_is_repeatable() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store.initialize().expect("second initialize");

        let conn = Connection::open(store.path()).expect("open");
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
                 AND name IN ('categories', 'pictures', 'tags', 'users',
                              'picture_categories', 'picture_tags')",
                [],
                |row| row.get(0),
            )
            .expect("query");
        assert_eq!(count, 6);
    }

    #[test]
    fn empty_path_is_rejected() {
        let store = SqliteGalleryStore::new("");
        assert!(matches!(
            store.initialize(),
            Err(ApplicationError::InvalidInput(_))
        ));
    }

    #[test]
    fn categories_upsert_and_lookup_by_name() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        let mut travel = Category::new(category_id(5), "Travel", None);
        let rome = Category::new(category_id(7), "Rome 2021", Some(category_id(5)));
        store
            .upsert_categories(&[travel.clone(), rome.clone()])
            .expect("upsert");
        travel.representative = Some(picture_id(42));
        travel.picture_count = 3;
        store.upsert_categories(&[travel.clone()]).expect("update");

        assert_eq!(store.find_category(category_id(5)).expect("find"), Some(travel));
        assert_eq!(
            store
                .find_category_by_name("Rome", NameMatch::Prefix)
                .expect("prefix"),
            Some(rome.clone())
        );
        assert_eq!(
            store
                .find_category_by_name("2021", NameMatch::Contains)
                .expect("contains"),
            Some(rome)
        );
        assert_eq!(
            store
                .find_category_by_name("rome", NameMatch::Prefix)
                .expect("case"),
            None
        );
    }

    #[test]
    fn retain_drops_rows_and_their_links() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .upsert_categories(&[
                Category::new(category_id(1), "a", None),
                Category::new(category_id(2), "b", None),
            ])
            .expect("categories");
        store.upsert_pictures(&[picture(10, 1)]).expect("pictures");
        store
            .link_picture_categories(&[
                (picture_id(10), category_id(1)),
                (picture_id(10), category_id(2)),
            ])
            .expect("links");

        let removed = store.retain_categories(&[category_id(1)]).expect("retain");

        assert_eq!(removed, vec![category_id(2)]);
        assert_eq!(
            store.picture_categories(picture_id(10)).expect("links"),
            vec![category_id(1)]
        );
    }

    #[test]
    fn picture_scopes_filter_and_sort_by_creation() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        let mut archived = picture(3, 1);
        archived.archived = true;
        store
            .upsert_pictures(&[picture(1, 20), picture(2, 10), archived])
            .expect("pictures");
        store
            .link_picture_categories(&[
                (picture_id(1), category_id(9)),
                (picture_id(2), category_id(9)),
                (picture_id(3), category_id(9)),
            ])
            .expect("links");
        store
            .link_picture_tags(&[(picture_id(1), tag_id(4)), (picture_id(3), tag_id(4))])
            .expect("tags");

        let ids = |scope: PictureScope| -> Vec<i64> {
            store
                .list_pictures(&scope)
                .expect("list")
                .into_iter()
                .map(|picture| picture.id.get())
                .collect()
        };

        assert_eq!(ids(PictureScope::All { include_archived: false }), vec![2, 1]);
        assert_eq!(ids(PictureScope::All { include_archived: true }), vec![3, 2, 1]);
        assert_eq!(
            ids(PictureScope::InCategories {
                categories: vec![category_id(9)],
                include_archived: false,
            }),
            vec![2, 1]
        );
        assert_eq!(
            ids(PictureScope::InCategories {
                categories: Vec::new(),
                include_archived: true,
            }),
            Vec::<i64>::new()
        );
        assert_eq!(ids(PictureScope::Archived), vec![3]);
        assert_eq!(ids(PictureScope::Tagged(tag_id(4))), vec![1]);
    }

    #[test]
    fn pictures_round_trip_every_column() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        let mut stored = picture(8, 2);
        stored.file = "IMG_8.jpg".to_string();
        stored.width = 4000;
        stored.height = 3000;
        stored.thumbnail_url = "https://g/t.jpg".to_string();
        stored.element_url = "https://g/e.mp4".to_string();
        store.upsert_pictures(&[stored.clone()]).expect("upsert");

        assert_eq!(store.find_picture(picture_id(8)).expect("find"), Some(stored));
        assert_eq!(
            store
                .find_pictures(&[picture_id(99), picture_id(8)])
                .expect("find many")
                .len(),
            1
        );
    }

    #[test]
    fn deleting_pictures_clears_relations() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store.upsert_pictures(&[picture(1, 1), picture(2, 2)]).expect("pictures");
        store
            .link_picture_categories(&[(picture_id(1), category_id(5)), (picture_id(2), category_id(5))])
            .expect("links");
        store
            .link_picture_tags(&[(picture_id(1), tag_id(3))])
            .expect("tags");

        store.delete_pictures(&[picture_id(1)]).expect("delete");

        assert_eq!(
            store.category_pictures(category_id(5)).expect("pictures"),
            vec![picture_id(2)]
        );
        assert!(store.tag_pictures(tag_id(3)).expect("tagged").is_empty());
    }

    #[test]
    fn retain_links_keeps_only_listed_relations() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .link_picture_categories(&[
                (picture_id(1), category_id(5)),
                (picture_id(2), category_id(5)),
                (picture_id(1), category_id(6)),
            ])
            .expect("links");
        store
            .link_picture_tags(&[(picture_id(1), tag_id(3)), (picture_id(1), tag_id(4))])
            .expect("tags");

        store
            .retain_category_pictures(category_id(5), &[picture_id(2)])
            .expect("retain category");
        store
            .retain_picture_tags(picture_id(1), &[tag_id(4)])
            .expect("retain tags");

        assert_eq!(
            store.picture_categories(picture_id(1)).expect("links"),
            vec![category_id(6)]
        );
        assert_eq!(store.picture_tags(picture_id(1)).expect("tags"), vec![tag_id(4)]);
    }

    #[test]
    fn tags_and_users_are_mirrored() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        store
            .upsert_tags(&[Tag::new(tag_id(1), "family"), Tag::new(tag_id(2), "trip")])
            .expect("tags");
        store
            .upsert_users(&[User {
                id: UserId::new(3).expect("user id"),
                username: "alice".to_string(),
                email: "alice@example.org".to_string(),
                status: "admin".to_string(),
            }])
            .expect("users");

        assert_eq!(
            store
                .find_tag_by_name("trip", NameMatch::Exact)
                .expect("tag")
                .map(|tag| tag.id),
            Some(tag_id(2))
        );
        assert_eq!(store.retain_tags(&[tag_id(2)]).expect("retain"), vec![tag_id(1)]);
        assert_eq!(
            store
                .find_user_by_name("ali", NameMatch::Prefix)
                .expect("user")
                .map(|user| user.email),
            Some("alice@example.org".to_string())
        );
        assert!(store.retain_users(&[]).expect("retain users").len() == 1);
        assert!(store.list_users().expect("users").is_empty());
    }

    #[test]
    fn repeating_the_same_upserts_leaves_the_store_unchanged() {
        let dir = TempDir::new().expect("tempdir");
        let store = store(&dir);
        let categories = [
            Category::new(category_id(5), "Travel", None),
            Category::new(category_id(7), "Rome", Some(category_id(5))),
        ];
        let pictures = [picture(1, 3), picture(2, 4)];
        let tags = [Tag::new(tag_id(4), "sea")];
        let category_links = [(picture_id(1), category_id(7)), (picture_id(2), category_id(5))];
        let tag_links = [(picture_id(1), tag_id(4))];

        let apply = || {
            store.upsert_categories(&categories).expect("categories");
            store.upsert_pictures(&pictures).expect("pictures");
            store.upsert_tags(&tags).expect("tags");
            store.link_picture_categories(&category_links).expect("category links");
            store.link_picture_tags(&tag_links).expect("tag links");
        };
        let snapshot = || {
            (
                store.list_categories().expect("categories"),
                store
                    .list_pictures(&PictureScope::All {
                        include_archived: true,
                    })
                    .expect("pictures"),
                store.list_tags().expect("tags"),
                store.category_pictures(category_id(7)).expect("rome"),
                store.category_pictures(category_id(5)).expect("travel"),
                store.tag_pictures(tag_id(4)).expect("sea"),
            )
        };

        apply();
        let first = snapshot();
        apply();

        assert_eq!(snapshot(), first);
        assert_eq!(first.1.len(), 2);
        assert_eq!(first.3, vec![picture_id(1)]);
    }
}
