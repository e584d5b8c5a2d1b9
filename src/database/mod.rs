use anyhow::anyhow;
use rusqlite::OptionalExtension;
use types::{UserLookup, UserRecord};

pub mod types;

pub trait Database {
    // Inserts a new user record; duplicate keys and other failures are not told apart
    fn create_user(
        &self,
        handle: &str,
        discriminator: Option<&str>,
        external_id: u64,
        points: i64,
        total_reviews: i64,
    ) -> Result<(), anyhow::Error>;

    // Finds a user by stable id or by (handle, discriminator)
    fn find_user(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, anyhow::Error>;

    // Gets every user, or None when the ledger is empty
    fn find_all_users(&self) -> Result<Option<Vec<UserRecord>>, anyhow::Error>;

    // Increments both points and total_reviews by delta in one statement
    fn update_user(&self, external_id: u64, delta: i64) -> Result<(), anyhow::Error>;

    // Increments points and total_reviews by independent deltas in one statement
    fn adjust_user(
        &self,
        external_id: u64,
        points_delta: i64,
        reviews_delta: i64,
    ) -> Result<(), anyhow::Error>;

    // Stamps the last successful gated post
    fn mark_submitted(&self, external_id: u64, timestamp: &str) -> Result<(), anyhow::Error>;
}

#[derive(Default, Debug)]
pub struct DatabaseConnectionCreater {
    file_path: Option<String>,
}

pub struct DatabaseConnection {
    connection: rusqlite::Connection,
}

const SELECT_COLUMNS: &str =
    "SELECT handle, discriminator, external_id, points, total_reviews, last_submitted FROM users";

impl DatabaseConnectionCreater {
    pub fn open_else_new(file_path: &str) -> Self {
        Self {
            file_path: Some(file_path.to_string()),
        }
    }

    pub fn open_in_memory() -> Self {
        Self::default()
    }

    fn initialize_table_if_needed(
        dbconn: DatabaseConnection,
    ) -> Result<DatabaseConnection, anyhow::Error> {
        let statement = r#"
CREATE TABLE IF NOT EXISTS "users" (
  "handle"	TEXT NOT NULL UNIQUE,
  "discriminator"	TEXT,
  "external_id"	INTEGER NOT NULL,
  "points"	INTEGER NOT NULL DEFAULT 0,
  "total_reviews"	INTEGER NOT NULL DEFAULT 0,
  "last_submitted"	TEXT,
  PRIMARY KEY("external_id")
);
"#;
        let _ = dbconn.connection.execute(statement, ())?;
        Ok(dbconn)
    }

    pub fn start(self) -> Result<DatabaseConnection, anyhow::Error> {
        let connection = match self.file_path {
            Some(path) => DatabaseConnection {
                connection: rusqlite::Connection::open(path)?,
            },
            None => DatabaseConnection {
                connection: rusqlite::Connection::open_in_memory()?,
            },
        };

        Self::initialize_table_if_needed(connection)
    }
}

impl DatabaseConnection {
    fn row_to_record(row: &rusqlite::Row) -> Result<UserRecord, rusqlite::Error> {
        Ok(UserRecord {
            handle: row.get(0)?,
            discriminator: row.get(1)?,
            external_id: row.get(2)?,
            points: row.get(3)?,
            total_reviews: row.get(4)?,
            last_submitted: row.get(5)?,
        })
    }

    fn expect_one_row(changed: usize, external_id: u64) -> Result<(), anyhow::Error> {
        match changed {
            1 => Ok(()),
            _ => Err(anyhow!("record not found for {}", external_id)),
        }
    }
}

impl Database for DatabaseConnection {
    fn create_user(
        &self,
        handle: &str,
        discriminator: Option<&str>,
        external_id: u64,
        points: i64,
        total_reviews: i64,
    ) -> Result<(), anyhow::Error> {
        let statement = r#"INSERT INTO users (handle, discriminator, external_id, points, total_reviews) VALUES (?, ?, ?, ?, ?);"#;

        let _ = self.connection.execute(
            statement,
            (handle, discriminator, external_id, points, total_reviews),
        )?;

        Ok(())
    }

    fn find_user(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, anyhow::Error> {
        let record = match lookup {
            UserLookup::Id(external_id) => self
                .connection
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE external_id = ? LIMIT 1;"),
                    (external_id,),
                    Self::row_to_record,
                )
                .optional()?,
            // IS compares NULL discriminators as equal
            UserLookup::Name {
                handle,
                discriminator,
            } => self
                .connection
                .query_row(
                    &format!("{SELECT_COLUMNS} WHERE handle = ? AND discriminator IS ? LIMIT 1;"),
                    (handle, discriminator),
                    Self::row_to_record,
                )
                .optional()?,
        };

        Ok(record)
    }

    fn find_all_users(&self) -> Result<Option<Vec<UserRecord>>, anyhow::Error> {
        let mut statement = self.connection.prepare(SELECT_COLUMNS)?;
        let records = statement
            .query_map((), Self::row_to_record)?
            .filter_map(|record| record.ok())
            .collect::<Vec<_>>();

        Ok(if records.is_empty() {
            None
        } else {
            Some(records)
        })
    }

    fn update_user(&self, external_id: u64, delta: i64) -> Result<(), anyhow::Error> {
        self.adjust_user(external_id, delta, delta)
    }

    fn adjust_user(
        &self,
        external_id: u64,
        points_delta: i64,
        reviews_delta: i64,
    ) -> Result<(), anyhow::Error> {
        let statement = r#"UPDATE users SET points = points + ?, total_reviews = total_reviews + ? WHERE external_id = ?;"#;
        let changed = self
            .connection
            .execute(statement, (points_delta, reviews_delta, external_id))?;

        Self::expect_one_row(changed, external_id)
    }

    fn mark_submitted(&self, external_id: u64, timestamp: &str) -> Result<(), anyhow::Error> {
        let statement = r#"UPDATE users SET last_submitted = ? WHERE external_id = ?;"#;
        let changed = self
            .connection
            .execute(statement, (timestamp, external_id))?;

        Self::expect_one_row(changed, external_id)
    }
}
