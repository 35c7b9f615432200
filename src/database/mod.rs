use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, Row, Sqlite, SqlitePool, migrate::MigrateDatabase};
use tracing::info;

use crate::models::Listing;

const LISTING_COLUMNS: &str = "id, title, price, size, rooms, floor, rent, building_type, \
     has_elevator, parking, street, district, city, description, url, source, images, \
     listed_at, discovered_at";

pub struct Database {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct ListingRow {
    id: String,
    title: String,
    price: Option<f64>,
    size: Option<f64>,
    rooms: Option<u32>,
    floor: Option<i32>,
    rent: Option<f64>,
    building_type: Option<String>,
    has_elevator: Option<bool>,
    parking: Option<String>,
    street: Option<String>,
    district: Option<String>,
    city: String,
    description: String,
    url: String,
    source: String,
    images: String,
    listed_at: Option<NaiveDateTime>,
    discovered_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = anyhow::Error;

    fn try_from(row: ListingRow) -> Result<Self> {
        let images = serde_json::from_str(&row.images)
            .with_context(|| format!("Invalid images column for listing {}", row.id))?;

        Ok(Self {
            id: row.id,
            title: row.title,
            price: row.price,
            size: row.size,
            rooms: row.rooms,
            floor: row.floor,
            rent: row.rent,
            building_type: row.building_type,
            has_elevator: row.has_elevator,
            parking: row.parking,
            street: row.street,
            district: row.district,
            city: row.city,
            description: row.description,
            url: row.url,
            source: row.source,
            images,
            listed_at: row.listed_at,
            discovered_at: row.discovered_at,
        })
    }
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Create database file if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            if let Some(parent) = database_file(db_url).and_then(Path::parent)
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            info!("Creating database file");
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePool::connect(db_url).await?;
        Self::migrate(pool).await
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("Database initialized successfully");
        Ok(Self { pool })
    }

    pub async fn get_existing_listing_ids(&self) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT id FROM listings")
            .fetch_all(&self.pool)
            .await?;

        let ids = rows
            .into_iter()
            .map(|row| row.get::<String, _>("id"))
            .collect();

        Ok(ids)
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<Listing>> {
        let query = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE url = ?");
        let row: Option<ListingRow> = sqlx::query_as(&query)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Listing::try_from).transpose()
    }

    pub async fn get_listing(&self, id: &str) -> Result<Option<Listing>> {
        let query = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?");
        let row: Option<ListingRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Listing::try_from).transpose()
    }

    /// Stored listings no digest has been delivered for yet, oldest first.
    pub async fn get_unnotified_listings(&self) -> Result<Vec<Listing>> {
        let query = format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE notified_at IS NULL ORDER BY discovered_at"
        );
        let rows: Vec<ListingRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    pub async fn mark_notified(&self, ids: &[String], notified_at: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for id in ids {
            sqlx::query("UPDATE listings SET notified_at = ? WHERE id = ?")
                .bind(notified_at)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Inserts a listing. It stays pending until [`Database::mark_notified`].
    pub async fn save_listing(&self, listing: &Listing) -> Result<()> {
        let images = serde_json::to_string(&listing.images)?;

        sqlx::query(
            r"
            INSERT INTO listings (id, title, price, size, rooms, floor, rent, building_type,
                has_elevator, parking, street, district, city, description, url, source,
                images, listed_at, discovered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&listing.id)
        .bind(&listing.title)
        .bind(listing.price)
        .bind(listing.size)
        .bind(listing.rooms)
        .bind(listing.floor)
        .bind(listing.rent)
        .bind(&listing.building_type)
        .bind(listing.has_elevator)
        .bind(&listing.parking)
        .bind(&listing.street)
        .bind(&listing.district)
        .bind(&listing.city)
        .bind(&listing.description)
        .bind(&listing.url)
        .bind(&listing.source)
        .bind(images)
        .bind(listing.listed_at)
        .bind(listing.discovered_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrites a stored listing. Returns `false` if no listing has its id.
    pub async fn update_listing(&self, listing: &Listing) -> Result<bool> {
        let images = serde_json::to_string(&listing.images)?;

        let result = sqlx::query(
            r"
            UPDATE listings
            SET title = ?, price = ?, size = ?, rooms = ?, floor = ?, rent = ?,
                building_type = ?, has_elevator = ?, parking = ?, street = ?, district = ?,
                city = ?, description = ?, url = ?, source = ?, images = ?, listed_at = ?
            WHERE id = ?
            ",
        )
        .bind(&listing.title)
        .bind(listing.price)
        .bind(listing.size)
        .bind(listing.rooms)
        .bind(listing.floor)
        .bind(listing.rent)
        .bind(&listing.building_type)
        .bind(listing.has_elevator)
        .bind(&listing.parking)
        .bind(&listing.street)
        .bind(&listing.district)
        .bind(&listing.city)
        .bind(&listing.description)
        .bind(&listing.url)
        .bind(&listing.source)
        .bind(images)
        .bind(listing.listed_at)
        .bind(&listing.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` if no listing has this id.
    pub async fn delete_listing(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Waits for in-flight queries and closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connections closed");
    }
}

/// Filesystem path of a `sqlite:` URL, if it names a file.
fn database_file(db_url: &str) -> Option<&Path> {
    let path = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next()?;
    (!path.is_empty() && path != ":memory:").then(|| Path::new(path))
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}
