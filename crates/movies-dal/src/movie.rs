use crate::{ChosenRow, Error, ListingParams, error::Result, genre::Genre};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row as _};
use tracing::debug;

const MOVIE_COLUMNS: &str = "m.id AS id, m.name AS name, m.year AS year, m.rate AS rate, m.story_line AS story_line, m.poster AS poster, m.genre_id AS genre_id";
const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "year", "rate", "genre_id"];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub rate: f64,
    pub story_line: String,
    #[serde(with = "crate::poster_bytes")]
    pub poster: Vec<u8>,
    pub genre_id: i64,
    /// Only resolved when read with [`Relation::Genre`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<Genre>,
}

impl sqlx::FromRow<'_, ChosenRow> for Movie {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let genre_id: i64 = row.try_get("genre_id")?;
        let genre = match row.try_get::<String, _>("genre_name") {
            Ok(name) => Some(Genre { id: genre_id, name }),
            Err(sqlx::Error::ColumnNotFound(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(Movie {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            rate: row.try_get("rate")?,
            story_line: row.try_get("story_line")?,
            poster: row.try_get("poster")?,
            genre_id,
            genre,
        })
    }
}

/// Related entities which can be loaded together with a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Genre,
}

#[derive(Debug, Clone)]
pub struct CreateMovie {
    pub name: String,
    pub year: i64,
    pub rate: f64,
    pub story_line: String,
    pub poster: Vec<u8>,
    pub genre_id: i64,
}

#[derive(Debug, Clone)]
pub struct UpdateMovie {
    pub name: String,
    pub year: i64,
    pub rate: f64,
    pub story_line: String,
    /// `None` keeps the stored poster
    pub poster: Option<Vec<u8>>,
    pub genre_id: i64,
}

pub type MovieRepository = MovieRepositoryImpl<Pool<crate::ChosenDB>>;

pub struct MovieRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> MovieRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = crate::ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateMovie) -> Result<Movie> {
        let result = sqlx::query(
            "INSERT INTO movie (name, year, rate, story_line, poster, genre_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(payload.rate)
        .bind(&payload.story_line)
        .bind(&payload.poster)
        .bind(payload.genre_id)
        .execute(&self.executor)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Created movie {id}");
        self.get(id).await
    }

    pub async fn update(&self, id: i64, payload: UpdateMovie) -> Result<Movie> {
        let result = sqlx::query(
            "UPDATE movie SET name = ?, year = ?, rate = ?, story_line = ?, genre_id = ?, poster = COALESCE(?, poster) WHERE id = ?",
        )
        .bind(&payload.name)
        .bind(payload.year)
        .bind(payload.rate)
        .bind(&payload.story_line)
        .bind(payload.genre_id)
        .bind(&payload.poster)
        .bind(id)
        .execute(&self.executor)
        .await?;

        if result.rows_affected() == 0 {
            Err(Error::RecordNotFound("Movie".to_string()))
        } else {
            self.get(id).await
        }
    }

    pub async fn list(&self, params: ListingParams) -> Result<Vec<Movie>> {
        let order = params.ordering(VALID_ORDER_FIELDS)?;
        let order = if order.is_empty() {
            String::new()
        } else {
            format!("ORDER BY {order}")
        };
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movie m {order}");
        let records = sqlx::query_as::<_, Movie>(&sql)
            .fetch_all(&self.executor)
            .await?;
        Ok(records)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM movie WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;

        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Movie".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn get(&self, id: i64) -> Result<Movie> {
        self.get_with(id, &[]).await
    }

    /// Loads movie and requested relations, missing movie (or its related rows) is
    /// reported as [`Error::RecordNotFound`]
    pub async fn get_with(&self, id: i64, relations: &[Relation]) -> Result<Movie> {
        let sql = if relations.contains(&Relation::Genre) {
            format!(
                "SELECT {MOVIE_COLUMNS}, g.name AS genre_name FROM movie m JOIN genre g ON m.genre_id = g.id WHERE m.id = ?"
            )
        } else {
            format!("SELECT {MOVIE_COLUMNS} FROM movie m WHERE m.id = ?")
        };
        sqlx::query_as::<_, Movie>(&sql)
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Movie".to_string()))
    }

    pub async fn poster(&self, id: i64) -> Result<Vec<u8>> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT poster FROM movie WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?
            .ok_or_else(|| Error::RecordNotFound("Movie poster".to_string()))
    }
}
