//! Repository for the `diagram_marks` table.

use sqlx::PgPool;

use crate::models::diagram_mark::DiagramMark;

/// Column list for diagram_marks queries.
const COLUMNS: &str = "id, diagram_name, points, created_at, updated_at";

/// Provides read and upsert operations for default diagram marks.
pub struct DiagramMarkRepo;

impl DiagramMarkRepo {
    /// Find the marks stored for a (normalised) diagram name.
    pub async fn find_by_name(
        pool: &PgPool,
        diagram_name: &str,
    ) -> Result<Option<DiagramMark>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM diagram_marks WHERE diagram_name = $1");
        sqlx::query_as::<_, DiagramMark>(&query)
            .bind(diagram_name)
            .fetch_optional(pool)
            .await
    }

    /// List every diagram that has stored marks, by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<DiagramMark>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM diagram_marks ORDER BY diagram_name ASC");
        sqlx::query_as::<_, DiagramMark>(&query).fetch_all(pool).await
    }

    /// Insert or replace the marks for a diagram.
    ///
    /// Returns the stored row and whether it was newly created.
    pub async fn upsert(
        pool: &PgPool,
        diagram_name: &str,
        points: &serde_json::Value,
    ) -> Result<(DiagramMark, bool), sqlx::Error> {
        let query = format!(
            "INSERT INTO diagram_marks (diagram_name, points)
             VALUES ($1, $2)
             ON CONFLICT (diagram_name) DO UPDATE SET points = EXCLUDED.points
             RETURNING {COLUMNS}, (xmax = 0) AS inserted"
        );
        let row: DiagramMarkWithFlag = sqlx::query_as(&query)
            .bind(diagram_name)
            .bind(points)
            .fetch_one(pool)
            .await?;
        Ok((row.mark, row.inserted))
    }
}

#[derive(sqlx::FromRow)]
struct DiagramMarkWithFlag {
    #[sqlx(flatten)]
    mark: DiagramMark,
    inserted: bool,
}
