//! Read-through cache of default diagram marks.

use std::collections::HashMap;

use cartcheck_core::diagram::{normalize_diagram_name, Point};
use cartcheck_core::property::is_catalog_diagram;
use cartcheck_db::repositories::DiagramMarkRepo;
use cartcheck_db::DbPool;
use tokio::sync::RwLock;

use crate::error::AppResult;

/// Default marks keyed by normalised diagram name.
///
/// Only names backed by a stored row or a catalog diagram are cached, so
/// lookups of arbitrary names do not grow the map. A catalog diagram
/// without a row is cached as an empty list.
#[derive(Default)]
pub struct DiagramMarkCache {
    entries: RwLock<HashMap<String, Vec<Point>>>,
}

impl DiagramMarkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default marks for a diagram, loading them on a miss.
    pub async fn get(&self, pool: &DbPool, diagram_name: &str) -> AppResult<Vec<Point>> {
        let name = normalize_diagram_name(diagram_name);
        if let Some(points) = self.entries.read().await.get(name) {
            return Ok(points.clone());
        }

        let points = match DiagramMarkRepo::find_by_name(pool, name).await? {
            Some(row) => row.parsed_points()?,
            None if is_catalog_diagram(name) => Vec::new(),
            None => return Ok(Vec::new()),
        };
        tracing::debug!(diagram_name = name, count = points.len(), "Loaded default diagram marks");
        self.entries
            .write()
            .await
            .insert(name.to_string(), points.clone());
        Ok(points)
    }

    /// Replace the cached marks after a write.
    pub async fn put(&self, diagram_name: &str, points: Vec<Point>) {
        self.entries
            .write()
            .await
            .insert(normalize_diagram_name(diagram_name).to_string(), points);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn cached(&self, diagram_name: &str) -> Option<Vec<Point>> {
        self.entries
            .read()
            .await
            .get(normalize_diagram_name(diagram_name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartcheck_core::diagram::DamageKind;

    #[tokio::test]
    async fn put_is_keyed_by_normalised_name() {
        let cache = DiagramMarkCache::new();
        let points = vec![Point::marker(10.0, 10.0, DamageKind::Scratches)];

        cache.put("rental_150.jpg", points.clone()).await;

        assert_eq!(cache.cached("rental_150").await, Some(points.clone()));
        assert_eq!(cache.cached("rental_150.jpg").await, Some(points));
        assert_eq!(cache.cached("rental_144").await, None);
    }
}
