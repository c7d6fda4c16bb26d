// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/thermowatch

//! Index of stored surveillance captures

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// One capture; `image_link` is the file name inside the image directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveillanceImage {
    pub id: i64,
    pub host: String,
    pub timestamp: String,
    pub image_link: String,
}

impl SurveillanceImage {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            host: row.get(1)?,
            timestamp: row.get(2)?,
            image_link: row.get(3)?,
        })
    }
}

pub struct SurveillanceIndex<'a> {
    conn: &'a Connection,
}

impl<'a> SurveillanceIndex<'a> {
    pub(super) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Record a capture. Returns false when the link is already indexed.
    pub fn insert(&self, host: &str, timestamp: &str, image_link: &str) -> Result<bool> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO Surveillance(host, timestamp, imageLink) VALUES (?1, ?2, ?3)",
            params![host, timestamp, image_link],
        )?;
        Ok(n > 0)
    }

    pub fn find(&self, image_link: &str) -> Result<Option<SurveillanceImage>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, host, timestamp, imageLink FROM Surveillance WHERE imageLink = ?1",
                params![image_link],
                SurveillanceImage::from_row,
            )
            .optional()?)
    }

    /// Hosts with at least one indexed capture
    pub fn hosts(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT host FROM Surveillance ORDER BY host")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Calendar days with captures for `host`, strictly before `today`
    pub fn dates_before(&self, host: &str, today: NaiveDate) -> Result<Vec<NaiveDate>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT DATE(timestamp) FROM Surveillance \
             WHERE host = ?1 AND DATE(timestamp) IS NOT NULL AND DATE(timestamp) < ?2 ORDER BY 1",
        )?;
        let rows = stmt.query_map(params![host, today.format("%Y-%m-%d").to_string()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut results = Vec::new();
        for row in rows {
            let day = row?;
            match NaiveDate::parse_from_str(&day, "%Y-%m-%d") {
                Ok(date) => results.push(date),
                Err(e) => warn!(host, day = %day, "unreadable capture date: {}", e),
            }
        }
        Ok(results)
    }

    /// Captures of one host on one day, oldest first
    pub fn images_for(&self, host: &str, date: NaiveDate) -> Result<Vec<SurveillanceImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, host, timestamp, imageLink FROM Surveillance \
             WHERE host = ?1 AND DATE(timestamp) = ?2 ORDER BY timestamp, id",
        )?;
        let rows = stmt.query_map(
            params![host, date.format("%Y-%m-%d").to_string()],
            SurveillanceImage::from_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Remove the given rows in one transaction
    pub fn delete(&self, images: &[SurveillanceImage]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        for image in images {
            count += tx.execute("DELETE FROM Surveillance WHERE id = ?1", params![image.id])?;
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Surveillance", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Catalog;
    use chrono::NaiveDate;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_insert_is_unique_by_link() {
        let catalog = Catalog::open_in_memory().unwrap();
        let index = catalog.surveillance();

        assert!(index.insert("cam", "2024-01-01 10:00:00.000000", "a.jpeg").unwrap());
        assert!(!index.insert("cam", "2024-01-01 10:00:00.000000", "a.jpeg").unwrap());
        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.find("a.jpeg").unwrap().unwrap().host, "cam");
    }

    #[test]
    fn test_dates_grouped_per_host_before_today() {
        let catalog = Catalog::open_in_memory().unwrap();
        let index = catalog.surveillance();
        index.insert("cam1", "2024-01-01 10:00:00.5", "1.jpeg").unwrap();
        index.insert("cam1", "2024-01-01 11:00:00.5", "2.jpeg").unwrap();
        index.insert("cam1", "2024-01-02 09:00:00", "3.jpeg").unwrap();
        index.insert("cam1", "2024-01-03 09:00:00", "4.jpeg").unwrap();
        index.insert("cam2", "2023-12-31 23:59:59", "5.jpeg").unwrap();
        index.insert("cam2", "garbage", "6.jpeg").unwrap();

        assert_eq!(index.hosts().unwrap(), vec!["cam1".to_string(), "cam2".to_string()]);
        assert_eq!(
            index.dates_before("cam1", day("2024-01-03")).unwrap(),
            vec![day("2024-01-01"), day("2024-01-02")]
        );
        assert_eq!(index.dates_before("cam2", day("2024-01-03")).unwrap(), vec![day("2023-12-31")]);
    }

    #[test]
    fn test_images_for_day_in_order_and_delete() {
        let catalog = Catalog::open_in_memory().unwrap();
        let index = catalog.surveillance();
        index.insert("cam", "2024-01-01 12:00:00", "late.jpeg").unwrap();
        index.insert("cam", "2024-01-01 08:00:00", "early.jpeg").unwrap();
        index.insert("cam", "2024-01-02 08:00:00", "next.jpeg").unwrap();
        index.insert("other", "2024-01-01 08:00:00", "other.jpeg").unwrap();

        let images = index.images_for("cam", day("2024-01-01")).unwrap();
        let links: Vec<_> = images.iter().map(|i| i.image_link.as_str()).collect();
        assert_eq!(links, vec!["early.jpeg", "late.jpeg"]);

        assert_eq!(index.delete(&images).unwrap(), 2);
        assert_eq!(index.count().unwrap(), 2);
        assert!(index.images_for("cam", day("2024-01-01")).unwrap().is_empty());
    }
}
