//! Doctor repository backed by SQLite.
//!
//! [`DoctorStore`] is the persistence capability the rest of the system
//! depends on; [`DoctorRepository`] implements it with raw SQL over
//! [`Database`].

use std::sync::Arc;

use rusqlite::types::ToSql;
use rusqlite::{OptionalExtension, Row};
use tracing::debug;

use mediconnect_core::error::MediConnectError;
use mediconnect_core::types::{DirectorySummary, DoctorRecord, NewDoctor, SearchFilter};

use crate::db::{Database, CASEFOLD_FN};

/// Number of distinct specialties/cities reported by [`DoctorStore::summary`].
const SUMMARY_SAMPLE: usize = 10;

const SELECT_COLUMNS: &str =
    "SELECT id, full_name, specialty, city, address, rating, fees, phone FROM doctors";

/// Persistence capability for doctor records.
pub trait DoctorStore: Send + Sync {
    /// Insert a record and return it with its assigned id.
    fn create(&self, fields: &NewDoctor) -> Result<DoctorRecord, MediConnectError>;

    /// Look up a record by id.
    fn find_by_id(&self, id: i64) -> Result<Option<DoctorRecord>, MediConnectError>;

    /// Look up a record by id, failing with `DoctorNotFound` when absent.
    fn get(&self, id: i64) -> Result<DoctorRecord, MediConnectError> {
        self.find_by_id(id)?
            .ok_or(MediConnectError::DoctorNotFound(id))
    }

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<DoctorRecord>, MediConnectError>;

    /// Overwrite every editable field of an existing record.
    fn update(&self, id: i64, fields: &NewDoctor) -> Result<DoctorRecord, MediConnectError>;

    /// Remove a record.
    fn delete(&self, id: i64) -> Result<(), MediConnectError>;

    /// Total number of records.
    fn count(&self) -> Result<u64, MediConnectError>;

    /// Records matching every present filter field, best rated first and
    /// cheaper first among equal ratings. `limit` caps the result size.
    fn filter(
        &self,
        filter: &SearchFilter,
        limit: Option<usize>,
    ) -> Result<Vec<DoctorRecord>, MediConnectError>;

    /// Records whose name, specialty or city contains `query`
    /// (case-insensitive), in insertion order.
    fn search_text(&self, query: &str) -> Result<Vec<DoctorRecord>, MediConnectError>;

    /// Record count plus a sample of distinct specialties and cities.
    fn summary(&self) -> Result<DirectorySummary, MediConnectError>;
}

/// SQLite implementation of [`DoctorStore`].
pub struct DoctorRepository {
    db: Arc<Database>,
}

impl DoctorRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl DoctorStore for DoctorRepository {
    fn create(&self, fields: &NewDoctor) -> Result<DoctorRecord, MediConnectError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO doctors (full_name, specialty, city, address, rating, fees, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    fields.full_name,
                    fields.specialty,
                    fields.city,
                    fields.address,
                    fields.rating,
                    fields.fees,
                    fields.phone,
                ],
            )
            .map_err(|e| MediConnectError::Storage(format!("Failed to create doctor: {}", e)))?;
            let id = conn.last_insert_rowid();
            debug!(id, "Doctor created");
            Ok(DoctorRecord::from_fields(id, fields.clone()))
        })
    }

    fn find_by_id(&self, id: i64) -> Result<Option<DoctorRecord>, MediConnectError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                rusqlite::params![id],
                row_to_doctor,
            )
            .optional()
            .map_err(|e| MediConnectError::Storage(e.to_string()))
        })
    }

    fn list(&self) -> Result<Vec<DoctorRecord>, MediConnectError> {
        self.query_doctors(&format!("{} ORDER BY id ASC", SELECT_COLUMNS), Vec::new())
    }

    fn update(&self, id: i64, fields: &NewDoctor) -> Result<DoctorRecord, MediConnectError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE doctors
                 SET full_name = ?1, specialty = ?2, city = ?3, address = ?4,
                     rating = ?5, fees = ?6, phone = ?7
                 WHERE id = ?8",
                rusqlite::params![
                    fields.full_name,
                    fields.specialty,
                    fields.city,
                    fields.address,
                    fields.rating,
                    fields.fees,
                    fields.phone,
                    id,
                ],
            )
            .map_err(|e| MediConnectError::Storage(format!("Failed to update doctor: {}", e)))
        })?;

        if changed == 0 {
            return Err(MediConnectError::DoctorNotFound(id));
        }
        debug!(id, "Doctor updated");
        Ok(DoctorRecord::from_fields(id, fields.clone()))
    }

    fn delete(&self, id: i64) -> Result<(), MediConnectError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute("DELETE FROM doctors WHERE id = ?1", rusqlite::params![id])
                .map_err(|e| {
                    MediConnectError::Storage(format!("Failed to delete doctor: {}", e))
                })
        })?;

        if changed == 0 {
            return Err(MediConnectError::DoctorNotFound(id));
        }
        debug!(id, "Doctor deleted");
        Ok(())
    }

    fn count(&self) -> Result<u64, MediConnectError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))
                .map_err(|e| MediConnectError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    fn filter(
        &self,
        filter: &SearchFilter,
        limit: Option<usize>,
    ) -> Result<Vec<DoctorRecord>, MediConnectError> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref specialty) = filter.specialty {
            params.push(Box::new(like_pattern(specialty)));
            conditions.push(format!(
                "{}(specialty) LIKE ?{} ESCAPE '\\'",
                CASEFOLD_FN,
                params.len()
            ));
        }
        if let Some(ref city) = filter.city {
            params.push(Box::new(like_pattern(city)));
            conditions.push(format!(
                "{}(city) LIKE ?{} ESCAPE '\\'",
                CASEFOLD_FN,
                params.len()
            ));
        }
        if let Some(max_fees) = filter.max_fees {
            params.push(Box::new(max_fees));
            conditions.push(format!("fees <= ?{}", params.len()));
        }
        if let Some(min_rating) = filter.min_rating {
            params.push(Box::new(min_rating));
            conditions.push(format!("rating >= ?{}", params.len()));
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY rating DESC, fees ASC, id ASC");
        if let Some(limit) = limit {
            params.push(Box::new(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }

        self.query_doctors(&sql, params)
    }

    fn search_text(&self, query: &str) -> Result<Vec<DoctorRecord>, MediConnectError> {
        let sql = format!(
            "{cols} WHERE {fold}(full_name) LIKE ?1 ESCAPE '\\'
                OR {fold}(specialty) LIKE ?1 ESCAPE '\\'
                OR {fold}(city) LIKE ?1 ESCAPE '\\'
             ORDER BY id ASC",
            cols = SELECT_COLUMNS,
            fold = CASEFOLD_FN
        );
        self.query_doctors(&sql, vec![Box::new(like_pattern(query))])
    }

    fn summary(&self) -> Result<DirectorySummary, MediConnectError> {
        let total = self.count()?;
        self.db.with_conn(|conn| {
            let distinct = |column: &str| -> Result<Vec<String>, MediConnectError> {
                let sql = format!(
                    "SELECT {col} FROM doctors WHERE {col} <> ''
                     GROUP BY {col} ORDER BY MIN(id) LIMIT ?1",
                    col = column
                );
                let mut stmt = conn
                    .prepare(&sql)
                    .map_err(|e| MediConnectError::Storage(e.to_string()))?;
                let rows = stmt
                    .query_map(rusqlite::params![SUMMARY_SAMPLE as i64], |row| {
                        row.get::<_, String>(0)
                    })
                    .map_err(|e| MediConnectError::Storage(e.to_string()))?;
                rows.collect::<Result<Vec<String>, _>>()
                    .map_err(|e| MediConnectError::Storage(e.to_string()))
            };

            Ok(DirectorySummary {
                total,
                specialties: distinct("specialty")?,
                cities: distinct("city")?,
            })
        })
    }
}

impl DoctorRepository {
    fn query_doctors(
        &self,
        sql: &str,
        params: Vec<Box<dyn ToSql>>,
    ) -> Result<Vec<DoctorRecord>, MediConnectError> {
        self.db.with_conn(|conn| {
            let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| MediConnectError::Storage(format!("Doctor query prepare: {}", e)))?;

            let rows = stmt
                .query_map(params_refs.as_slice(), row_to_doctor)
                .map_err(|e| MediConnectError::Storage(format!("Doctor query: {}", e)))?;

            let mut doctors = Vec::new();
            for row in rows {
                doctors.push(row.map_err(|e| MediConnectError::Storage(e.to_string()))?);
            }
            Ok(doctors)
        })
    }
}

/// Build a lowercased `%term%` LIKE pattern with `\`, `%` and `_` escaped.
/// Compared against `casefold(column)`.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn row_to_doctor(row: &Row<'_>) -> rusqlite::Result<DoctorRecord> {
    Ok(DoctorRecord {
        id: row.get(0)?,
        full_name: row.get(1)?,
        specialty: row.get(2)?,
        city: row.get(3)?,
        address: row.get(4)?,
        rating: row.get(5)?,
        fees: row.get(6)?,
        phone: row.get(7)?,
    })
}
