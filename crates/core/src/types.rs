/// Surrogate keys for auxiliary tables are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Inspections are addressed by UUID so guest links are not guessable.
pub type InspectionId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
