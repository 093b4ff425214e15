/// Photos are identified by a random UUID assigned at upload time.
pub type PhotoId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
