use serde::{Deserialize, Serialize};

/// Per-field confidence reported by the vision service, 0.0..=1.0.
///
/// Fields the service does not score default to 0.0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfidence {
    pub title: f32,
    pub date: f32,
    pub time: f32,
    pub location: f32,
    pub description: f32,
}

/// A proposed calendar event extracted from one uploaded image.
///
/// Transient: candidates exist only between extraction and the admin's
/// accept/reject decision. Accepted candidates become event rows;
/// rejected ones are simply dropped. Field values are the raw strings
/// the vision service reported, left for the admin to correct before
/// confirming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionCandidate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub confidence: FieldConfidence,
}
