use chrono::{DateTime, Utc};
use td_data::ResolvedSample;

/// What the detail popup shows for a position
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    /// Sample time as HH:MM:SS (UTC)
    pub title: String,
    pub index: f64,
    pub timestamp: i64,
    pub interpolated: bool,
    /// Telemetry channels sorted by name
    pub fields: Vec<(String, f64)>,
}

impl From<&ResolvedSample> for PopupContent {
    fn from(sample: &ResolvedSample) -> Self {
        let title = DateTime::<Utc>::from_timestamp_millis(sample.timestamp())
            .map(|time| time.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| format!("#{:.0}", sample.index()));

        let mut fields: Vec<(String, f64)> = sample
            .fields()
            .iter()
            .map(|(name, &value)| (name.clone(), value))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            title,
            index: sample.index(),
            timestamp: sample.timestamp(),
            interpolated: sample.is_interpolated(),
            fields,
        }
    }
}
