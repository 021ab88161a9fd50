use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Check intervals (seconds) a site may be configured with
pub const ALLOWED_FREQUENCIES: [u64; 4] = [30, 60, 90, 120];

/// One monitored endpoint and the outcome of its latest probe.
///
/// Serialized field names match the on-disk document: `id`, `url`,
/// `frequency`, `isSuccess`, `isActive` and an optional `lastPingedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: Uuid,
    pub url: String,
    /// Seconds between scheduled probes
    pub frequency: u64,
    pub is_success: bool,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pinged_at: Option<DateTime<Utc>>,
}

/// Display status of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Paused,
    Unknown,
    Up,
    Down,
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteStatus::Paused => write!(f, "paused"),
            SiteStatus::Unknown => write!(f, "unknown"),
            SiteStatus::Up => write!(f, "up"),
            SiteStatus::Down => write!(f, "down"),
        }
    }
}

impl Site {
    /// Create an active, never-probed site with a fresh id.
    ///
    /// No validation happens here; callers going through the coordinator get
    /// a normalized URL, anything else is probed as-is.
    pub fn new(url: impl Into<String>, frequency: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            frequency,
            is_success: false,
            is_active: true,
            last_pinged_at: None,
        }
    }

    /// Copy of this site carrying a probe outcome
    pub fn with_probe_result(&self, is_success: bool, at: DateTime<Utc>) -> Self {
        Self { is_success, last_pinged_at: Some(at), ..self.clone() }
    }

    pub fn status(&self) -> SiteStatus {
        if !self.is_active {
            SiteStatus::Paused
        } else if self.last_pinged_at.is_none() {
            SiteStatus::Unknown
        } else if self.is_success {
            SiteStatus::Up
        } else {
            SiteStatus::Down
        }
    }

    /// Whether a scheduled probe is owed at `now`.
    ///
    /// Frequencies below the shortest allowed one (hand-edited documents)
    /// are treated as that one.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }

        let every = i64::try_from(self.frequency.max(ALLOWED_FREQUENCIES[0])).unwrap_or(i64::MAX);
        match self.last_pinged_at {
            None => true,
            Some(last) => (now - last).num_seconds() >= every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_site_defaults() {
        let site = Site::new("https://example.com", 30);
        assert!(!site.is_success);
        assert!(site.is_active);
        assert!(site.last_pinged_at.is_none());
        assert_eq!(site.status(), SiteStatus::Unknown);
    }

    #[test]
    fn test_status_view() {
        let now = Utc::now();
        let mut site = Site::new("https://example.com", 30).with_probe_result(true, now);
        assert_eq!(site.status(), SiteStatus::Up);

        site.is_success = false;
        assert_eq!(site.status(), SiteStatus::Down);

        site.is_active = false;
        assert_eq!(site.status(), SiteStatus::Paused);
        assert_eq!(site.status().to_string(), "paused");
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let fresh = Site::new("https://example.com", 60);
        assert!(fresh.is_due(now));

        let pinged = fresh.with_probe_result(true, now - Duration::seconds(30));
        assert!(!pinged.is_due(now));
        assert!(pinged.is_due(now + Duration::seconds(30)));

        let mut paused = fresh.clone();
        paused.is_active = false;
        assert!(!paused.is_due(now));
    }

    #[test]
    fn test_out_of_range_frequency_is_not_always_due() {
        let now = Utc::now();
        let last = now - Duration::seconds(10);

        let mut huge = Site::new("https://example.com", 30).with_probe_result(true, last);
        huge.frequency = u64::MAX;
        assert!(!huge.is_due(now));

        let mut zero = huge.clone();
        zero.frequency = 0;
        assert!(!zero.is_due(now));
        assert!(zero.is_due(now + Duration::seconds(20)));
    }

    #[test]
    fn test_document_field_names() {
        let site = Site::new("https://example.com", 90);
        let json = serde_json::to_value(&site).unwrap();

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 5);
        assert_eq!(json["url"], "https://example.com");
        assert_eq!(json["frequency"], 90);
        assert_eq!(json["isSuccess"], false);
        assert_eq!(json["isActive"], true);
        assert!(object.get("lastPingedAt").is_none());
    }

    #[test]
    fn test_document_accepts_null_timestamp() {
        let raw = r#"{
            "id": "8f2d5a9e-4c1b-4f7e-9a3d-2b6c8e1f0a57",
            "url": "https://example.com",
            "frequency": 30,
            "isSuccess": true,
            "isActive": false,
            "lastPingedAt": null
        }"#;

        let site: Site = serde_json::from_str(raw).unwrap();
        assert!(site.is_success);
        assert!(!site.is_active);
        assert!(site.last_pinged_at.is_none());
    }
}
