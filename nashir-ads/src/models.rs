//! Row types for the ad server
//!
//! Campaigns and creatives live in the shared database but no other
//! service reads them, so the types stay local to this crate.

use serde::{Deserialize, Serialize};

/// An advertising campaign; creatives hang off it
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdCampaign {
    pub guid: String,
    pub name: String,
    pub advertiser: String,
    /// RFC 3339, normalized to UTC; NULL means no lower bound
    pub starts_at: Option<String>,
    /// RFC 3339, normalized to UTC; NULL means no upper bound
    pub ends_at: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One deliverable ad unit targeting a slot and device class
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdCreative {
    pub guid: String,
    pub campaign_id: String,
    pub slot: String,
    pub device: String,
    pub title: String,
    pub media_url: String,
    pub destination_url: String,
    pub weight: i64,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl AdCreative {
    /// True when this creative serves to the given device class
    pub fn matches_device(&self, device: &str) -> bool {
        self.device == "any" || self.device == device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creative(device: &str) -> AdCreative {
        AdCreative {
            guid: "g".into(),
            campaign_id: "c".into(),
            slot: "sidebar".into(),
            device: device.into(),
            title: "t".into(),
            media_url: "https://cdn.example/a.png".into(),
            destination_url: "https://example.com".into(),
            weight: 1,
            active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn any_matches_every_device() {
        assert!(creative("any").matches_device("mobile"));
        assert!(creative("any").matches_device("desktop"));
    }

    #[test]
    fn specific_device_matches_itself_only() {
        assert!(creative("mobile").matches_device("mobile"));
        assert!(!creative("mobile").matches_device("desktop"));
    }
}
