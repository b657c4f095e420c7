//! Payloads returned by twitch.
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Answer of `GET https://id.twitch.tv/oauth2/validate`
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatedToken {
    pub client_id: String,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Seconds until the token expires.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// A user as returned by `GET /helix/users`
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub broadcaster_type: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One element of `GET /helix/hypetrain/status`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HypeTrainStatus {
    #[serde(default)]
    pub current: Option<HypeTrain>,
    #[serde(default)]
    pub all_time_high: Option<HypeTrainRecord>,
    #[serde(default)]
    pub shared_all_time_high: Option<HypeTrainRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HypeTrain {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub broadcaster_user_id: String,
    #[serde(default)]
    pub broadcaster_user_login: String,
    #[serde(default)]
    pub broadcaster_user_name: String,
    pub level: u32,
    pub total: u64,
    pub progress: u64,
    pub goal: u64,
    #[serde(default)]
    pub top_contributions: Vec<Contribution>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "type")]
    pub kind: Option<HypeTrainKind>,
    #[serde(default)]
    pub is_shared_train: bool,
}

impl HypeTrain {
    /// A train is running while its expiry lies in the future.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypeTrainKind {
    Regular,
    Treasure,
    GoldenKappa,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contribution {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_login: String,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: ContributionKind,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    Bits,
    Subscription,
    #[serde(other)]
    Other,
}

/// Best train ever reached, by the channel alone or as part of a shared train.
#[derive(Debug, Clone, Deserialize)]
pub struct HypeTrainRecord {
    pub level: u32,
    pub total: u64,
    #[serde(default)]
    pub achieved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helix::HelixResponse;

    const STATUS: &str = r#"{
      "data": [
        {
          "current": {
            "id": "1b0AsbInCHZW2SQFQkCzqN07Ib2",
            "broadcaster_user_id": "1337",
            "broadcaster_user_login": "cool_user",
            "broadcaster_user_name": "Cool_User",
            "level": 2,
            "total": 700,
            "progress": 200,
            "goal": 1000,
            "top_contributions": [
              { "user_id": "123", "user_login": "pogchamp", "user_name": "PogChamp", "type": "bits", "total": 50 },
              { "user_id": "456", "user_login": "kappa", "user_name": "Kappa", "type": "subscription", "total": 45 }
            ],
            "shared_train_participants": null,
            "started_at": "2020-07-15T17:16:03.17106713Z",
            "expires_at": "2020-07-15T17:16:11.17106713Z",
            "type": "golden_kappa",
            "is_shared_train": false
          },
          "all_time_high": { "level": 6, "total": 2850, "achieved_at": "2020-04-24T20:12:21.003802269Z" },
          "shared_all_time_high": null
        }
      ]
    }"#;

    #[test]
    fn decodes_status() {
        let response: HelixResponse<HypeTrainStatus> = serde_json::from_str(STATUS).unwrap();
        let status = &response.data[0];
        let current = status.current.as_ref().unwrap();
        assert_eq!(current.level, 2);
        assert_eq!(current.kind, Some(HypeTrainKind::GoldenKappa));
        assert_eq!(current.top_contributions[1].kind, ContributionKind::Subscription);
        assert_eq!(status.all_time_high.as_ref().unwrap().total, 2850);
        assert!(status.shared_all_time_high.is_none());
    }

    #[test]
    fn activity_follows_expiry() {
        let response: HelixResponse<HypeTrainStatus> = serde_json::from_str(STATUS).unwrap();
        let current = response.data[0].current.clone().unwrap();
        let before: DateTime<Utc> = "2020-07-15T17:16:05Z".parse().unwrap();
        let after: DateTime<Utc> = "2020-07-15T17:17:00Z".parse().unwrap();
        assert!(current.is_active(before));
        assert!(!current.is_active(after));
        let no_expiry = HypeTrain {
            expires_at: None,
            ..current
        };
        assert!(!no_expiry.is_active(before));
    }

    #[test]
    fn unknown_contribution_kind() {
        let contribution: Contribution =
            serde_json::from_str(r#"{"user_name":"x","type":"other","total":1}"#).unwrap();
        assert_eq!(contribution.kind, ContributionKind::Other);
    }
}
