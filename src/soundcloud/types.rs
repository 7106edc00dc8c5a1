use chrono::{DateTime, Datelike, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Opaque remote identifier. The API emits numbers, but older payloads and
/// URNs carry strings, so both are accepted and kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteId(pub String);

impl std::fmt::Display for RemoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Num(u64),
            Str(String),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Num(n) => RemoteId(n.to_string()),
            RawId::Str(s) => RemoteId(s),
        })
    }
}

/// Treat an explicit `null` like a missing field. `#[serde(default)]` alone
/// only covers absence.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Track {
    pub id: RemoteId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: User,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
}

impl Track {
    /// A track is synced only if it is a real track with something to stream.
    pub fn is_eligible(&self) -> bool {
        self.kind == "track" && self.stream_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Artwork locator at the standardized 500x500 size, falling back to the
    /// owner's avatar.
    pub fn artwork_locator(&self) -> Option<String> {
        self.artwork_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.user.avatar_url.as_deref().filter(|u| !u.is_empty()))
            .map(|u| u.replace("-large", "-t500x500"))
    }

    /// Explicit release year if present, else the year the track was created.
    pub fn year(&self) -> Option<i32> {
        if let Some(year) = self.release_year.filter(|y| *y > 0) {
            return Some(year);
        }
        self.created_at.as_deref().and_then(parse_created_year)
    }

    /// Owner's display name, falling back to the username.
    pub fn album(&self) -> &str {
        self.user
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.user.username)
    }
}

/// Accepts both the legacy `2013/03/23 14:58:27 +0000` format and RFC 3339.
fn parse_created_year(s: &str) -> Option<i32> {
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S %z") {
        return Some(dt.year());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.year());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.year());
    }
    s.get(..4).and_then(|y| y.parse().ok())
}

#[derive(Debug, Deserialize)]
pub struct Me {
    pub id: RemoteId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
}

/// One page of a `linked_partitioning` listing.
#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default, deserialize_with = "null_as_default")]
    pub collection: Vec<Value>,
    #[serde(default)]
    pub next_href: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Playlist {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracks: Vec<Value>,
}

/// Bearer token from the OAuth exchange.
#[derive(Clone)]
pub struct AccessToken(pub(crate) String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
}

#[cfg(test)]
pub(crate) fn track_fixture(id: &str, title: &str) -> Track {
    Track {
        id: RemoteId(id.to_string()),
        kind: "track".to_string(),
        title: title.to_string(),
        user: User {
            username: "uploader".to_string(),
            full_name: None,
            avatar_url: None,
        },
        genre: None,
        created_at: Some("2014/05/06 10:00:00 +0000".to_string()),
        release_year: None,
        stream_url: Some(format!("https://api.example.com/tracks/{}/stream", id)),
        artwork_url: None,
    }
}
