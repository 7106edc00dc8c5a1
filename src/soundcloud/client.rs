use std::path::Path;

use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::error::CatalogError;
use super::types::{AccessToken, Me, Page, Playlist, RemoteId, TokenResponse, Track};
use super::{Catalog, CatalogConfig};

/// HTTP client for the SoundCloud API.
///
/// One `reqwest::Client` is shared by every call. API calls are bounded end
/// to end by the configured timeout; downloads are bounded per read, so a
/// long mix on a slow link still completes while a stalled one fails.
pub struct SoundCloudClient {
    http: Client,
    config: CatalogConfig,
}

impl std::fmt::Debug for SoundCloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundCloudClient")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

impl SoundCloudClient {
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        let http = Client::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .build()
            .map_err(CatalogError::transport("client setup"))?;
        Ok(Self { http, config })
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, CatalogError> {
        let response = request
            .send()
            .await
            .map_err(CatalogError::transport(operation))?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus {
                operation,
                status: response.status().as_u16(),
                url: redact_query(response.url()),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, CatalogError> {
        let body = self
            .send(operation, request.timeout(self.config.timeout))
            .await?
            .bytes()
            .await
            .map_err(CatalogError::transport(operation))?;
        serde_json::from_slice(&body).map_err(|source| CatalogError::Decode { operation, source })
    }

    /// Follow `next_href` cursors until the server stops returning one,
    /// concatenating every page's collection in the order served.
    ///
    /// Only the first request carries `client_id` and `linked_partitioning`;
    /// cursor URLs already embed them.
    pub(crate) async fn paginate(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<Vec<Value>, CatalogError> {
        let mut items: Vec<Value> = Vec::new();
        let mut request = self.http.get(url).query(&[
            ("client_id", self.config.client_id.as_str()),
            ("linked_partitioning", "true"),
        ]);
        let mut pages = 0usize;

        loop {
            let body: Value = self.get_json(operation, request).await?;
            pages += 1;

            // Endpoints that ignore linked_partitioning answer with a bare array.
            let page = match body {
                Value::Array(collection) => Page {
                    collection,
                    next_href: None,
                },
                other => serde_json::from_value::<Page>(other)
                    .map_err(|source| CatalogError::Decode { operation, source })?,
            };

            tracing::debug!(
                operation,
                page = pages,
                items = page.collection.len(),
                "fetched page"
            );
            items.extend(page.collection);

            match page.next_href.filter(|href| !href.is_empty()) {
                Some(next) => request = self.http.get(next),
                None => break,
            }
        }

        Ok(items)
    }

    async fn me(&self, token: &AccessToken) -> Result<Me, CatalogError> {
        let request = self
            .http
            .get(format!("{}/me", self.config.api_url))
            .query(&[("oauth_token", token.as_str())]);
        self.get_json("identity lookup", request).await
    }

    async fn favorites(&self, user: &RemoteId) -> Result<Vec<Value>, CatalogError> {
        let url = format!("{}/users/{}/favorites", self.config.api_url, user);
        self.paginate("favorites", &url).await
    }

    async fn playlists(&self, user: &RemoteId) -> Result<Vec<Playlist>, CatalogError> {
        let url = format!("{}/users/{}/playlists", self.config.api_url, user);
        let raw = self.paginate("playlists", &url).await?;
        raw.into_iter()
            .map(|p| {
                serde_json::from_value(p).map_err(|source| CatalogError::Decode {
                    operation: "playlists",
                    source,
                })
            })
            .collect()
    }

    /// Stream a response body to `dest` chunk by chunk. A partially written
    /// file is left for the caller's cleanup guard.
    async fn stream_to_file(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        dest: &Path,
    ) -> Result<u64, CatalogError> {
        let response = self.send(operation, request).await?;
        let disk_err = |source| CatalogError::Disk {
            path: dest.display().to_string(),
            source,
        };

        let mut file = File::create(dest).await.map_err(disk_err)?;
        let mut bytes_written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CatalogError::transport(operation))?;
            file.write_all(&chunk).await.map_err(disk_err)?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await.map_err(disk_err)?;
        Ok(bytes_written)
    }
}

/// Decode heterogeneous catalog items, keeping only eligible tracks.
/// Items that are not track-shaped (e.g. missing `id`) are ineligible too.
pub(crate) fn eligible_tracks_from(items: Vec<Value>) -> Vec<Track> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Track>(item) {
            Ok(track) => Some(track),
            Err(e) => {
                tracing::warn!("Skipping undecodable catalog item: {}", e);
                None
            }
        })
        .filter(|track| {
            let eligible = track.is_eligible();
            if !eligible {
                tracing::debug!(track_id = %track.id, kind = %track.kind, "Skipping ineligible item");
            }
            eligible
        })
        .collect()
}

fn redact_query(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[async_trait::async_trait]
impl Catalog for SoundCloudClient {
    async fn authenticate(&self) -> Result<AccessToken, CatalogError> {
        let form = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];
        let request = self.http.post(&self.config.token_url).form(&form);
        let response: TokenResponse = match self.get_json("token exchange", request).await {
            Ok(r) => r,
            Err(CatalogError::HttpStatus { status, .. }) if status == 400 || status == 401 => {
                return Err(CatalogError::AuthRejected(format!(
                    "token endpoint answered {}",
                    status
                )));
            }
            Err(e) => return Err(e),
        };
        match response.access_token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(AccessToken(token)),
            None => Err(CatalogError::AuthRejected(
                "token response carried no access_token".to_string(),
            )),
        }
    }

    async fn eligible_tracks(&self, token: &AccessToken) -> Result<Vec<Track>, CatalogError> {
        let me = self.me(token).await?;
        tracing::info!(user_id = %me.id, username = %me.username, "Resolved identity");

        let (favorites, playlists) = tokio::try_join!(self.favorites(&me.id), self.playlists(&me.id))?;
        tracing::debug!(
            favorites = favorites.len(),
            playlists = playlists.len(),
            "Fetched catalog listings"
        );

        // A track that is both a favorite and in a playlist appears twice.
        let mut items = favorites;
        for playlist in playlists {
            items.extend(playlist.tracks);
        }
        Ok(eligible_tracks_from(items))
    }

    async fn download_media(&self, track: &Track, dest: &Path) -> Result<u64, CatalogError> {
        let url = track
            .stream_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CatalogError::InvalidUrl {
                url: String::new(),
                reason: format!("track {} has no stream URL", track.id),
            })?;
        let request = self
            .http
            .get(url)
            .query(&[("client_id", self.config.client_id.as_str())]);
        self.stream_to_file("media download", request, dest).await
    }

    async fn download_artwork(&self, url: &str, dest: &Path) -> Result<u64, CatalogError> {
        self.stream_to_file("artwork download", self.http.get(url), dest)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SoundCloudClient {
        client_with_timeout(server, Duration::from_secs(5))
    }

    fn client_with_timeout(server: &MockServer, timeout: Duration) -> SoundCloudClient {
        SoundCloudClient::new(CatalogConfig {
            api_url: server.uri(),
            token_url: format!("{}/oauth2/token", server.uri()),
            client_id: "cid".to_string(),
            client_secret: "csecret".to_string(),
            username: "listener".to_string(),
            password: "pw".to_string(),
            timeout,
        })
        .unwrap()
    }

    fn track_json(id: u64, title: &str) -> Value {
        json!({
            "id": id,
            "kind": "track",
            "title": title,
            "user": {"username": "uploader"},
            "stream_url": format!("https://api.example.com/tracks/{}/stream", id)
        })
    }

    #[tokio::test]
    async fn test_paginate_follows_cursors_in_order() {
        let server = MockServer::start().await;
        let page2 = format!("{}/cursor/2", server.uri());
        let page3 = format!("{}/cursor/3", server.uri());

        Mock::given(method("GET"))
            .and(path("/users/7/favorites"))
            .and(query_param("client_id", "cid"))
            .and(query_param("linked_partitioning", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [track_json(1, "a"), track_json(2, "b")],
                "next_href": page2
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cursor/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [track_json(3, "c"), track_json(4, "d")],
                "next_href": page3
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cursor/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [track_json(5, "e")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = format!("{}/users/7/favorites", server.uri());
        let items = client.paginate("favorites", &url).await.unwrap();
        let ids: Vec<u64> = items.iter().map(|i| i["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_paginate_accepts_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/7/playlists"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"tracks": []}, {"tracks": []}])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = format!("{}/users/7/playlists", server.uri());
        assert_eq!(client.paginate("playlists", &url).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_paginate_aborts_on_error_page() {
        let server = MockServer::start().await;
        let page2 = format!("{}/cursor/2", server.uri());
        Mock::given(method("GET"))
            .and(path("/users/7/favorites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [track_json(1, "a")],
                "next_href": page2
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cursor/2"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = format!("{}/users/7/favorites", server.uri());
        let err = client.paginate("favorites", &url).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::HttpStatus { status: 502, operation: "favorites", .. }
        ));
    }

    #[tokio::test]
    async fn test_authenticate_exchanges_password_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=listener"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server).authenticate().await.unwrap();
        assert_eq!(token.as_str(), "tok-1");
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server).authenticate().await.unwrap_err();
        assert!(matches!(err, CatalogError::AuthRejected(_)));
    }

    #[tokio::test]
    async fn test_authenticate_missing_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let err = client_for(&server).authenticate().await.unwrap_err();
        assert!(matches!(err, CatalogError::AuthRejected(_)));
    }

    #[tokio::test]
    async fn test_eligible_tracks_merges_favorites_and_playlists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("oauth_token", "tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 7, "username": "listener"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/7/favorites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [
                    track_json(1, "fav"),
                    {"id": 90, "kind": "playlist", "title": "not a track"},
                    {"id": 91, "kind": "track", "title": "no stream"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/7/playlists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [
                    {"kind": "playlist", "tracks": [track_json(2, "p1"), track_json(1, "fav")]},
                    {"kind": "playlist", "tracks": [track_json(3, "p2"), {"kind": "track"}]}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let tracks = client
            .eligible_tracks(&AccessToken("tok".to_string()))
            .await
            .unwrap();
        let ids: Vec<String> = tracks.iter().map(|t| t.id.to_string()).collect();
        // Duplicates across favorites and playlists are kept.
        assert_eq!(ids, vec!["1", "2", "1", "3"]);
    }

    #[tokio::test]
    async fn test_eligible_tracks_tolerates_null_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "username": null})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/7/favorites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [{
                    "id": 1,
                    "kind": "track",
                    "title": "orphan",
                    "user": null,
                    "stream_url": "https://api.example.com/tracks/1/stream"
                }],
                "next_href": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/7/playlists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collection": [
                    {"kind": "playlist", "tracks": null},
                    {"kind": "playlist", "tracks": [track_json(2, "kept")]}
                ]
            })))
            .mount(&server)
            .await;

        let tracks = client_for(&server)
            .eligible_tracks(&AccessToken("tok".to_string()))
            .await
            .unwrap();
        let ids: Vec<String> = tracks.iter().map(|t| t.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_stalled_api_call_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 7}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let err = client_with_timeout(&server, Duration::from_millis(200))
            .eligible_tracks(&AccessToken("tok".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Transport { .. }), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_eligible_tracks_fails_when_identity_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .eligible_tracks(&AccessToken("tok".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::HttpStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_download_media_streams_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tracks/1/stream"))
            .and(query_param("client_id", "cid"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1.mp3");
        let mut track = crate::soundcloud::types::track_fixture("1", "song");
        track.stream_url = Some(format!("{}/tracks/1/stream", server.uri()));

        let written = client_for(&server)
            .download_media(&track, &dest)
            .await
            .unwrap();
        assert_eq!(written, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"ID3audio");
    }

    #[tokio::test]
    async fn test_download_artwork_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/art.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1.jpg");
        let url = format!("{}/art.jpg", server.uri());
        let err = client_for(&server)
            .download_artwork(&url, &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::HttpStatus { status: 404, .. }));
        assert!(!dest.exists());
    }
}
