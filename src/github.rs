//! GitHub Releases API client.
//!
//! Lists every published (non-prerelease) release of a repository, newest
//! first, and downloads release assets in full.
//!
//! # Examples
//!
//! ```no_run
//! use histver::github::GitHubClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GitHubClient::new("syncthing/syncthing")?;
//!     for release in client.list_releases().await? {
//!         println!("{} ({} assets)", release.tag_name, release.assets.len());
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::{Error, Result};
use crate::resolve::Fetch;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PER_PAGE: usize = 100;
// Upper bound on the up-front buffer for a download
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// A downloadable file attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Release metadata from the GitHub API
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    fn published(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    repo: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Client for `owner/name` against the public GitHub API.
    pub fn new(repo: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("histver/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_API_URL.to_string(),
            repo: repo.to_string(),
            token: None,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Authenticate API calls; raises the anonymous rate limit.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// All non-prerelease releases, most recently published first.
    pub async fn list_releases(&self) -> Result<Vec<Release>> {
        let mut releases = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_page(page).await?;
            let len = batch.len();
            debug!("page {}: {} releases", page, len);
            releases.extend(batch.into_iter().filter(|r| !r.prerelease));
            if len < PER_PAGE {
                break;
            }
            page += 1;
        }

        releases.sort_by(|a, b| b.published().cmp(&a.published()));
        Ok(releases)
    }

    async fn fetch_page(&self, page: usize) -> Result<Vec<Release>> {
        let url = format!("{}/repos/{}/releases", self.base_url, self.repo);
        let mut request = self
            .client
            .get(&url)
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .header("Accept", "application/vnd.github+json")
            .timeout(REQUEST_TIMEOUT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus { status, url });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Fetch for GitHubClient {
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let pb = ProgressBar::new(response.content_length().unwrap_or(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(
            url.rsplit('/')
                .next()
                .unwrap_or(url)
                .to_string(),
        );

        let mut bytes = Vec::with_capacity(initial_capacity(response.content_length()));
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            pb.set_position(bytes.len() as u64);
        }
        pb.finish_and_clear();

        Ok(bytes)
    }
}

/// Buffer size to reserve for a body of the advertised length.
fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOC) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn release_json(tag: &str, published: &str, prerelease: bool) -> serde_json::Value {
        serde_json::json!({
            "tag_name": tag,
            "created_at": published,
            "published_at": published,
            "prerelease": prerelease,
            "assets": [{
                "name": format!("syncthing-linux-amd64-{}.tar.gz", tag),
                "browser_download_url": format!("https://example.invalid/{}.tar.gz", tag),
            }],
        })
    }

    #[tokio::test]
    async fn test_list_releases_filters_prereleases_and_sorts() {
        let mut server = Server::new_async().await;
        let body = serde_json::json!([
            release_json("v1.22.0", "2022-10-04T08:00:00Z", false),
            release_json("v1.23.0-rc.1", "2022-12-20T08:00:00Z", true),
            release_json("v1.23.0", "2023-01-10T08:00:00Z", false),
        ]);
        let mock = server
            .mock("GET", "/repos/syncthing/syncthing/releases")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = GitHubClient::new("syncthing/syncthing")
            .unwrap()
            .with_base_url(&server.url());
        let releases = client.list_releases().await.unwrap();

        mock.assert_async().await;
        let tags: Vec<_> = releases.iter().map(|r| r.tag_name.as_str()).collect();
        assert_eq!(tags, ["v1.23.0", "v1.22.0"]);
        assert_eq!(releases[0].assets.len(), 1);
    }

    #[tokio::test]
    async fn test_list_releases_follows_pages() {
        let mut server = Server::new_async().await;
        let first: Vec<_> = (0..PER_PAGE)
            .map(|i| release_json(&format!("v1.0.{}", i), "2020-01-01T00:00:00Z", false))
            .collect();
        let second = vec![release_json("v0.14.0", "2019-01-01T00:00:00Z", false)];

        let page1 = server
            .mock("GET", "/repos/syncthing/syncthing/releases")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(serde_json::Value::from(first).to_string())
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/repos/syncthing/syncthing/releases")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(serde_json::Value::from(second).to_string())
            .create_async()
            .await;

        let client = GitHubClient::new("syncthing/syncthing")
            .unwrap()
            .with_base_url(&server.url());
        let releases = client.list_releases().await.unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(releases.len(), PER_PAGE + 1);
        assert_eq!(releases.last().unwrap().tag_name, "v0.14.0");
    }

    #[tokio::test]
    async fn test_list_releases_http_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/nonexistent/repo/releases")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let client = GitHubClient::new("nonexistent/repo")
            .unwrap()
            .with_base_url(&server.url());
        let err = client.list_releases().await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status, .. } if status == 404));
    }

    #[test]
    fn test_initial_capacity_is_bounded() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(4096)), 4096);
        assert_eq!(initial_capacity(Some(u64::MAX)), MAX_PREALLOC as usize);
    }

    #[tokio::test]
    async fn test_download_reads_full_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/download/syncthing.tar.gz")
            .with_status(200)
            .with_body(vec![7u8; 4096])
            .create_async()
            .await;

        let client = GitHubClient::new("syncthing/syncthing").unwrap();
        let bytes = client
            .download(&format!("{}/download/syncthing.tar.gz", server.url()))
            .await
            .unwrap();
        assert_eq!(bytes.len(), 4096);
        assert!(bytes.iter().all(|b| *b == 7));
    }
}
