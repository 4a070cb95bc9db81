//! File CRUD and listing against one pod container.

use crate::containers::{
    create_container, list_container_members, parent_containers, to_absolute_url,
};
use crate::error::{LdpError, LdpResult};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

/// One file discovered in a container listing. `path` is relative to the
/// persister's base container, with percent-encoding already decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub etag: Option<String>,
    pub size: u64,
}

/// Result of a `HEAD` probe on a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteStat {
    pub etag: Option<String>,
    pub size: u64,
}

/// A downloaded file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub etag: Option<String>,
}

/// Guesses a content type from the file extension.
pub fn mime_for_path(path: &str) -> &'static str {
    if path.ends_with(".json") {
        "application/json"
    } else if path.ends_with(".jsonld") {
        "application/ld+json"
    } else if path.ends_with(".txt") || path.ends_with(".md") {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn etag_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn decode_segments(relative: &str) -> String {
    let decoded = relative
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect::<Vec<_>>()
        .join("/");
    if relative.ends_with('/') && !decoded.is_empty() {
        format!("{decoded}/")
    } else {
        decoded
    }
}

/// CRUD + listing over one pod container.
pub struct LdpFilePersister {
    base_url: String,
    client: Client,
}

impl LdpFilePersister {
    /// `pod_container_url` is the absolute URL of the sync root's container;
    /// a missing trailing `/` is added.
    pub fn new(pod_container_url: impl Into<String>, client: Client) -> Self {
        let mut base_url = pod_container_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url, client }
    }

    fn absolute_url(&self, relative: &str) -> String {
        to_absolute_url(&self.base_url, relative)
    }

    /// Creates every container prefix of `relative` that does not yet exist,
    /// parents before children.
    pub async fn ensure_path(&self, relative: &str) -> LdpResult<()> {
        for current in parent_containers(relative) {
            let url = self.absolute_url(&current);
            let probe = self.client.head(&url).send().await?;
            if probe.status().is_success() {
                continue;
            }
            if probe.status() != StatusCode::NOT_FOUND {
                return Err(LdpError::Read {
                    method: "HEAD",
                    url,
                    status: probe.status().as_u16(),
                });
            }

            let parent_relative = parent_containers(&current).pop().unwrap_or_default();
            let parent_url = self.absolute_url(&parent_relative);
            let slug = current
                .split('/')
                .filter(|s| !s.is_empty())
                .next_back()
                .unwrap_or_default();
            create_container(&self.client, &parent_url, slug).await?;
        }
        Ok(())
    }

    /// Uploads a file, creating parent containers as needed. Returns the
    /// revision token from the response, if the pod sent one.
    pub async fn put_file(
        &self,
        relative: &str,
        bytes: &[u8],
        mime_type: &str,
    ) -> LdpResult<Option<String>> {
        self.ensure_path(relative).await?;
        let url = self.absolute_url(relative);
        let response = self
            .client
            .put(&url)
            .header("Content-Type", mime_type)
            .body(bytes.to_vec())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LdpError::Write {
                method: "PUT",
                url,
                status: response.status().as_u16(),
            });
        }
        debug!(%url, bytes = bytes.len(), "uploaded file");
        Ok(etag_of(&response))
    }

    /// Downloads a file. `None` means the pod has no such resource.
    pub async fn get_file(&self, relative: &str) -> LdpResult<Option<FetchedFile>> {
        let url = self.absolute_url(relative);
        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LdpError::Read {
                method: "GET",
                url,
                status: response.status().as_u16(),
            });
        }
        let etag = etag_of(&response);
        let bytes = response.bytes().await?.to_vec();
        Ok(Some(FetchedFile { bytes, etag }))
    }

    /// Probes a file's revision and size without downloading it.
    pub async fn stat_file(&self, relative: &str) -> LdpResult<Option<RemoteStat>> {
        let url = self.absolute_url(relative);
        let response = self.client.head(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LdpError::Read {
                method: "HEAD",
                url,
                status: response.status().as_u16(),
            });
        }
        let size = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(Some(RemoteStat {
            etag: etag_of(&response),
            size,
        }))
    }

    /// Deletes a file. Already-gone (404) is success.
    pub async fn delete_file(&self, relative: &str) -> LdpResult<()> {
        let url = self.absolute_url(relative);
        let response = self.client.delete(&url).send().await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(LdpError::Write {
                method: "DELETE",
                url,
                status: status.as_u16(),
            })
        }
    }

    /// Recursively lists every file under `dir` (or the whole container),
    /// expanding sub-containers and following listing pagination.
    pub async fn list_files(&self, dir: Option<&str>) -> LdpResult<Vec<RemoteFile>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.unwrap_or("").to_string()];

        while let Some(current) = pending.pop() {
            let container_url = self.absolute_url(&current);
            for member in list_container_members(&self.client, &container_url).await? {
                let Some(encoded) = member.strip_prefix(&self.base_url) else {
                    // Foreign membership triple; not ours to sync.
                    continue;
                };
                let relative = decode_segments(encoded);
                if relative.ends_with('/') {
                    pending.push(relative);
                    continue;
                }
                let stat = self.stat_file(&relative).await?;
                let (etag, size) = stat.map(|s| (s.etag, s.size)).unwrap_or((None, 0));
                files.push(RemoteFile {
                    path: relative,
                    etag,
                    size,
                });
            }
        }

        Ok(files)
    }

    /// Lists then deletes every file under the container. Full-root teardown.
    pub async fn delete_all(&self) -> LdpResult<()> {
        for file in self.list_files(None).await? {
            self.delete_file(&file.path).await?;
        }
        Ok(())
    }
}
