//! Record persistence as JSON-LD documents, one resource per record, grouped
//! into per-table containers under an application namespace container.

use crate::containers::{create_container, list_container_members};
use crate::error::{LdpError, LdpResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Stores record documents under `{pod_root}{namespace}/{container}/{id}.jsonld`.
pub struct LdpRecordPersister {
    app_root: String,
    namespace: String,
    client: Client,
}

impl LdpRecordPersister {
    /// `namespace` is the application container name under the pod root,
    /// e.g. `"ambry"`.
    pub fn new(pod_root: impl Into<String>, namespace: impl Into<String>, client: Client) -> Self {
        let mut pod_root = pod_root.into();
        if !pod_root.ends_with('/') {
            pod_root.push('/');
        }
        let namespace = namespace.into();
        Self {
            app_root: format!("{pod_root}{namespace}/"),
            namespace,
            client,
        }
    }

    fn pod_root(&self) -> &str {
        // app_root always ends with "{namespace}/".
        &self.app_root[..self.app_root.len() - self.namespace.len() - 1]
    }

    fn container_url(&self, container: &str) -> String {
        format!("{}{}/", self.app_root, urlencoding::encode(container))
    }

    fn resource_url(&self, container: &str, id: &str) -> String {
        format!(
            "{}{}.jsonld",
            self.container_url(container),
            urlencoding::encode(id)
        )
    }

    /// Makes sure `{app_root}{container}/` exists, creating the app root
    /// first when the pod has never seen this application.
    pub async fn ensure_container(&self, container: &str) -> LdpResult<()> {
        let url = self.container_url(container);
        let probe = self.client.head(&url).send().await?;
        if probe.status().is_success() {
            return Ok(());
        }
        if probe.status() != StatusCode::NOT_FOUND {
            return Err(LdpError::Read {
                method: "HEAD",
                url,
                status: probe.status().as_u16(),
            });
        }

        let root_probe = self.client.head(&self.app_root).send().await?;
        if root_probe.status() == StatusCode::NOT_FOUND {
            create_container(&self.client, self.pod_root(), &self.namespace).await?;
        } else if !root_probe.status().is_success() {
            return Err(LdpError::Read {
                method: "HEAD",
                url: self.app_root.clone(),
                status: root_probe.status().as_u16(),
            });
        }
        create_container(&self.client, &self.app_root, container).await
    }

    /// Writes one record document, creating its container on first use.
    pub async fn put_record(&self, container: &str, id: &str, document: &Value) -> LdpResult<()> {
        self.ensure_container(container).await?;
        let url = self.resource_url(container, id);
        let body = serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string());
        let response = self
            .client
            .put(&url)
            .header("Content-Type", "application/ld+json")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LdpError::Write {
                method: "PUT",
                url,
                status: response.status().as_u16(),
            });
        }
        debug!(%url, "stored record");
        Ok(())
    }

    /// Deletes one record document. Already-gone (404) is success.
    pub async fn delete_record(&self, container: &str, id: &str) -> LdpResult<()> {
        let url = self.resource_url(container, id);
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

    /// Downloads every record document in a table's container. A container
    /// the pod has never created yields an empty list; individual members
    /// that fail to download or parse are skipped with a warning so one bad
    /// document cannot wedge a whole table pull.
    pub async fn list_records(&self, container: &str) -> LdpResult<Vec<Value>> {
        let url = self.container_url(container);
        let probe = self.client.head(&url).send().await?;
        if probe.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !probe.status().is_success() {
            return Err(LdpError::Read {
                method: "HEAD",
                url,
                status: probe.status().as_u16(),
            });
        }

        let mut documents = Vec::new();
        for member in list_container_members(&self.client, &url).await? {
            let response = self.client.get(&member).send().await?;
            if !response.status().is_success() {
                warn!(url = %member, status = response.status().as_u16(), "skipping unreadable record");
                continue;
            }
            match response.json::<Value>().await {
                Ok(document) => documents.push(document),
                Err(e) => warn!(url = %member, error = %e, "skipping unparsable record"),
            }
        }
        Ok(documents)
    }

    /// Writes a one-per-app document at `{app_root}{name}.jsonld`. Used for
    /// settings-style state that is not a table row.
    pub async fn put_singleton(&self, name: &str, document: &Value) -> LdpResult<()> {
        let root_probe = self.client.head(&self.app_root).send().await?;
        if root_probe.status() == StatusCode::NOT_FOUND {
            create_container(&self.client, self.pod_root(), &self.namespace).await?;
        } else if !root_probe.status().is_success() {
            return Err(LdpError::Read {
                method: "HEAD",
                url: self.app_root.clone(),
                status: root_probe.status().as_u16(),
            });
        }

        let url = format!("{}{}.jsonld", self.app_root, urlencoding::encode(name));
        let body = serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string());
        let response = self
            .client
            .put(&url)
            .header("Content-Type", "application/ld+json")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(LdpError::Write {
                method: "PUT",
                url,
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    /// Reads a singleton document back. `None` means never written.
    pub async fn get_singleton(&self, name: &str) -> LdpResult<Option<Value>> {
        let url = format!("{}{}.jsonld", self.app_root, urlencoding::encode(name));
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
        let document = response.json::<Value>().await.map_err(|e| LdpError::Listing {
            url,
            reason: e.to_string(),
        })?;
        Ok(Some(document))
    }
}
