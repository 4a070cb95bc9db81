//! Pod session: an authenticated HTTP client bound to a WebID.
//!
//! Authentication itself is out of scope: the host hands us a
//! `reqwest::Client` already configured to attach the signed-in identity's
//! credentials (DPoP/Bearer middleware, cookie jar, whatever the pod wants).

use reqwest::Client;

#[derive(Clone)]
pub struct PodSession {
    pub client: Client,
    pub web_id: String,
}

impl PodSession {
    pub fn new(client: Client, web_id: impl Into<String>) -> Self {
        Self {
            client,
            web_id: web_id.into(),
        }
    }

    /// Default pod root for this identity, derived from the WebID origin.
    pub fn pod_root(&self) -> Option<String> {
        derive_pod_root_from_web_id(&self.web_id)
    }
}

/// Maps a WebID like `https://alice.example/profile#me` to `https://alice.example/`.
pub fn derive_pod_root_from_web_id(web_id: &str) -> Option<String> {
    let url = reqwest::Url::parse(web_id).ok()?;
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{host}:{port}/", url.scheme())),
        None => Some(format!("{}://{host}/", url.scheme())),
    }
}
