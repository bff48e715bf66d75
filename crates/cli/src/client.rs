//! HTTP client for a running extender

use anyhow::{Context, Result};
use extender_lib::{ExtenderArgs, ExtenderFilterResult, HostPriorityList};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

pub struct ExtenderClient {
    client: Client,
    base_url: Url,
}

impl ExtenderClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // Keep any path prefix when joining endpoint names
        let mut base_url = Url::parse(base_url).context("Invalid extender URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    async fn check(response: Response) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Extender error ({}): {}", status, body);
        }
        Ok(response)
    }

    pub async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .text()
            .await
            .context("Failed to read response")
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::check(response)
            .await?
            .json()
            .await
            .context("Failed to parse response")
    }

    pub async fn prioritize(&self, args: &ExtenderArgs) -> Result<HostPriorityList> {
        self.post("prioritize", args).await
    }

    pub async fn filter(&self, args: &ExtenderArgs) -> Result<ExtenderFilterResult> {
        self.post("filter", args).await
    }

    pub async fn version(&self) -> Result<String> {
        Ok(self.get_text("version").await?.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extender_lib::NodeList;

    fn args() -> ExtenderArgs {
        ExtenderArgs {
            nodes: Some(NodeList::new(Vec::new())),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_prioritize_decodes_priorities() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/prioritize")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"host": "a", "score": 10}, {"host": "b", "score": 4}]"#)
            .create_async()
            .await;

        let client = ExtenderClient::new(&server.url()).unwrap();
        let priorities = client.prioritize(&args()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(priorities.len(), 2);
        assert_eq!(priorities[1].host, "b");
        assert_eq!(priorities[1].score, 4);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/prioritize")
            .with_status(500)
            .with_body(r#"{"error": "metrics source unavailable for node a: down"}"#)
            .create_async()
            .await;

        let client = ExtenderClient::new(&server.url()).unwrap();
        let err = client.prioritize(&args()).await.unwrap_err();

        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("metrics source unavailable"));
    }

    #[tokio::test]
    async fn test_filter_and_version_under_path_prefix() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/green/filter")
            .with_status(200)
            .with_body(r#"{"failedNodes": {"b": "NodeLabelMatchFailure"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/green/version")
            .with_status(200)
            .with_body("0.1.0\n")
            .create_async()
            .await;

        let client = ExtenderClient::new(&format!("{}/green", server.url())).unwrap();

        let result = client.filter(&args()).await.unwrap();
        assert!(result.failed_nodes.contains_key("b"));
        assert_eq!(client.version().await.unwrap(), "0.1.0");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ExtenderClient::new("not a url").is_err());
    }
}
