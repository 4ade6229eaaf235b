//! GCP project-id discovery for Vertex AI.
//!
//! Sources are tried in order: `GOOGLE_CLOUD_PROJECT` / `GCLOUD_PROJECT`, the credentials
//! file (`project_id` or `quota_project_id`), the metadata server, then
//! `gcloud config get-value project`.

use std::path::PathBuf;

use super::METADATA_ROOT;
use super::adc::{AdcFile, well_known_adc_path};
use crate::env::EnvSnapshot;
use crate::error::ProviderError;

/// Project-id discovery chain
#[derive(Debug, Clone)]
pub struct ProjectDiscovery {
    env_project: Option<String>,
    credentials_path: Option<PathBuf>,
    metadata_root: Option<String>,
    use_gcloud: bool,
}

impl ProjectDiscovery {
    /// Default chain. `key_file` is the service-account key selected through `GEMINI_API_KEY`.
    pub fn new(env: &EnvSnapshot, key_file: Option<PathBuf>) -> Self {
        let env_project = env
            .var("GOOGLE_CLOUD_PROJECT")
            .or_else(|| env.var("GCLOUD_PROJECT"))
            .map(str::to_string);
        let credentials_path = key_file
            .or_else(|| env.var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from))
            .or_else(|| well_known_adc_path().filter(|p| p.is_file()));
        Self {
            env_project,
            credentials_path,
            metadata_root: Some(METADATA_ROOT.to_string()),
            use_gcloud: true,
        }
    }

    pub fn with_credentials_path(mut self, path: Option<PathBuf>) -> Self {
        self.credentials_path = path;
        self
    }

    /// Override (or with `None` skip) the metadata server lookup
    pub fn with_metadata_root(mut self, root: Option<String>) -> Self {
        self.metadata_root = root;
        self
    }

    pub const fn with_gcloud(mut self, enabled: bool) -> Self {
        self.use_gcloud = enabled;
        self
    }

    pub async fn discover(&self, http: &reqwest::Client) -> Result<String, ProviderError> {
        if let Some(p) = &self.env_project {
            return Ok(p.clone());
        }

        if let Some(path) = &self.credentials_path {
            match AdcFile::load(path) {
                Ok(file) => {
                    if let Some(p) = file.project_id() {
                        tracing::debug!("Project id from {}", path.display());
                        return Ok(p.to_string());
                    }
                }
                Err(e) => tracing::debug!("Skipping credentials file for project id: {e}"),
            }
        }

        if let Some(root) = &self.metadata_root
            && let Some(p) = metadata_project(http, root).await
        {
            tracing::debug!("Project id from metadata server");
            return Ok(p);
        }

        if self.use_gcloud
            && let Some(p) = gcloud_project().await
        {
            tracing::debug!("Project id from gcloud config");
            return Ok(p);
        }

        Err(ProviderError::ConfigurationError(
            "Could not determine the Google Cloud project id. Set GOOGLE_CLOUD_PROJECT or run \
             `gcloud config set project <id>`"
                .to_string(),
        ))
    }
}

async fn metadata_project(http: &reqwest::Client, root: &str) -> Option<String> {
    let resp = http
        .get(format!("{root}/project/project-id"))
        .header("Metadata-Flavor", "Google")
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
        .ok()?;
    if !resp.status().is_success() {
        return None;
    }
    let text = resp.text().await.ok()?;
    non_empty(&text)
}

async fn gcloud_project() -> Option<String> {
    let output = tokio::process::Command::new("gcloud")
        .args(["config", "get-value", "project"])
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    non_empty(&String::from_utf8_lossy(&output.stdout))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty() && s != "(unset)").then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(discovery: ProjectDiscovery) -> ProjectDiscovery {
        discovery.with_metadata_root(None).with_gcloud(false)
    }

    #[tokio::test]
    async fn environment_wins() {
        let env = EnvSnapshot::from_pairs([("GOOGLE_CLOUD_PROJECT", "env-proj")]);
        let d = offline(ProjectDiscovery::new(&env, None));
        assert_eq!(d.discover(&reqwest::Client::new()).await.unwrap(), "env-proj");
    }

    #[tokio::test]
    async fn falls_back_to_key_file_project() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("sa.json");
        std::fs::write(
            &key,
            r#"{"type":"service_account","client_email":"a@b","private_key":"k","project_id":"sa-proj"}"#,
        )
        .unwrap();
        let d = offline(ProjectDiscovery::new(&EnvSnapshot::default(), Some(key)));
        assert_eq!(d.discover(&reqwest::Client::new()).await.unwrap(), "sa-proj");
    }

    #[tokio::test]
    async fn exhausted_chain_is_a_configuration_error() {
        let d = offline(ProjectDiscovery::new(&EnvSnapshot::default(), None))
            .with_credentials_path(None);
        assert!(matches!(
            d.discover(&reqwest::Client::new()).await,
            Err(ProviderError::ConfigurationError(_))
        ));
    }
}
