use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use shared::ArtifactKind;
use url::Url;

use super::models::AnalysisForm;

/// Status, content type and body as returned by the detection service.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct UpstreamService {
    client: Client,
    base: Url,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid upstream path: {0}")]
    Url(#[from] url::ParseError),
}

impl UpstreamService {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn artifact_url(&self, kind: ArtifactKind) -> Result<Url, UpstreamError> {
        Ok(self.base.join(&kind.download_path())?)
    }

    pub async fn analyze(&self, form: AnalysisForm) -> Result<UpstreamResponse, UpstreamError> {
        let file = Part::bytes(form.bytes)
            .file_name(form.file_name)
            .mime_str(&form.content_type)?;
        let multipart = Form::new()
            .part("file", file)
            .text("environment", form.params.environment.to_string())
            .text("confidence", form.params.confidence_field());

        let response = self
            .client
            .post(self.base.clone())
            .multipart(multipart)
            .send()
            .await?;
        Self::collect(response).await
    }

    pub async fn download(&self, kind: ArtifactKind) -> Result<UpstreamResponse, UpstreamError> {
        let response = self.client.get(self.artifact_url(kind)?).send().await?;
        Self::collect(response).await
    }

    async fn collect(response: reqwest::Response) -> Result<UpstreamResponse, UpstreamError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_urls_follow_the_download_layout() {
        let base = Url::parse("https://api.detectree2.tech/").unwrap();
        let service = UpstreamService::new(Client::new(), base);
        assert_eq!(
            service.artifact_url(ArtifactKind::Gpkg).unwrap().as_str(),
            "https://api.detectree2.tech/download/gpkg"
        );
    }
}
