//! Imgflip `caption_image` adapter: lets imgflip draw the captions.

use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::catalog::Template;
use crate::constants::{
    IMGFLIP_CAPTION_URL, IMGFLIP_DEFAULT_PASSWORD, IMGFLIP_DEFAULT_USERNAME, SLOT_COUNT,
};
use crate::error::MemeError;
use crate::render::{MemeImage, Renderer};

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    success: bool,
    #[serde(default)]
    data: Option<CaptionData>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionData {
    url: String,
}

/// Builds the form fields for a caption request. `text0` and `text1` are
/// always sent; `text2` and `text3` only when they have content, since
/// imgflip treats an empty box differently from a missing one.
pub fn caption_form<'a>(
    template: &'a Template,
    username: &'a str,
    password: &'a str,
    texts: &'a [String; SLOT_COUNT],
) -> Vec<(&'static str, &'a str)> {
    let mut form = vec![
        ("template_id", template.id.as_str()),
        ("username", username),
        ("password", password),
        ("text0", texts[0].as_str()),
        ("text1", texts[1].as_str()),
    ];
    if !texts[2].is_empty() {
        form.push(("text2", texts[2].as_str()));
    }
    if !texts[3].is_empty() {
        form.push(("text3", texts[3].as_str()));
    }
    form
}

/// Renders memes through imgflip's captioning API.
#[derive(Clone, Debug)]
pub struct RemoteCaptioner {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl RemoteCaptioner {
    /// Captioner using the public imgflip endpoint and shared account.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: IMGFLIP_CAPTION_URL.to_string(),
            username: IMGFLIP_DEFAULT_USERNAME.to_string(),
            password: IMGFLIP_DEFAULT_PASSWORD.to_string(),
        }
    }

    /// Use your own imgflip account.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Send requests somewhere else, eg a mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Ask imgflip to caption `template` and return the finished image URL.
    pub async fn render_remote(
        &self,
        template: &Template,
        texts: &[String; SLOT_COUNT],
    ) -> Result<Url, MemeError> {
        let form = caption_form(template, &self.username, &self.password, texts);
        debug!(
            "Captioning template {} with {} fields",
            template.id,
            form.len()
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|err| MemeError::RemoteService(format!("request failed: {err}")))?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| MemeError::RemoteService(format!("failed reading body: {err}")))?;
        let parsed: CaptionResponse = serde_json::from_slice(&bytes).map_err(|err| {
            MemeError::RemoteService(format!(
                "unexpected response ({err}): {}",
                String::from_utf8_lossy(&bytes)
            ))
        })?;

        if !parsed.success {
            return Err(MemeError::RemoteService(
                parsed
                    .error_message
                    .unwrap_or_else(|| "no error message given".to_string()),
            ));
        }
        let url = parsed
            .data
            .ok_or_else(|| MemeError::RemoteService("response is missing data.url".to_string()))?
            .url;
        let url = Url::parse(&url)
            .map_err(|err| MemeError::RemoteService(format!("bad image URL {url}: {err}")))?;
        info!("Imgflip rendered {} at {}", template.name, url);
        Ok(url)
    }
}

impl Renderer for RemoteCaptioner {
    async fn render(
        &self,
        template: &Template,
        texts: &[String; SLOT_COUNT],
    ) -> Result<MemeImage, MemeError> {
        self.render_remote(template, texts).await.map(MemeImage::Remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use httpmock::prelude::*;
    use serde_json::json;

    fn drake() -> Template {
        Catalog::builtin()
            .expect("builtin catalog")
            .fallback()
            .clone()
    }

    fn texts(slots: [&str; 4]) -> [String; SLOT_COUNT] {
        slots.map(String::from)
    }

    #[test]
    fn form_omits_empty_trailing_slots() {
        let template = drake();
        let texts = texts(["top", "", "", "four"]);
        let form = caption_form(&template, "user", "pass", &texts);
        assert_eq!(
            form,
            vec![
                ("template_id", "181913649"),
                ("username", "user"),
                ("password", "pass"),
                ("text0", "top"),
                ("text1", ""),
                ("text3", "four"),
            ]
        );
    }

    #[tokio::test]
    async fn returns_url_on_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/caption_image")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body_contains("template_id=181913649")
                    .body_contains("username=imgflip_hubot")
                    .body_contains("text0=MONDAY")
                    .body_contains("text1=WHY");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": {"url": "https://i.imgflip.com/abc123.jpg", "page_url": "https://imgflip.com/i/abc123"}
                }));
            })
            .await;

        let captioner = RemoteCaptioner::new(reqwest::Client::new())
            .with_endpoint(server.url("/caption_image"));
        let image = captioner
            .render(&drake(), &texts(["MONDAY", "WHY", "", ""]))
            .await
            .expect("render");

        mock.assert_async().await;
        assert_eq!(
            image,
            MemeImage::Remote(Url::parse("https://i.imgflip.com/abc123.jpg").expect("url"))
        );
    }

    #[tokio::test]
    async fn empty_extra_slots_are_not_sent() {
        let server = MockServer::start_async().await;
        let with_text2 = server
            .mock_async(|when, then| {
                when.method(POST).body_contains("text2=");
                then.status(200)
                    .json_body(json!({"success": false, "error_message": "text2 was sent"}));
            })
            .await;
        let without = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({
                    "success": true,
                    "data": {"url": "https://i.imgflip.com/x.jpg"}
                }));
            })
            .await;

        let captioner = RemoteCaptioner::new(reqwest::Client::new())
            .with_credentials("me", "secret")
            .with_endpoint(server.url("/caption_image"));
        captioner
            .render_remote(&drake(), &texts(["a", "b", "", ""]))
            .await
            .expect("render");

        assert_eq!(with_text2.hits_async().await, 0);
        assert_eq!(without.hits_async().await, 1);
    }

    #[tokio::test]
    async fn failure_carries_service_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(json!({"success": false, "error_message": "No texts specified"}));
            })
            .await;

        let captioner = RemoteCaptioner::new(reqwest::Client::new())
            .with_endpoint(server.url("/caption_image"));
        let err = captioner
            .render_remote(&drake(), &texts(["", "", "", ""]))
            .await
            .expect_err("service failure");
        assert!(
            matches!(err, MemeError::RemoteService(message) if message == "No texts specified"),
        );
    }

    #[tokio::test]
    async fn garbage_response_is_remote_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(502).body("<html>bad gateway</html>");
            })
            .await;

        let captioner = RemoteCaptioner::new(reqwest::Client::new())
            .with_endpoint(server.url("/caption_image"));
        let err = captioner
            .render_remote(&drake(), &texts(["a", "b", "", ""]))
            .await
            .expect_err("bad gateway");
        assert!(
            matches!(err, MemeError::RemoteService(message) if message.contains("bad gateway")),
        );
    }
}
