use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use url::Url;

use super::driver::DriverError;

/// W3C element identifier key in WebDriver responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const FIND_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Minimal W3C WebDriver wire client against a chromedriver/geckodriver
/// endpoint. Only the handful of commands the marketplace driver needs.
pub struct WebDriverClient {
    http: Client,
    base: Url,
    session_id: String,
}

impl WebDriverClient {
    pub async fn connect(http: Client, server_url: &str) -> Result<Self, DriverError> {
        // A trailing slash keeps Url::join from eating the last path segment
        // when the endpoint is mounted under a prefix like /wd/hub.
        let normalized = if server_url.ends_with('/') {
            server_url.to_string()
        } else {
            format!("{server_url}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|err| DriverError::Protocol(format!("invalid webdriver url: {err}")))?;
        let payload = json!({
            "capabilities": {
                "alwaysMatch": {
                    "goog:chromeOptions": { "args": ["--start-maximized"] }
                }
            }
        });
        let value = raw_command(&http, &base, "session", &payload).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol("session response missing sessionId".into()))?
            .to_string();
        Ok(Self {
            http,
            base,
            session_id,
        })
    }

    pub async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.command("url", &json!({ "url": url })).await?;
        Ok(())
    }

    /// Looks the element up once; absence is a `None`, not an error.
    pub async fn find(&self, css: &str) -> Result<Option<String>, DriverError> {
        let path = self.session_path("element");
        let response = self
            .http
            .post(self.endpoint(&path)?)
            .json(&json!({ "using": "css selector", "value": css }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let value = unwrap_value(response).await?;
        Ok(value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Polls for the element until it appears or the timeout elapses. An
    /// expired wait reports the element as absent rather than blocking.
    pub async fn wait_for(
        &self,
        css: &str,
        timeout: Duration,
    ) -> Result<Option<String>, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(css).await? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(FIND_POLL_INTERVAL).await;
        }
    }

    pub async fn click(&self, element: &str) -> Result<(), DriverError> {
        self.command(&format!("element/{element}/click"), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn clear(&self, element: &str) -> Result<(), DriverError> {
        self.command(&format!("element/{element}/clear"), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &str, text: &str) -> Result<(), DriverError> {
        self.command(&format!("element/{element}/value"), &json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn text(&self, element: &str) -> Result<String, DriverError> {
        let path = self.session_path(&format!("element/{element}/text"));
        let response = self.http.get(self.endpoint(&path)?).send().await?;
        let value = unwrap_value(response).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.command("execute/sync", &json!({ "script": script, "args": args }))
            .await
    }

    /// Serialized form of an element id for use as an `execute` argument.
    pub fn element_arg(element: &str) -> Value {
        json!({ ELEMENT_KEY: element })
    }

    async fn command(&self, path: &str, body: &Value) -> Result<Value, DriverError> {
        let path = self.session_path(path);
        let response = self.http.post(self.endpoint(&path)?).json(body).send().await?;
        unwrap_value(response).await
    }

    fn session_path(&self, path: &str) -> String {
        format!("session/{}/{}", self.session_id, path)
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriverError> {
        self.base
            .join(path)
            .map_err(|err| DriverError::Protocol(format!("invalid command path {path}: {err}")))
    }
}

async fn raw_command(
    http: &Client,
    base: &Url,
    path: &str,
    body: &Value,
) -> Result<Value, DriverError> {
    let endpoint = base
        .join(path)
        .map_err(|err| DriverError::Protocol(format!("invalid command path {path}: {err}")))?;
    let response = http.post(endpoint).json(body).send().await?;
    unwrap_value(response).await
}

async fn unwrap_value(response: reqwest::Response) -> Result<Value, DriverError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| DriverError::Protocol(format!("non-json webdriver response: {err}")))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .unwrap_or("unknown webdriver error");
        return Err(DriverError::Protocol(format!("{status}: {message}")));
    }
    Ok(value)
}
