//! W3C WebDriver client.
//!
//! Talks JSON over HTTP to any WebDriver endpoint: a local `chromedriver`,
//! `geckodriver` or `msedgedriver`, a Selenium grid, or the BrowserStack
//! hub. Only the commands the scraper needs are implemented:
//!
//! | Command | Endpoint |
//! |---------|----------|
//! | New session | `POST /session` |
//! | Timeouts | `POST /session/{id}/timeouts` |
//! | Window size | `POST /session/{id}/window/rect` |
//! | Navigate | `POST /session/{id}/url` |
//! | Current URL | `GET /session/{id}/url` |
//! | Find elements | `POST /session/{id}/elements` |
//! | Element text | `GET /session/{id}/element/{eid}/text` |
//! | Element property / attribute | `GET /session/{id}/element/{eid}/property/{name}` |
//! | Click | `POST /session/{id}/element/{eid}/click` |
//! | Execute script | `POST /session/{id}/execute/sync` |
//! | Delete session | `DELETE /session/{id}` |
//!
//! Every response carries a `value` member; error responses put an `error`
//! code and a `message` inside it.

use super::platform::Platform;
use super::{Browser, BrowserError, BrowserKind, BrowserResult};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// JSON key identifying a web element reference.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f816e6eb8d4";

/// BrowserStack Automate hub.
pub const BROWSERSTACK_HUB: &str = "https://hub-cloud.browserstack.com/wd/hub";

const FIREFOX_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Credentials and labels for a BrowserStack session.
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub username: String,
    pub access_key: String,
    pub project_name: String,
    pub build_name: String,
    pub session_name: String,
}

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub kind: BrowserKind,
    pub headless: bool,
    pub mobile: bool,
    pub window_size: (u32, u32),
    pub mobile_device: String,
    pub page_load_timeout: Duration,
    pub implicit_wait: Duration,
    pub remote: Option<RemoteOptions>,
    /// Hosted platform to request instead of `kind`; only used with `remote`.
    pub platform: Option<Platform>,
}

impl SessionOptions {
    fn hosted_platform(&self) -> Option<(&RemoteOptions, &Platform)> {
        self.remote.as_ref().zip(self.platform.as_ref())
    }
}

/// Build the `POST /session` payload for `options`.
pub fn capabilities(options: &SessionOptions) -> BrowserResult<Value> {
    if let Some((remote, platform)) = options.hosted_platform() {
        return Ok(platform.capabilities(remote));
    }

    let (width, height) = options.window_size;
    let window_arg = format!("--window-size={width},{height}");

    let mut always_match = match options.kind {
        BrowserKind::Chrome => {
            let mut args = vec![];
            if options.headless {
                args.push("--headless=new".to_string());
            }
            args.extend([
                window_arg,
                "--disable-gpu".to_string(),
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-blink-features=AutomationControlled".to_string(),
            ]);
            let mut chrome = json!({
                "args": args,
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            });
            if options.mobile {
                chrome["mobileEmulation"] = json!({ "deviceName": options.mobile_device });
            }
            json!({ "browserName": options.kind.webdriver_name(), "goog:chromeOptions": chrome })
        }
        BrowserKind::Edge => {
            let mut args = vec![];
            if options.headless {
                args.push("--headless=new".to_string());
            }
            args.extend([
                window_arg,
                "--disable-gpu".to_string(),
                "--no-sandbox".to_string(),
            ]);
            let mut edge = json!({ "args": args });
            if options.mobile {
                edge["mobileEmulation"] = json!({ "deviceName": options.mobile_device });
            }
            json!({ "browserName": options.kind.webdriver_name(), "ms:edgeOptions": edge })
        }
        BrowserKind::Firefox => {
            let args: Vec<&str> = if options.headless {
                vec!["-headless"]
            } else {
                vec![]
            };
            json!({
                "browserName": options.kind.webdriver_name(),
                "moz:firefoxOptions": {
                    "args": args,
                    "prefs": { "general.useragent.override": FIREFOX_USER_AGENT },
                },
            })
        }
        BrowserKind::Static => return Err(BrowserError::Unsupported(options.kind)),
    };

    if let Some(remote) = &options.remote {
        always_match["browserVersion"] = json!("latest");
        always_match["bstack:options"] = json!({
            "userName": remote.username,
            "accessKey": remote.access_key,
            "projectName": remote.project_name,
            "buildName": remote.build_name,
            "sessionName": remote.session_name,
        });
    }

    Ok(json!({ "capabilities": { "alwaysMatch": always_match } }))
}

/// Script that reports a session's outcome to the BrowserStack dashboard.
pub fn session_status_script(passed: bool, reason: &str) -> String {
    let executor = json!({
        "action": "setSessionStatus",
        "arguments": {
            "status": if passed { "passed" } else { "failed" },
            "reason": reason,
        },
    });
    format!("browserstack_executor: {executor}")
}

/// Pull the `value` member out of a WebDriver response body.
///
/// Error payloads are turned into [`BrowserError::Protocol`].
pub fn unwrap_value(success: bool, mut body: Value) -> BrowserResult<Value> {
    let value = body
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    let error_code = value.get("error").and_then(Value::as_str);
    if !success || error_code.is_some() {
        let error = error_code.unwrap_or("unknown error").to_string();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(BrowserError::Protocol { error, message });
    }
    Ok(value)
}

/// Element references from a `Find Elements` result.
pub fn element_ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|elements| {
            elements
                .iter()
                .filter_map(|e| e.get(ELEMENT_KEY).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A live WebDriver session.
pub struct WebDriverSession {
    client: Client,
    server: String,
    /// Basic auth for hosted grids.
    credentials: Option<(String, String)>,
    session_id: Option<String>,
    current_url: Option<String>,
}

impl WebDriverSession {
    /// Start a session on `server` (e.g. `http://localhost:4444`).
    #[instrument(
        level = "info",
        skip(client, options),
        fields(
            browser = %options.kind,
            platform = options.platform.as_ref().map(|p| p.name.as_str()),
            headless = options.headless,
            mobile = options.mobile,
        )
    )]
    pub async fn start(
        client: Client,
        server: &str,
        options: &SessionOptions,
    ) -> BrowserResult<Self> {
        let payload = capabilities(options)?;
        let mut session = Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            credentials: options
                .remote
                .as_ref()
                .map(|r| (r.username.clone(), r.access_key.clone())),
            session_id: None,
            current_url: None,
        };

        let value = session
            .send(session.request(Method::POST, "/session").json(&payload))
            .await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::UnexpectedResponse(value.to_string()))?
            .to_string();
        session.session_id = Some(id.clone());
        info!(session = %id, "WebDriver session started");

        session
            .command(
                Method::POST,
                "timeouts",
                Some(json!({
                    "pageLoad": options.page_load_timeout.as_millis() as u64,
                    "implicit": options.implicit_wait.as_millis() as u64,
                })),
            )
            .await?;

        if options.kind == BrowserKind::Firefox && options.hosted_platform().is_none() {
            let (width, height) = options.window_size;
            session
                .command(
                    Method::POST,
                    "window/rect",
                    Some(json!({ "width": width, "height": height })),
                )
                .await?;
        }

        Ok(session)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, format!("{}{}", self.server, path));
        match &self.credentials {
            Some((user, key)) => request.basic_auth(user, Some(key)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> BrowserResult<Value> {
        let response = request.send().await?;
        let success = response.status().is_success();
        let body: Value = response.json().await?;
        unwrap_value(success, body)
    }

    /// Send a session-scoped command, e.g. `url` or `element/{id}/text`.
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> BrowserResult<Value> {
        let id = self.session_id.as_deref().ok_or(BrowserError::Closed)?;
        let mut request = self.request(method, &format!("/session/{id}/{path}"));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }

    /// Mark the session passed or failed on BrowserStack.
    pub async fn set_session_status(&self, passed: bool, reason: &str) -> BrowserResult<()> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": session_status_script(passed, reason), "args": [] })),
        )
        .await?;
        info!(passed, reason, "Reported session status");
        Ok(())
    }

    async fn find(&self, css: &str) -> BrowserResult<Vec<String>> {
        let value = self
            .command(
                Method::POST,
                "elements",
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        Ok(element_ids(&value))
    }

    async fn element_string(&self, element: &str, path: &str) -> BrowserResult<Option<String>> {
        let value = self
            .command(Method::GET, &format!("element/{element}/{path}"), None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }
}

impl fmt::Debug for WebDriverSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDriverSession")
            .field("server", &self.server)
            .field("authenticated", &self.credentials.is_some())
            .field("session_id", &self.session_id)
            .field("current_url", &self.current_url)
            .finish()
    }
}

impl Browser for WebDriverSession {
    #[instrument(level = "debug", skip(self))]
    async fn goto(&mut self, url: &str) -> BrowserResult<()> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        let landed = self.command(Method::GET, "url", None).await?;
        self.current_url = Some(landed.as_str().unwrap_or(url).to_string());
        Ok(())
    }

    async fn wait_for(&mut self, css: &str, timeout: Duration) -> BrowserResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.find(css).await?.is_empty() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                debug!(css, ?timeout, "Timed out waiting for element");
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn texts(&mut self, css: &str) -> BrowserResult<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.find(css).await? {
            match self.element_string(&element, "text").await {
                Ok(Some(text)) => texts.push(text),
                Ok(None) => {}
                Err(e) => debug!(css, error = %e, "Skipping unreadable element"),
            }
        }
        Ok(texts)
    }

    async fn attrs(&mut self, css: &str, name: &str) -> BrowserResult<Vec<String>> {
        let mut values = Vec::new();
        for element in self.find(css).await? {
            // Properties carry resolved URLs; fall back to the raw attribute.
            let property = self
                .element_string(&element, &format!("property/{name}"))
                .await;
            let value = match property {
                Ok(Some(value)) => Some(value),
                _ => self
                    .element_string(&element, &format!("attribute/{name}"))
                    .await
                    .unwrap_or(None),
            };
            if let Some(value) = value {
                values.push(value);
            }
        }
        Ok(values)
    }

    async fn click(&mut self, css: &str) -> BrowserResult<bool> {
        let Some(element) = self.find(css).await?.into_iter().next() else {
            return Ok(false);
        };
        match self
            .command(Method::POST, &format!("element/{element}/click"), Some(json!({})))
            .await
        {
            Ok(_) => Ok(true),
            Err(BrowserError::Protocol { error, message }) => {
                debug!(css, %error, %message, "Element not clickable");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    async fn close(&mut self) -> BrowserResult<()> {
        let Some(id) = self.session_id.take() else {
            return Ok(());
        };
        self.current_url = None;
        self.send(self.request(Method::DELETE, &format!("/session/{id}")))
            .await?;
        info!(session = %id, "WebDriver session deleted");
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        let Some(id) = self.session_id.take() else {
            return;
        };
        let request = self.request(Method::DELETE, &format!("/session/{id}"));
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(session = %id, "WebDriver session dropped without close; deleting in background");
                handle.spawn(async move {
                    if let Err(e) = request.send().await {
                        warn!(error = %e, "Background session delete failed");
                    }
                });
            }
            Err(_) => warn!(session = %id, "WebDriver session leaked: no runtime to delete it"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(kind: BrowserKind) -> SessionOptions {
        SessionOptions {
            kind,
            headless: true,
            mobile: false,
            window_size: (1920, 1080),
            mobile_device: "iPhone 12 Pro".to_string(),
            page_load_timeout: Duration::from_secs(30),
            implicit_wait: Duration::from_secs(10),
            remote: None,
            platform: None,
        }
    }

    #[test]
    fn test_chrome_capabilities() {
        let caps = capabilities(&options(BrowserKind::Chrome)).unwrap();
        let always = &caps["capabilities"]["alwaysMatch"];
        assert_eq!(always["browserName"], "chrome");

        let args = always["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.contains(&json!("--headless=new")));
        assert!(args.contains(&json!("--window-size=1920,1080")));
        assert!(always["goog:chromeOptions"].get("mobileEmulation").is_none());
    }

    #[test]
    fn test_mobile_emulation() {
        let mut opts = options(BrowserKind::Edge);
        opts.mobile = true;
        opts.headless = false;
        let caps = capabilities(&opts).unwrap();
        let edge = &caps["capabilities"]["alwaysMatch"]["ms:edgeOptions"];
        assert_eq!(edge["mobileEmulation"]["deviceName"], "iPhone 12 Pro");
        assert!(!edge["args"].as_array().unwrap().contains(&json!("--headless=new")));
    }

    #[test]
    fn test_firefox_capabilities() {
        let caps = capabilities(&options(BrowserKind::Firefox)).unwrap();
        let firefox = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"];
        assert_eq!(firefox["args"], json!(["-headless"]));
        assert_eq!(
            firefox["prefs"]["general.useragent.override"],
            FIREFOX_USER_AGENT
        );
    }

    fn remote() -> RemoteOptions {
        RemoteOptions {
            username: "user".to_string(),
            access_key: "key".to_string(),
            project_name: "project".to_string(),
            build_name: "build".to_string(),
            session_name: "session".to_string(),
        }
    }

    #[test]
    fn test_remote_capabilities() {
        let mut opts = options(BrowserKind::Chrome);
        opts.remote = Some(remote());
        let caps = capabilities(&opts).unwrap();
        let bstack = &caps["capabilities"]["alwaysMatch"]["bstack:options"];
        assert_eq!(bstack["userName"], "user");
        assert_eq!(bstack["projectName"], "project");
        assert_eq!(bstack["sessionName"], "session");
    }

    #[test]
    fn test_platform_overrides_browser_kind() {
        let platform = crate::browser::browserstack_presets().remove(4);
        let mut opts = options(BrowserKind::Firefox);
        opts.platform = Some(platform);

        // Without credentials the platform is ignored.
        let local = capabilities(&opts).unwrap();
        assert_eq!(local["capabilities"]["alwaysMatch"]["browserName"], "firefox");

        opts.remote = Some(remote());
        let caps = capabilities(&opts).unwrap();
        let always = &caps["capabilities"]["alwaysMatch"];
        assert_eq!(always["browserName"], "Chrome");
        assert_eq!(always["bstack:options"]["deviceName"], "Samsung Galaxy S23");
        assert!(always.get("moz:firefoxOptions").is_none());
    }

    #[test]
    fn test_session_status_script() {
        let script = session_status_script(false, "No articles were scraped");
        let payload = script.strip_prefix("browserstack_executor: ").unwrap();
        let value: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(value["action"], "setSessionStatus");
        assert_eq!(value["arguments"]["status"], "failed");
        assert_eq!(value["arguments"]["reason"], "No articles were scraped");

        assert!(session_status_script(true, "ok").contains(r#""status":"passed""#));
    }

    #[test]
    fn test_static_is_not_a_webdriver_browser() {
        assert!(matches!(
            capabilities(&options(BrowserKind::Static)),
            Err(BrowserError::Unsupported(BrowserKind::Static))
        ));
    }

    #[test]
    fn test_unwrap_value_success() {
        let body = json!({ "value": { "sessionId": "abc", "capabilities": {} } });
        let value = unwrap_value(true, body).unwrap();
        assert_eq!(value["sessionId"], "abc");

        assert_eq!(unwrap_value(true, json!({ "value": null })).unwrap(), Value::Null);
    }

    #[test]
    fn test_unwrap_value_error() {
        let body = json!({
            "value": { "error": "no such window", "message": "window was closed", "stacktrace": "" }
        });
        match unwrap_value(false, body) {
            Err(BrowserError::Protocol { error, message }) => {
                assert_eq!(error, "no such window");
                assert_eq!(message, "window was closed");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[test]
    fn test_element_ids() {
        let value = json!([
            { "element-6066-11e4-a52e-4f816e6eb8d4": "one" },
            { "unrelated": "x" },
            { "element-6066-11e4-a52e-4f816e6eb8d4": "two" },
        ]);
        assert_eq!(element_ids(&value), vec!["one", "two"]);
        assert!(element_ids(&json!({})).is_empty());
    }
}
