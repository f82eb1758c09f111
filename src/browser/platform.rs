//! BrowserStack platforms for parallel runs.
//!
//! A [`Platform`] names a hosted browser and the OS or device it runs on.
//! `--platforms` runs the whole pipeline once per platform, all at the same
//! time, and reports each session's outcome back to BrowserStack.
//!
//! The list comes from the `platforms` key of the settings file and defaults
//! to [`browserstack_presets`]:
//!
//! ```yaml
//! platforms:
//!   - name: Windows 11 - Chrome
//!     browser_name: Chrome
//!     browser_version: latest
//!     os: Windows
//!     os_version: "11"
//!   - name: iPhone 14 - Safari
//!     browser_name: Safari
//!     os_version: "16"
//!     device_name: iPhone 14
//! ```

use super::webdriver::RemoteOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One hosted browser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Platform {
    /// Label used in logs and the summary.
    pub name: String,
    pub browser_name: String,
    /// Desktop browsers only; real devices ship a fixed browser.
    #[serde(default)]
    pub browser_version: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    pub os_version: String,
    /// Set for real mobile devices.
    #[serde(default)]
    pub device_name: Option<String>,
}

impl Platform {
    pub fn is_mobile(&self) -> bool {
        self.device_name.is_some()
    }

    /// Session name shown on the BrowserStack dashboard.
    pub fn session_name(&self) -> String {
        let form = if self.is_mobile() { "Mobile" } else { "Desktop" };
        format!("{form} - {}", self.name)
    }

    /// `POST /session` payload for this platform.
    pub fn capabilities(&self, remote: &RemoteOptions) -> Value {
        let mut bstack = json!({
            "userName": remote.username,
            "accessKey": remote.access_key,
            "projectName": remote.project_name,
            "buildName": remote.build_name,
            "sessionName": remote.session_name,
            "osVersion": self.os_version,
        });
        if let Some(os) = &self.os {
            bstack["os"] = json!(os);
        }
        if let Some(device) = &self.device_name {
            bstack["deviceName"] = json!(device);
        }

        let mut always_match = json!({
            "browserName": self.browser_name,
            "bstack:options": bstack,
        });
        if let Some(version) = &self.browser_version {
            always_match["browserVersion"] = json!(version);
        }
        json!({ "capabilities": { "alwaysMatch": always_match } })
    }
}

fn desktop(name: &str, browser: &str, os: &str, os_version: &str) -> Platform {
    Platform {
        name: name.to_string(),
        browser_name: browser.to_string(),
        browser_version: Some("latest".to_string()),
        os: Some(os.to_string()),
        os_version: os_version.to_string(),
        device_name: None,
    }
}

fn device(name: &str, browser: &str, device: &str, os_version: &str) -> Platform {
    Platform {
        name: name.to_string(),
        browser_name: browser.to_string(),
        browser_version: None,
        os: None,
        os_version: os_version.to_string(),
        device_name: Some(device.to_string()),
    }
}

/// Three desktop browsers and two real phones.
pub fn browserstack_presets() -> Vec<Platform> {
    vec![
        desktop("Windows 11 - Chrome", "Chrome", "Windows", "11"),
        desktop("macOS Ventura - Safari", "Safari", "OS X", "Ventura"),
        desktop("Windows 10 - Edge", "Edge", "Windows", "10"),
        device("iPhone 14 - Safari", "Safari", "iPhone 14", "16"),
        device("Samsung Galaxy S23 - Chrome", "Chrome", "Samsung Galaxy S23", "13.0"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> RemoteOptions {
        RemoteOptions {
            username: "user".to_string(),
            access_key: "key".to_string(),
            project_name: "project".to_string(),
            build_name: "build".to_string(),
            session_name: "Mobile - iPhone 14 - Safari".to_string(),
        }
    }

    #[test]
    fn test_presets() {
        let presets = browserstack_presets();
        assert_eq!(presets.len(), 5);
        assert_eq!(presets.iter().filter(|p| p.is_mobile()).count(), 2);
        assert_eq!(presets[0].session_name(), "Desktop - Windows 11 - Chrome");
        assert_eq!(presets[3].session_name(), "Mobile - iPhone 14 - Safari");
    }

    #[test]
    fn test_desktop_capabilities() {
        let caps = browserstack_presets()[1].capabilities(&remote());
        let always = &caps["capabilities"]["alwaysMatch"];
        assert_eq!(always["browserName"], "Safari");
        assert_eq!(always["browserVersion"], "latest");
        assert_eq!(always["bstack:options"]["os"], "OS X");
        assert_eq!(always["bstack:options"]["osVersion"], "Ventura");
        assert_eq!(always["bstack:options"]["projectName"], "project");
        assert!(always["bstack:options"].get("deviceName").is_none());
    }

    #[test]
    fn test_device_capabilities() {
        let caps = browserstack_presets()[3].capabilities(&remote());
        let always = &caps["capabilities"]["alwaysMatch"];
        assert!(always.get("browserVersion").is_none());
        assert_eq!(always["bstack:options"]["deviceName"], "iPhone 14");
        assert_eq!(always["bstack:options"]["osVersion"], "16");
        assert!(always["bstack:options"].get("os").is_none());
        assert_eq!(
            always["bstack:options"]["sessionName"],
            "Mobile - iPhone 14 - Safari"
        );
    }

    #[test]
    fn test_platforms_from_yaml() {
        let yaml = r#"
- name: Pixel
  browser_name: Chrome
  os_version: "14.0"
  device_name: Google Pixel 8
"#;
        let platforms: Vec<Platform> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(platforms.len(), 1);
        assert!(platforms[0].is_mobile());
        assert_eq!(platforms[0].browser_version, None);
    }
}
