//! Coarse device classification from browser environment strings.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Ios,
    Android,
    Desktop,
}

impl DeviceClass {
    /// iOS and Android attempt deep links; desktop goes straight to the web.
    #[must_use]
    pub fn is_mobile(self) -> bool {
        matches!(self, DeviceClass::Ios | DeviceClass::Android)
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Ios => write!(f, "ios"),
            DeviceClass::Android => write!(f, "android"),
            DeviceClass::Desktop => write!(f, "desktop"),
        }
    }
}

/// Environment signals a browser exposes: `navigator.userAgent`,
/// `navigator.platform`, `navigator.maxTouchPoints`, and whether
/// `window.MSStream` is defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSignals {
    pub user_agent: String,
    pub platform: String,
    pub max_touch_points: u32,
    pub ms_stream: bool,
}

const IOS_MARKERS: [&str; 3] = ["ipad", "iphone", "ipod"];

impl DeviceSignals {
    #[must_use]
    pub fn from_user_agent(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_owned(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn classify(&self) -> DeviceClass {
        let user_agent = self.user_agent.to_lowercase();
        let platform = self.platform.to_lowercase();

        // IE on Windows Phone claims to be an iPhone but exposes MSStream.
        let ms_stream = self.ms_stream || user_agent.contains("msstream");
        let ios_string = IOS_MARKERS
            .iter()
            .any(|m| user_agent.contains(m) || platform.contains(m));
        // iPadOS in desktop mode reports itself as a touch-enabled Mac.
        let ipad_desktop_mode = platform == "macintel" && self.max_touch_points > 1;

        if (ios_string || ipad_desktop_mode) && !ms_stream {
            DeviceClass::Ios
        } else if user_agent.contains("android") {
            DeviceClass::Android
        } else {
            DeviceClass::Desktop
        }
    }
}

/// Classifies a user-agent string on its own.
#[must_use]
pub fn classify_device(user_agent: &str) -> DeviceClass {
    DeviceSignals::from_user_agent(user_agent).classify()
}
