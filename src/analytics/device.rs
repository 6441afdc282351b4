//! User-agent to device class classification

use woothee::parser::Parser;

use crate::models::DeviceClass;

/// Swappable rule set mapping a user-agent string to a device class
pub trait DeviceClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> DeviceClass;
}

/// Platform tokens that mark a handheld device when the parser is undecided
const MOBILE_TOKENS: &[&str] = &[
    "mobile", "android", "iphone", "ipad", "ipod", "windows phone", "blackberry", "opera mini",
];

/// Desktop platform tokens used by the fallback rules
const DESKTOP_TOKENS: &[&str] = &["windows nt", "macintosh", "x11", "cros"];

/// Classifier backed by woothee with a token-based fallback
///
/// Smartphones, feature phones and tablets count as mobile. Crawlers and
/// appliances that carry no platform token are unknown.
pub struct UserAgentClassifier {
    parser: Parser,
}

impl UserAgentClassifier {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }
}

impl Default for UserAgentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClassifier for UserAgentClassifier {
    fn classify(&self, user_agent: &str) -> DeviceClass {
        let user_agent = user_agent.trim();
        if user_agent.is_empty() {
            return DeviceClass::Unknown;
        }

        if let Some(result) = self.parser.parse(user_agent) {
            let category: &str = &result.category;
            match category {
                "smartphone" | "mobilephone" => return DeviceClass::Mobile,
                "pc" => return DeviceClass::Desktop,
                _ => {}
            }
        }

        classify_by_tokens(user_agent)
    }
}

fn classify_by_tokens(user_agent: &str) -> DeviceClass {
    let lower = user_agent.to_ascii_lowercase();
    if MOBILE_TOKENS.iter().any(|token| lower.contains(token)) {
        DeviceClass::Mobile
    } else if DESKTOP_TOKENS.iter().any(|token| lower.contains(token)) {
        DeviceClass::Desktop
    } else {
        DeviceClass::Unknown
    }
}
