// src/fetch/identity.rs
//
// Browser identities for outgoing requests. The User-Agent and the
// client-hint headers must name the same major version or some sources
// refuse the request.

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Chromium major versions we impersonate.
const MIN_MAJOR: u32 = 120;
const MAX_MAJOR: u32 = 131;

/// (User-Agent platform token, `sec-ch-ua-platform` value)
const PLATFORMS: &[(&str, &str)] = &[
    ("Windows NT 10.0; Win64; x64", "\"Windows\""),
    ("Macintosh; Intel Mac OS X 10_15_7", "\"macOS\""),
    ("X11; Linux x86_64", "\"Linux\""),
];

/// Grease brands as Chromium rotates them.
const GREASE: &[(&str, &str)] = &[
    ("Not_A Brand", "8"),
    ("Not/A)Brand", "99"),
    ("Not A(Brand", "24"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Browser {
    Chrome,
    Edge,
}

/// A User-Agent and the matching client hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub major_version: u32,
    pub user_agent: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_platform: String,
}

/// Deterministically derive an identity from `seed`.
pub fn identity_from_seed(seed: u64) -> ClientIdentity {
    let mut rng = StdRng::seed_from_u64(seed);
    let major = rng.gen_range(MIN_MAJOR..=MAX_MAJOR);
    let (os, platform) = PLATFORMS[rng.gen_range(0..PLATFORMS.len())];
    let (grease, grease_v) = GREASE[rng.gen_range(0..GREASE.len())];
    let browser = if rng.gen_bool(0.2) {
        Browser::Edge
    } else {
        Browser::Chrome
    };

    let mut user_agent = format!(
        "Mozilla/5.0 ({os}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{major}.0.0.0 Safari/537.36"
    );
    let brand = match browser {
        Browser::Chrome => "Google Chrome",
        Browser::Edge => {
            user_agent.push_str(&format!(" Edg/{major}.0.0.0"));
            "Microsoft Edge"
        }
    };
    let sec_ch_ua =
        format!("\"Chromium\";v=\"{major}\", \"{brand}\";v=\"{major}\", \"{grease}\";v=\"{grease_v}\"");

    ClientIdentity {
        major_version: major,
        user_agent,
        sec_ch_ua,
        sec_ch_ua_platform: platform.to_string(),
    }
}

/// A fresh identity for one request.
pub fn random_identity() -> ClientIdentity {
    identity_from_seed(rand::random())
}
