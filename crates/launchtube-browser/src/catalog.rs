//! Static catalog of supported browsers and PATH-based detection.

use std::path::PathBuf;

/// One supported browser: display name, executable looked up on PATH, and
/// the flag that puts it into fullscreen/kiosk presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserInfo {
    pub name: &'static str,
    pub executable: &'static str,
    pub fullscreen_flag: &'static str,
}

/// Catalog order decides launch preference. The same name may appear more
/// than once for platform-specific executables; the first resolvable entry
/// per name wins.
pub const CATALOG: &[BrowserInfo] = &[
    BrowserInfo {
        name: "chrome",
        executable: "google-chrome",
        fullscreen_flag: "--start-fullscreen",
    },
    BrowserInfo {
        name: "chrome",
        executable: "google-chrome-stable",
        fullscreen_flag: "--start-fullscreen",
    },
    BrowserInfo {
        name: "chrome",
        executable: "chrome",
        fullscreen_flag: "--start-fullscreen",
    },
    BrowserInfo {
        name: "chromium",
        executable: "chromium",
        fullscreen_flag: "--start-fullscreen",
    },
    BrowserInfo {
        name: "chromium",
        executable: "chromium-browser",
        fullscreen_flag: "--start-fullscreen",
    },
    BrowserInfo {
        name: "brave",
        executable: "brave-browser",
        fullscreen_flag: "--start-fullscreen",
    },
    BrowserInfo {
        name: "edge",
        executable: "microsoft-edge",
        fullscreen_flag: "--start-fullscreen",
    },
    BrowserInfo {
        name: "vivaldi",
        executable: "vivaldi",
        fullscreen_flag: "--start-fullscreen",
    },
];

/// A catalog entry whose executable resolved on PATH.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBrowser {
    pub info: BrowserInfo,
    pub path: PathBuf,
}

/// All resolvable browsers, in catalog order, one entry per name.
pub fn detect_browsers() -> Vec<DetectedBrowser> {
    let mut found = Vec::new();
    for info in CATALOG {
        if found
            .iter()
            .any(|d: &DetectedBrowser| d.info.name == info.name)
        {
            continue;
        }
        if let Ok(path) = which::which(info.executable) {
            found.push(DetectedBrowser {
                info: info.clone(),
                path,
            });
        }
    }
    found
}

/// Resolve a browser by name, falling back to the first detected browser
/// when the name is unknown or not installed.
pub fn resolve_browser(name: Option<&str>) -> Option<DetectedBrowser> {
    let detected = detect_browsers();
    if let Some(name) = name {
        if let Some(found) = detected.iter().find(|d| d.info.name == name) {
            return Some(found.clone());
        }
        tracing::debug!("browser {:?} not available, falling back", name);
    }
    detected.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_no_empty_fields() {
        for info in CATALOG {
            assert!(!info.name.is_empty());
            assert!(!info.executable.is_empty());
            assert!(!info.fullscreen_flag.is_empty());
        }
    }

    #[test]
    fn test_detection_yields_one_entry_per_name() {
        let detected = detect_browsers();
        let mut names: Vec<&str> = detected.iter().map(|d| d.info.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), detected.len());
    }

    #[test]
    fn test_unknown_name_falls_back_to_first_detected() {
        let detected = detect_browsers();
        let resolved = resolve_browser(Some("netscape-navigator"));
        assert_eq!(resolved, detected.into_iter().next());
    }
}
