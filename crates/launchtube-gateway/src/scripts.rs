//! Content-script resolution for matched services.
//!
//! `services/<id>.js` is the unversioned script. Versioned variants are
//! named `services/<id>-<version>.js`; when a caller supplies a version, the
//! highest variant not newer than the request wins, and a request that
//! predates every variant gets the oldest one. Selection never comes up
//! empty while at least one versioned variant exists.

use crate::assets::AssetResolver;
use launchtube_core::version;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

lazy_static! {
    static ref VERSIONED_SCRIPT: Regex =
        Regex::new(r"^(?P<id>.+?)-(?P<version>\d+(?:\.\d+)*)\.js$").expect("static regex");
}

/// Versions available for a service across both asset layers, unordered.
pub fn available_versions(resolver: &AssetResolver, service_id: &str) -> Vec<String> {
    let mut versions: Vec<String> = Vec::new();
    for layer in resolver.layers() {
        let pattern = layer
            .join("services")
            .join(format!("{service_id}-*.js"))
            .to_string_lossy()
            .into_owned();
        let Ok(paths) = glob::glob(&pattern) else {
            continue;
        };
        for path in paths.flatten() {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(found) = parse_versioned(name, service_id) {
                if !versions.contains(&found) {
                    versions.push(found);
                }
            }
        }
    }
    versions
}

fn parse_versioned(file_name: &str, service_id: &str) -> Option<String> {
    let captures = VERSIONED_SCRIPT.captures(file_name)?;
    if captures.name("id")?.as_str() != service_id {
        return None;
    }
    Some(captures.name("version")?.as_str().to_string())
}

/// Resolve the script body to serve for a service, honoring version
/// negotiation when the caller supplied one.
pub fn resolve_script(
    resolver: &AssetResolver,
    service_id: &str,
    requested_version: Option<&str>,
) -> std::io::Result<Option<Arc<Vec<u8>>>> {
    if let Some(requested) = requested_version {
        let versions = available_versions(resolver, service_id);
        if let Some(selected) = version::select(&versions, requested) {
            tracing::debug!(
                "serving {} variant {} for requested {}",
                service_id,
                selected,
                requested
            );
            return resolver.read(&format!("services/{service_id}-{selected}.js"));
        }
    }
    resolver.read(&format!("services/{service_id}.js"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, tempfile::TempDir, AssetResolver) {
        let overrides = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(bundled.path().join("services")).unwrap();
        std::fs::create_dir_all(overrides.path().join("services")).unwrap();
        let resolver = AssetResolver::new(
            overrides.path().to_path_buf(),
            bundled.path().to_path_buf(),
        );
        (overrides, bundled, resolver)
    }

    fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) {
        std::fs::write(dir.path().join("services").join(name), body).unwrap();
    }

    #[test]
    fn test_parse_versioned_handles_hyphenated_ids() {
        assert_eq!(
            parse_versioned("prime-video-1.2.js", "prime-video"),
            Some("1.2".to_string())
        );
        assert_eq!(parse_versioned("prime-video-1.2.js", "prime"), None);
        assert_eq!(parse_versioned("prime-video.js", "prime-video"), None);
    }

    #[test]
    fn test_version_negotiation() {
        let (_overrides, bundled, resolver) = fixture();
        write_script(&bundled, "youtube-1.0.js", "v10");
        write_script(&bundled, "youtube-1.5.js", "v15");
        write_script(&bundled, "youtube-2.0.js", "v20");

        let pick = |req: &str| {
            let content = resolve_script(&resolver, "youtube", Some(req)).unwrap().unwrap();
            String::from_utf8(content.to_vec()).unwrap()
        };
        assert_eq!(pick("1.8"), "v15");
        assert_eq!(pick("0.5"), "v10");
        assert_eq!(pick("2.0"), "v20");
    }

    #[test]
    fn test_no_versioned_variants_falls_back_to_unversioned() {
        let (_overrides, bundled, resolver) = fixture();
        write_script(&bundled, "youtube.js", "plain");

        let content = resolve_script(&resolver, "youtube", Some("1.0")).unwrap().unwrap();
        assert_eq!(&**content, b"plain");
    }

    #[test]
    fn test_override_layer_shadows_versioned_variant() {
        let (overrides, bundled, resolver) = fixture();
        write_script(&bundled, "youtube-1.0.js", "bundled");
        write_script(&overrides, "youtube-1.0.js", "patched");

        let content = resolve_script(&resolver, "youtube", Some("1.0")).unwrap().unwrap();
        assert_eq!(&**content, b"patched");
    }

    #[test]
    fn test_unknown_service_is_none() {
        let (_o, _b, resolver) = fixture();
        assert!(resolve_script(&resolver, "nope", None).unwrap().is_none());
    }
}
