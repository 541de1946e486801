//! Helm release detection and decoding
//!
//! Helm ownership is read from workload labels/annotations. Release details
//! come from Helm's storage secrets (`type: helm.sh/release.v1`).

use crate::models::{ResourceKind, ResourceObject};
use crate::watcher::ResourceState;
use base64::Engine;
use std::io::Read;

/// Secret type used by Helm 3 release storage
pub const RELEASE_SECRET_TYPE: &str = "helm.sh/release.v1";

#[derive(Debug, thiserror::Error)]
pub enum HelmDecodeError {
    #[error("secret has no 'release' data")]
    MissingData,

    #[error("failed to decode base64 release data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to decompress gzip release data: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("failed to parse release JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Summary of a decoded Helm release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmReleaseInfo {
    pub name: String,
    pub namespace: String,
    pub revision: i64,
    pub status: String,
    pub chart: String,
    pub chart_version: String,
    pub app_version: String,
}

/// Helm release name of a Helm-managed object
///
/// Classic `heritage=Helm` + `release` labels win over the
/// `app.kubernetes.io/managed-by=Helm` label with the
/// `meta.helm.sh/release-name` annotation.
pub fn release_name(object: &ResourceObject) -> Option<&str> {
    let classic = object
        .label("release")
        .filter(|r| !r.is_empty() && object.label("heritage") == Some("Helm"));
    classic.or_else(|| {
        object
            .annotation("meta.helm.sh/release-name")
            .filter(|r| {
                !r.is_empty() && object.label("app.kubernetes.io/managed-by") == Some("Helm")
            })
    })
}

/// Decode the release stored in a Helm storage secret
///
/// `data.release` holds the API server's base64 of Helm's own base64 text,
/// which in turn wraps optionally gzipped JSON.
pub fn decode_release(secret: &ResourceObject) -> Result<HelmReleaseInfo, HelmDecodeError> {
    let data = secret
        .str_at("/data/release")
        .ok_or(HelmDecodeError::MissingData)?;

    let engine = base64::engine::general_purpose::STANDARD;
    let helm_text = engine.decode(data.trim())?;
    let decoded = engine.decode(helm_text.trim_ascii())?;

    // Check for gzip magic bytes (0x1f, 0x8b, 0x08)
    let is_gzipped =
        decoded.len() >= 3 && decoded[0] == 0x1f && decoded[1] == 0x8b && decoded[2] == 0x08;

    let payload = if is_gzipped {
        let mut decoder = flate2::read::GzDecoder::new(&decoded[..]);
        let mut buf = Vec::new();
        decoder.read_to_end(&mut buf)?;
        buf
    } else {
        decoded
    };

    let release: serde_json::Value = serde_json::from_slice(&payload)?;
    let text = |pointer: &str| {
        release
            .pointer(pointer)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    Ok(HelmReleaseInfo {
        name: text("/name"),
        namespace: text("/namespace"),
        revision: release
            .get("version")
            .and_then(|v| v.as_i64())
            .unwrap_or_default(),
        status: text("/info/status"),
        chart: text("/chart/metadata/name"),
        chart_version: text("/chart/metadata/version"),
        app_version: text("/chart/metadata/appVersion"),
    })
}

/// Newest stored revision of a release, decoded
pub fn latest_release(
    state: &ResourceState,
    name: &str,
    namespace: &str,
) -> Result<Option<HelmReleaseInfo>, HelmDecodeError> {
    let latest = state
        .all(ResourceKind::Secret)
        .filter(|s| {
            s.namespace() == namespace
                && s.secret_type() == RELEASE_SECRET_TYPE
                && s.label("name") == Some(name)
        })
        .max_by_key(|s| {
            s.label("version")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or_default()
        });

    latest.map(decode_release).transpose()
}
