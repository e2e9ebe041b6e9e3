use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Body of the change-detection endpoint.
///
/// Only `changes_detected` is required. Known metadata is typed; anything else
/// the server sends is kept in `extra` and handed to callbacks untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChangeReport {
    pub changes_detected: bool,
    #[serde(default)]
    pub changed_files: Vec<String>,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_check: Option<DateTime<FixedOffset>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChangeReport {
    pub fn unchanged() -> Self {
        Self {
            changes_detected: false,
            changed_files: Vec::new(),
            total_files: None,
            last_check: None,
            extra: Map::new(),
        }
    }

    pub fn changed(files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            changes_detected: true,
            changed_files: files.into_iter().map(Into::into).collect(),
            ..Self::unchanged()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ClaimCounts {
    pub total_claims: u64,
    pub total_claim_details: u64,
}

/// Body of the reload endpoint.
///
/// A successful reload always carries both totals; a body claiming success
/// without them is rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawReloadResult")]
pub struct ReloadResult {
    pub success: bool,
    pub counts: Option<ClaimCounts>,
    pub message: Option<String>,
    pub reloaded_at: Option<DateTime<FixedOffset>>,
}

impl ReloadResult {
    pub fn succeeded(counts: ClaimCounts) -> Self {
        Self {
            success: true,
            counts: Some(counts),
            message: None,
            reloaded_at: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            counts: None,
            message: Some(message.into()),
            reloaded_at: None,
        }
    }
}

#[derive(Deserialize)]
struct RawReloadResult {
    success: bool,
    #[serde(default)]
    total_claims: Option<u64>,
    #[serde(default)]
    total_claim_details: Option<u64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    reloaded_at: Option<DateTime<FixedOffset>>,
}

impl TryFrom<RawReloadResult> for ReloadResult {
    type Error = String;

    fn try_from(raw: RawReloadResult) -> Result<Self, Self::Error> {
        let counts = match (raw.total_claims, raw.total_claim_details) {
            (Some(total_claims), Some(total_claim_details)) => Some(ClaimCounts {
                total_claims,
                total_claim_details,
            }),
            _ if raw.success => {
                return Err("successful reload without total_claims/total_claim_details".into())
            }
            _ => None,
        };
        Ok(Self {
            success: raw.success,
            counts,
            message: raw.message,
            reloaded_at: raw.reloaded_at,
        })
    }
}

// Servers running without timezone support emit naive timestamps; those are
// dropped rather than failing the whole body.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|text| DateTime::parse_from_rfc3339(&text).ok()))
}
