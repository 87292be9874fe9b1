//! Geographic scope resolution shared by every value read and write path.
//!
//! A caller may name a territory id, an OKTMO code, or both. Exactly one of
//! them addresses the stored rows: OKTMO wins when present, otherwise the
//! territory id. Zero is treated the same as an absent identifier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IndicatorsError, IndicatorsResult};

/// Scope identifiers as supplied by a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequest {
    #[serde(default)]
    pub territory_id: Option<i64>,
    #[serde(default)]
    pub oktmo: Option<i64>,
}

impl ScopeRequest {
    pub fn territory(territory_id: i64) -> Self {
        Self {
            territory_id: Some(territory_id),
            oktmo: None,
        }
    }

    pub fn oktmo(oktmo: i64) -> Self {
        Self {
            territory_id: None,
            oktmo: Some(oktmo),
        }
    }

    pub fn new(territory_id: Option<i64>, oktmo: Option<i64>) -> Self {
        Self {
            territory_id,
            oktmo,
        }
    }

    pub fn resolve(self) -> IndicatorsResult<ResolvedScope> {
        resolve_scope(self.territory_id, self.oktmo)
    }
}

/// The identifier that matches and filters rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScopeKey {
    Territory(i64),
    Oktmo(i64),
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKey::Territory(id) => write!(f, "territory_id={id}"),
            ScopeKey::Oktmo(code) => write!(f, "oktmo={code}"),
        }
    }
}

/// Outcome of resolution: the authoritative key plus the normalised columns
/// to persist on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedScope {
    pub key: ScopeKey,
    pub territory_id: Option<i64>,
    pub oktmo: Option<i64>,
}

fn present(value: Option<i64>) -> Option<i64> {
    value.filter(|value| *value != 0)
}

pub fn resolve_scope(
    territory_id: Option<i64>,
    oktmo: Option<i64>,
) -> IndicatorsResult<ResolvedScope> {
    let territory_id = present(territory_id);
    let oktmo = present(oktmo);
    let key = match (oktmo, territory_id) {
        (Some(code), _) => ScopeKey::Oktmo(code),
        (None, Some(id)) => ScopeKey::Territory(id),
        (None, None) => return Err(IndicatorsError::MissingScopeIdentifier),
    };
    Ok(ResolvedScope {
        key,
        territory_id,
        oktmo,
    })
}
