use sea_orm::SqlErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndicatorsError {
    #[error("storage error: {message}")]
    Storage { message: String },
    #[error("validation error: {message}")]
    Validation { message: String },
    #[error("either territory_id or oktmo must be provided")]
    MissingScopeIdentifier,
    #[error("unit with id {unit_id} not found")]
    UnitNotFound { unit_id: i64 },
    #[error("indicator with id {indicator_id} not found")]
    IndicatorNotFound { indicator_id: i64 },
    #[error("duplicate key: {message}")]
    DuplicateKey { message: String },
}

impl IndicatorsError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage { .. } => "storage_error",
            Self::Validation { .. } => "invalid_input",
            Self::MissingScopeIdentifier => "missing_scope_identifier",
            Self::UnitNotFound { .. } => "unit_not_found",
            Self::IndicatorNotFound { .. } => "indicator_not_found",
            Self::DuplicateKey { .. } => "duplicate_key",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnitNotFound { .. } | Self::IndicatorNotFound { .. }
        )
    }

    /// A lost natural-key race; the caller may retry the call as a lookup.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

pub type IndicatorsResult<T> = Result<T, IndicatorsError>;

impl From<sea_orm::DbErr> for IndicatorsError {
    fn from(value: sea_orm::DbErr) -> Self {
        match value.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => {
                IndicatorsError::duplicate_key(message)
            }
            _ => IndicatorsError::storage(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IndicatorsError;

    #[test]
    fn helper_constructors_set_variants() {
        let err = IndicatorsError::storage("disk");
        assert!(matches!(err, IndicatorsError::Storage { .. }));
        let err = IndicatorsError::validation("bad");
        assert!(matches!(err, IndicatorsError::Validation { .. }));
        let err = IndicatorsError::duplicate_key("units.unit_name");
        assert!(matches!(err, IndicatorsError::DuplicateKey { .. }));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            IndicatorsError::MissingScopeIdentifier.code(),
            "missing_scope_identifier"
        );
        assert_eq!(
            IndicatorsError::UnitNotFound { unit_id: 3 }.code(),
            "unit_not_found"
        );
        assert_eq!(
            IndicatorsError::IndicatorNotFound { indicator_id: 3 }.to_string(),
            "indicator with id 3 not found"
        );
    }

    #[test]
    fn only_duplicate_key_is_retriable() {
        assert!(IndicatorsError::duplicate_key("race").is_retriable());
        assert!(!IndicatorsError::storage("disk").is_retriable());
        assert!(!IndicatorsError::MissingScopeIdentifier.is_retriable());
        assert!(IndicatorsError::UnitNotFound { unit_id: 1 }.is_not_found());
    }

    #[test]
    fn db_errors_map_to_storage() {
        let err: IndicatorsError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, IndicatorsError::Storage { .. }));
    }
}
