#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gender recorded on a student profile.
///
/// Stored and serialized with the zh-CN labels the registry uses on its forms.
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")
)]
pub enum Gender {
    #[serde(rename = "男")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "男"))]
    Male,
    #[serde(rename = "女")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "女"))]
    Female,
}

impl Gender {
    pub const ALL: &'static [Gender] = &[Self::Male, Self::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "男",
            Self::Female => "女",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid gender label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGenderError {
    invalid: String,
}

impl fmt::Display for ParseGenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid gender '{}'. Valid values: {}",
            self.invalid,
            Gender::ALL
                .iter()
                .map(|g| g.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseGenderError {}

impl FromStr for Gender {
    type Err = ParseGenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "男" => Ok(Self::Male),
            "女" => Ok(Self::Female),
            other => Err(ParseGenderError {
                invalid: other.to_string(),
            }),
        }
    }
}
