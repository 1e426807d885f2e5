//! Identifier case conversion used by model name-case rules

use crate::{Error, Result};
use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Naming convention of one side of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameCase {
    /// `mainBodyColumnId`
    Camel,
    /// `MainBodyColumnId`
    Pascal,
    /// `main_body_column_id`
    Snake,
    /// `main-body-column-id`
    Midline,
}

impl NameCase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Camel => "Camel",
            Self::Pascal => "Pascal",
            Self::Snake => "Snake",
            Self::Midline => "Midline",
        }
    }
}

impl fmt::Display for NameCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NameCase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Camel" | "camel" => Ok(Self::Camel),
            "Pascal" | "pascal" => Ok(Self::Pascal),
            "Snake" | "snake" => Ok(Self::Snake),
            "Midline" | "midline" | "Kebab" | "kebab" => Ok(Self::Midline),
            other => Err(Error::Configuration {
                message: format!("unknown name case '{}'", other),
            }),
        }
    }
}

/// Convert `name` to the given case. Word boundaries are case changes and any
/// run of `_`/`-` delimiters, so repeated delimiters collapse.
pub fn to_case(case: NameCase, name: &str) -> String {
    match case {
        NameCase::Camel => name.to_lower_camel_case(),
        NameCase::Pascal => name.to_upper_camel_case(),
        NameCase::Snake => name.to_snake_case(),
        NameCase::Midline => name.to_kebab_case(),
    }
}
