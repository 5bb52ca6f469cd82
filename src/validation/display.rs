//! Shop-floor labels for stored codes.

use thiserror::Error;

/// A stored code that has no label, e.g. a `cat_state` of 7.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownEnumValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownEnumValue {
    pub fn new(kind: &'static str, value: impl ToString) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

pub const FEMALE_LABEL: &str = "♀";
pub const MALE_LABEL: &str = "♂";

/// Cats store gender as a flag where `true` means female.
pub fn gender_label(female: bool) -> &'static str {
    if female {
        FEMALE_LABEL
    } else {
        MALE_LABEL
    }
}

pub const ADMIN_ROLE: &str = "admin";
pub const SALESMAN_ROLE: &str = "salesman";

pub fn role_label(role: &str) -> Result<&'static str, UnknownEnumValue> {
    match role {
        ADMIN_ROLE => Ok("管理员"),
        SALESMAN_ROLE => Ok("销售员"),
        other => Err(UnknownEnumValue::new("role", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn gender_flag_is_female_when_set() {
        assert_eq!(gender_label(true), FEMALE_LABEL);
        assert_eq!(gender_label(false), MALE_LABEL);
    }

    #[test]
    fn roles_have_labels() {
        assert_eq!(role_label(ADMIN_ROLE).unwrap(), "管理员");
        assert_eq!(role_label(SALESMAN_ROLE).unwrap(), "销售员");
        let err = role_label("janitor").unwrap_err();
        assert_matches!(err, UnknownEnumValue { kind: "role", .. });
        assert_eq!(err.to_string(), "unknown role value: janitor");
    }
}
