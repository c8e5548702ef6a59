#![forbid(unsafe_code)]

//! Which endpoint(s) of a dual binding receive propagated updates.

use std::fmt;

use crate::property::Access;

/// Propagation direction of a dual binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BindingDirection {
    /// Source changes flow into the target.
    OneWay,
    /// Target changes flow into the source.
    OneWayToSource,
    /// Changes flow both ways. Target takes the source value on bind.
    #[default]
    TwoWay,
}

impl BindingDirection {
    /// Whether source changes are pushed into the target.
    #[must_use]
    pub const fn to_target(self) -> bool {
        matches!(self, Self::OneWay | Self::TwoWay)
    }

    /// Whether target changes are pushed into the source.
    #[must_use]
    pub const fn to_source(self) -> bool {
        matches!(self, Self::OneWayToSource | Self::TwoWay)
    }

    /// Access the source endpoint must grant for this direction.
    #[must_use]
    pub fn source_access(self) -> Access {
        match self {
            Self::OneWay => Access::READ,
            Self::OneWayToSource => Access::WRITE,
            Self::TwoWay => Access::READ_WRITE,
        }
    }

    /// Access the target endpoint must grant for this direction.
    #[must_use]
    pub fn target_access(self) -> Access {
        match self {
            Self::OneWay => Access::WRITE,
            Self::OneWayToSource => Access::READ,
            Self::TwoWay => Access::READ_WRITE,
        }
    }
}

impl fmt::Display for BindingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneWay => "one-way",
            Self::OneWayToSource => "one-way-to-source",
            Self::TwoWay => "two-way",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_flags() {
        assert!(BindingDirection::OneWay.to_target());
        assert!(!BindingDirection::OneWay.to_source());
        assert!(!BindingDirection::OneWayToSource.to_target());
        assert!(BindingDirection::OneWayToSource.to_source());
        assert!(BindingDirection::TwoWay.to_target());
        assert!(BindingDirection::TwoWay.to_source());
    }

    #[test]
    fn access_requirements() {
        assert_eq!(BindingDirection::OneWay.source_access(), Access::READ);
        assert_eq!(BindingDirection::OneWay.target_access(), Access::WRITE);
        assert_eq!(
            BindingDirection::OneWayToSource.source_access(),
            Access::WRITE
        );
        assert_eq!(
            BindingDirection::TwoWay.target_access(),
            Access::READ | Access::WRITE
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&BindingDirection::OneWayToSource).unwrap();
        assert_eq!(json, "\"one_way_to_source\"");
        let back: BindingDirection = serde_json::from_str("\"two_way\"").unwrap();
        assert_eq!(back, BindingDirection::TwoWay);
    }
}
