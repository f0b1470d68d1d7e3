use serde::{Deserialize, Serialize};

/// One dimension of a discount rule: either every value or a single one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Scope<T> {
    Any,
    Specific(T),
}

impl<T: PartialEq> Scope<T> {
    pub fn matches(&self, candidate: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Specific(id) => id == candidate,
        }
    }

    /// Anonymous requests only match rules scoped to `Any`.
    pub fn matches_optional(&self, candidate: Option<&T>) -> bool {
        match (self, candidate) {
            (Self::Any, _) => true,
            (Self::Specific(id), Some(candidate)) => id == candidate,
            (Self::Specific(_), None) => false,
        }
    }
}

impl<T> Scope<T> {
    pub fn from_nullable(value: Option<T>) -> Self {
        value.map_or(Self::Any, Self::Specific)
    }

    pub fn as_specific(&self) -> Option<&T> {
        match self {
            Self::Any => None,
            Self::Specific(id) => Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Scope;

    #[test]
    fn any_matches_every_value_including_absent() {
        let scope: Scope<i64> = Scope::Any;
        assert!(scope.matches(&7));
        assert!(scope.matches_optional(None));
    }

    #[test]
    fn specific_matches_only_its_own_value() {
        let scope = Scope::Specific(7_i64);
        assert!(scope.matches(&7));
        assert!(!scope.matches(&8));
        assert!(!scope.matches_optional(None));
    }

    #[test]
    fn nullable_column_maps_to_scope() {
        assert_eq!(Scope::from_nullable(None::<i64>), Scope::Any);
        assert_eq!(Scope::from_nullable(Some(3_i64)), Scope::Specific(3));
        assert_eq!(Scope::Specific(3_i64).as_specific(), Some(&3));
    }
}
