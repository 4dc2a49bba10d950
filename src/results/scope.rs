//! Scope filtering over result sections.

use crate::model::types::SectionKey;

/// Presentation-layer filter selecting every section or exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeSelection {
    #[default]
    All,
    Section(SectionKey),
}

impl ScopeSelection {
    pub fn is_all(&self) -> bool {
        matches!(self, ScopeSelection::All)
    }

    /// The selected section, when the scope is narrowed to one.
    pub fn section(&self) -> Option<&SectionKey> {
        match self {
            ScopeSelection::All => None,
            ScopeSelection::Section(key) => Some(key),
        }
    }

    /// Whether `section` passes this filter.
    pub fn admits(&self, section: &SectionKey) -> bool {
        match self {
            ScopeSelection::All => true,
            ScopeSelection::Section(key) => key == section,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_admits_everything() {
        assert!(ScopeSelection::All.admits(&SectionKey::from("article")));
        assert!(ScopeSelection::All.section().is_none());
    }

    #[test]
    fn narrowed_scope_admits_only_its_section() {
        let scope = ScopeSelection::Section(SectionKey::from("page"));
        assert!(scope.admits(&SectionKey::from("page")));
        assert!(!scope.admits(&SectionKey::from("article")));
        assert_eq!(scope.section(), Some(&SectionKey::from("page")));
    }
}
