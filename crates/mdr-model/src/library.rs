use crate::{MdrError, Result};

/// Value object for a library: a named partition with an editability flag.
///
/// Libraries (Sponsor, CDISC, ...) are created out of band and are read-only
/// to the versioning engine; every root identity belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Library {
    pub name: String,
    pub is_editable: bool,
}

impl Library {
    pub fn from_repository_values(name: impl Into<String>, is_editable: bool) -> Self {
        Self {
            name: name.into(),
            is_editable,
        }
    }

    /// Builds the value object through the collaborator-owned editability
    /// lookup. Fails when the lookup cannot answer for the given name.
    pub fn from_editability_lookup(
        name: impl Into<String>,
        is_editable: impl Fn(&str) -> Option<bool>,
    ) -> Result<Self> {
        let name = name.into();
        let Some(is_editable) = is_editable(&name) else {
            return Err(MdrError::BusinessLogic(format!(
                "Can't infer if library '{name}' is editable."
            )));
        };
        Ok(Self { name, is_editable })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_must_answer() {
        let lib = Library::from_editability_lookup("Sponsor", |_| Some(true)).expect("lookup");
        assert!(lib.is_editable);

        let err = Library::from_editability_lookup("Ghost", |_| None).unwrap_err();
        assert!(matches!(err, MdrError::BusinessLogic(_)));
    }
}
