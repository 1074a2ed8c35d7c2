//! Categories and priorities.

use serde::{Deserialize, Serialize};

use nesk_core::{CategoryId, DomainError, DomainResult, Entity, PriorityId};

/// A ticket/KB category. Categories form a tree via `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &CategoryId {
        &self.id
    }
}

/// A ticket priority; lower `level` sorts first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub id: PriorityId,
    pub name: String,
    pub level: u8,
}

impl Entity for Priority {
    type Id = PriorityId;

    fn id(&self) -> &PriorityId {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

impl CategoryInput {
    pub fn validate(&self) -> DomainResult<String> {
        DomainError::require_text("name", &self.name)
    }
}

/// Partial category update. `parent_id: Some(None)` detaches from the parent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<CategoryId>>,
}

impl CategoryPatch {
    pub fn validate(&self, id: CategoryId) -> DomainResult<()> {
        if let Some(name) = &self.name {
            DomainError::require_text("name", name)?;
        }
        if self.parent_id == Some(Some(id)) {
            return Err(DomainError::validation("parent_id cannot reference itself"));
        }
        Ok(())
    }

    pub fn apply(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.trim().to_string();
        }
        if let Some(parent_id) = self.parent_id {
            category.parent_id = parent_id;
        }
    }
}

/// Distinguish an absent field from an explicit `null`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let patch: CategoryPatch = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(patch.parent_id, Some(None));

        let patch: CategoryPatch = serde_json::from_str(r#"{"name":"Billing"}"#).unwrap();
        assert_eq!(patch.parent_id, None);
    }

    #[test]
    fn patch_rejects_self_parent() {
        let id = CategoryId::new();
        let patch = CategoryPatch {
            name: None,
            parent_id: Some(Some(id)),
        };
        assert!(patch.validate(id).is_err());
    }

    #[test]
    fn patch_applies_fields() {
        let mut category = Category {
            id: CategoryId::new(),
            name: "Old".into(),
            parent_id: Some(CategoryId::new()),
        };
        CategoryPatch {
            name: Some(" New ".into()),
            parent_id: Some(None),
        }
        .apply(&mut category);
        assert_eq!(category.name, "New");
        assert_eq!(category.parent_id, None);
    }
}
