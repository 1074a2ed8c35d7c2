//! Generic keyed table: the data-layer interface and its in-memory backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use nesk_core::Entity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD over one entity type, keyed by the entity id.
pub trait Table<V: Entity>: Send + Sync {
    fn get(&self, id: &V::Id) -> StoreResult<Option<V>>;

    fn insert(&self, value: V) -> StoreResult<()>;

    /// Mutate one row under the write lock. The closure sees the current
    /// row, and its changes are written back only if it returns `Ok`.
    /// Returns `Ok(None)` when the row does not exist.
    fn modify<R, E, F>(&self, id: &V::Id, f: F) -> Result<Option<R>, E>
    where
        F: FnOnce(&mut V) -> Result<R, E>,
        E: From<StoreError>;

    fn remove(&self, id: &V::Id) -> StoreResult<Option<V>>;

    fn list(&self) -> StoreResult<Vec<V>>;

    fn find<P>(&self, predicate: P) -> StoreResult<Vec<V>>
    where
        P: Fn(&V) -> bool;
}

/// In-memory table for tests/dev.
#[derive(Debug)]
pub struct InMemoryTable<V: Entity> {
    name: &'static str,
    rows: RwLock<HashMap<V::Id, V>>,
}

impl<V: Entity> InMemoryTable<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<V::Id, V>>> {
        self.rows.read().map_err(|_| self.poisoned())
    }

    pub(crate) fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<V::Id, V>>> {
        self.rows.write().map_err(|_| self.poisoned())
    }

    fn poisoned(&self) -> StoreError {
        StoreError::Unavailable(format!("{} table lock poisoned", self.name))
    }
}

impl<V> Table<V> for InMemoryTable<V>
where
    V: Entity + Clone + Send + Sync,
{
    fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn insert(&self, value: V) -> StoreResult<()> {
        let mut rows = self.write()?;
        let id = *value.id();
        if rows.contains_key(&id) {
            return Err(StoreError::Conflict(format!("{} already exists", self.name)));
        }
        rows.insert(id, value);
        Ok(())
    }

    fn modify<R, E, F>(&self, id: &V::Id, f: F) -> Result<Option<R>, E>
    where
        F: FnOnce(&mut V) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut rows = self.write()?;
        let Some(current) = rows.get(id) else {
            return Ok(None);
        };

        let mut draft = current.clone();
        let out = f(&mut draft)?;
        rows.insert(*id, draft);
        Ok(Some(out))
    }

    fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
        Ok(self.write()?.remove(id))
    }

    fn list(&self) -> StoreResult<Vec<V>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn find<P>(&self, predicate: P) -> StoreResult<Vec<V>>
    where
        P: Fn(&V) -> bool,
    {
        Ok(self
            .read()?
            .values()
            .filter(|v| predicate(*v))
            .cloned()
            .collect())
    }
}

impl<V, T> Table<V> for Arc<T>
where
    V: Entity,
    T: Table<V> + ?Sized,
{
    fn get(&self, id: &V::Id) -> StoreResult<Option<V>> {
        (**self).get(id)
    }

    fn insert(&self, value: V) -> StoreResult<()> {
        (**self).insert(value)
    }

    fn modify<R, E, F>(&self, id: &V::Id, f: F) -> Result<Option<R>, E>
    where
        F: FnOnce(&mut V) -> Result<R, E>,
        E: From<StoreError>,
    {
        (**self).modify(id, f)
    }

    fn remove(&self, id: &V::Id) -> StoreResult<Option<V>> {
        (**self).remove(id)
    }

    fn list(&self) -> StoreResult<Vec<V>> {
        (**self).list()
    }

    fn find<P>(&self, predicate: P) -> StoreResult<Vec<V>>
    where
        P: Fn(&V) -> bool,
    {
        (**self).find(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nesk_core::CategoryId;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: CategoryId,
        name: String,
    }

    impl Entity for Row {
        type Id = CategoryId;

        fn id(&self) -> &CategoryId {
            &self.id
        }
    }

    fn row(name: &str) -> Row {
        Row {
            id: CategoryId::new(),
            name: name.into(),
        }
    }

    #[test]
    fn insert_get_remove() {
        let table = InMemoryTable::new("rows");
        let r = row("a");
        table.insert(r.clone()).unwrap();

        assert_eq!(table.get(&r.id).unwrap(), Some(r.clone()));
        assert!(matches!(table.insert(r.clone()), Err(StoreError::Conflict(_))));
        assert_eq!(table.remove(&r.id).unwrap(), Some(r.clone()));
        assert_eq!(table.get(&r.id).unwrap(), None);
    }

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Denied,
        Store(StoreError),
    }

    impl From<StoreError> for TestError {
        fn from(err: StoreError) -> Self {
            TestError::Store(err)
        }
    }

    #[test]
    fn failed_modify_leaves_row_untouched() {
        let table = InMemoryTable::new("rows");
        let r = row("before");
        table.insert(r.clone()).unwrap();

        let out: Result<Option<()>, TestError> = table.modify(&r.id, |row| {
            row.name = "after".into();
            Err(TestError::Denied)
        });

        assert_eq!(out, Err(TestError::Denied));
        assert_eq!(table.get(&r.id).unwrap().unwrap().name, "before");
    }

    #[test]
    fn modify_missing_row_is_none() {
        let table: InMemoryTable<Row> = InMemoryTable::new("rows");
        let out: Result<Option<()>, StoreError> = table.modify(&CategoryId::new(), |_| Ok(()));
        assert_eq!(out, Ok(None));
    }

    #[test]
    fn find_filters_rows() {
        let table = InMemoryTable::new("rows");
        table.insert(row("alpha")).unwrap();
        table.insert(row("beta")).unwrap();

        let hits = table.find(|r: &Row| r.name.starts_with('a')).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "alpha");
    }
}
