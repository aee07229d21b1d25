//! Record persistence seam.
//!
//! The engine never talks to storage directly. Callers build a snapshot with
//! [`RecordStore::fetch_all`], run pure engine functions over it, then issue
//! the resulting mutations one call at a time. Each call is atomic with
//! respect to other calls on the same root in this process; a sequence of
//! calls is not.

use crate::error::{CrmError, Result};
use crate::paths;
use crate::types::RecordId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Accounts,
    Contacts,
    Sequences,
    SequenceSteps,
    ContactSequences,
    Deals,
    Activities,
    Tasks,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Accounts => "accounts",
            Table::Contacts => "contacts",
            Table::Sequences => "sequences",
            Table::SequenceSteps => "sequence_steps",
            Table::ContactSequences => "contact_sequences",
            Table::Deals => "deals",
            Table::Activities => "activities",
            Table::Tasks => "tasks",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A row in one of the CRM tables.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const TABLE: Table;

    fn id(&self) -> RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Owning user, or `None` for rows in the shared template catalog.
    fn owner(&self) -> Option<&str>;
}

fn visible_to<R: Record>(record: &R, owner: Option<&str>) -> bool {
    match (owner, record.owner()) {
        (None, _) | (_, None) => true,
        (Some(want), Some(have)) => want == have,
    }
}

/// Next id for a table: above every live row and above `issued`, the
/// highest id ever handed out, so ids of deleted rows are never reused.
fn next_id<R: Record>(rows: &[R], issued: RecordId) -> RecordId {
    rows.iter().map(Record::id).max().unwrap_or(0).max(issued) + 1
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

pub trait RecordStore {
    /// All rows of `R`'s table visible to `owner`. `None` returns every row
    /// (team view, shared catalog).
    fn fetch_all<R: Record>(&self, owner: Option<&str>) -> Result<Vec<R>>;

    /// Persist a new row and return it with its assigned id.
    fn insert<R: Record>(&mut self, record: R) -> Result<R>;

    /// Apply `patch` to the row with `id`.
    fn update<R, F>(&mut self, id: RecordId, patch: F) -> Result<()>
    where
        R: Record,
        F: FnOnce(&mut R);

    fn delete<R: Record>(&mut self, id: RecordId) -> Result<()>;

    fn get<R: Record>(&self, id: RecordId) -> Result<R> {
        self.fetch_all::<R>(None)?
            .into_iter()
            .find(|r| r.id() == id)
            .ok_or(CrmError::NotFound {
                table: R::TABLE,
                id,
            })
    }

    /// Delete every row matching `pred`. Returns how many were removed.
    fn delete_where<R, P>(&mut self, mut pred: P) -> Result<usize>
    where
        R: Record,
        P: FnMut(&R) -> bool,
    {
        let doomed: Vec<RecordId> = self
            .fetch_all::<R>(None)?
            .iter()
            .filter(|r| pred(r))
            .map(Record::id)
            .collect();
        for id in &doomed {
            self.delete::<R>(*id)?;
        }
        Ok(doomed.len())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local store. Rows are held as JSON values so one map serves every table.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: HashMap<Table, Vec<serde_json::Value>>,
    issued: HashMap<Table, RecordId>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows<R: Record>(&self) -> Result<Vec<R>> {
        self.tables
            .get(&R::TABLE)
            .map(|rows| {
                rows.iter()
                    .map(|v| serde_json::from_value(v.clone()))
                    .collect::<std::result::Result<Vec<R>, _>>()
            })
            .transpose()
            .map(Option::unwrap_or_default)
            .map_err(|e| CrmError::store(R::TABLE, e))
    }

    fn put_rows<R: Record>(&mut self, rows: &[R]) -> Result<()> {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| CrmError::store(R::TABLE, e))?;
        self.tables.insert(R::TABLE, values);
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn fetch_all<R: Record>(&self, owner: Option<&str>) -> Result<Vec<R>> {
        Ok(self
            .rows::<R>()?
            .into_iter()
            .filter(|r| visible_to(r, owner))
            .collect())
    }

    fn insert<R: Record>(&mut self, mut record: R) -> Result<R> {
        let mut rows = self.rows::<R>()?;
        let issued = self.issued.get(&R::TABLE).copied().unwrap_or(0);
        record.set_id(next_id(&rows, issued));
        rows.push(record.clone());
        self.put_rows(&rows)?;
        self.issued.insert(R::TABLE, record.id());
        Ok(record)
    }

    fn update<R, F>(&mut self, id: RecordId, patch: F) -> Result<()>
    where
        R: Record,
        F: FnOnce(&mut R),
    {
        let mut rows = self.rows::<R>()?;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(CrmError::NotFound {
                table: R::TABLE,
                id,
            })?;
        patch(row);
        self.put_rows(&rows)
    }

    fn delete<R: Record>(&mut self, id: RecordId) -> Result<()> {
        let mut rows = self.rows::<R>()?;
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        if rows.len() == before {
            return Err(CrmError::NotFound {
                table: R::TABLE,
                id,
            });
        }
        self.put_rows(&rows)
    }
}

// ---------------------------------------------------------------------------
// YamlStore
// ---------------------------------------------------------------------------

static WRITE_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// The write lock shared by every `YamlStore` opened on `root` in this process.
fn write_lock_for(root: &Path) -> Arc<Mutex<()>> {
    let key = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let mut locks = WRITE_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}

/// One YAML file per table under `.crm/data/`, rewritten atomically on every
/// mutation. Mutations hold a per-root lock across load, modify and save, so
/// concurrent writers in one process never overwrite each other's rows.
///
/// Issued ids are recorded in `.crm/data/ids.yaml` and never handed out twice.
#[derive(Debug, Clone)]
pub struct YamlStore {
    root: PathBuf,
    writes: Arc<Mutex<()>>,
}

impl YamlStore {
    /// Open the store rooted at `root`. Fails if `crm init` has not run there.
    pub fn open(root: &Path) -> Result<Self> {
        if !paths::crm_dir(root).is_dir() {
            return Err(CrmError::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
            writes: write_lock_for(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load<R: Record>(&self) -> Result<Vec<R>> {
        let path = paths::table_path(&self.root, R::TABLE.as_str());
        let rows = crate::io::read_yaml::<Vec<R>>(&path)
            .map_err(|e| CrmError::store(R::TABLE, e))?;
        Ok(rows.unwrap_or_default())
    }

    fn save<R: Record>(&self, rows: &[R]) -> Result<()> {
        let path = paths::table_path(&self.root, R::TABLE.as_str());
        crate::io::write_yaml(&path, rows).map_err(|e| CrmError::store(R::TABLE, e))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_issued(&self) -> Result<BTreeMap<String, RecordId>> {
        Ok(crate::io::read_yaml(&paths::ids_path(&self.root))?.unwrap_or_default())
    }
}

impl RecordStore for YamlStore {
    fn fetch_all<R: Record>(&self, owner: Option<&str>) -> Result<Vec<R>> {
        Ok(self
            .load::<R>()?
            .into_iter()
            .filter(|r| visible_to(r, owner))
            .collect())
    }

    fn insert<R: Record>(&mut self, mut record: R) -> Result<R> {
        let _guard = self.lock();
        let mut rows = self.load::<R>()?;
        let mut issued = self.load_issued()?;
        let last = issued.get(R::TABLE.as_str()).copied().unwrap_or(0);
        record.set_id(next_id(&rows, last));
        // Claim the id before the row lands; a failed save only skips an id.
        issued.insert(R::TABLE.as_str().to_string(), record.id());
        crate::io::write_yaml(&paths::ids_path(&self.root), &issued)?;
        rows.push(record.clone());
        self.save(&rows)?;
        tracing::debug!(table = %R::TABLE, id = record.id(), "inserted record");
        Ok(record)
    }

    fn update<R, F>(&mut self, id: RecordId, patch: F) -> Result<()>
    where
        R: Record,
        F: FnOnce(&mut R),
    {
        let _guard = self.lock();
        let mut rows = self.load::<R>()?;
        let row = rows
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or(CrmError::NotFound {
                table: R::TABLE,
                id,
            })?;
        patch(row);
        self.save(&rows)?;
        tracing::debug!(table = %R::TABLE, id, "updated record");
        Ok(())
    }

    fn delete<R: Record>(&mut self, id: RecordId) -> Result<()> {
        let _guard = self.lock();
        let mut rows = self.load::<R>()?;
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        if rows.len() == before {
            return Err(CrmError::NotFound {
                table: R::TABLE,
                id,
            });
        }
        self.save(&rows)?;
        tracing::debug!(table = %R::TABLE, id, "deleted record");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Account;
    use crate::sequence::SequenceStep;
    use crate::types::StepType;
    use tempfile::TempDir;

    fn step(sequence_id: RecordId, n: u32) -> SequenceStep {
        SequenceStep::new(sequence_id, n, StepType::Email, 0)
    }

    fn exercise<S: RecordStore>(store: &mut S) {
        let a = store.insert(Account::new("alice", "Acme")).unwrap();
        let b = store.insert(Account::new("bob", "Globex")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        let mine: Vec<Account> = store.fetch_all(Some("alice")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Acme");
        let all: Vec<Account> = store.fetch_all(None).unwrap();
        assert_eq!(all.len(), 2);

        store
            .update::<Account, _>(a.id, |acct| acct.name = "Acme Corp".into())
            .unwrap();
        assert_eq!(store.get::<Account>(a.id).unwrap().name, "Acme Corp");

        store.delete::<Account>(b.id).unwrap();
        assert!(matches!(
            store.get::<Account>(b.id),
            Err(CrmError::NotFound { .. })
        ));
        assert!(store.delete::<Account>(b.id).is_err());

        // Shared catalog rows are visible to every owner.
        store.insert(step(1, 1)).unwrap();
        let steps: Vec<SequenceStep> = store.fetch_all(Some("anyone")).unwrap();
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn memory_store_crud() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn yaml_store_crud() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".crm")).unwrap();
        let mut store = YamlStore::open(dir.path()).unwrap();
        exercise(&mut store);
        assert!(dir.path().join(".crm/data/accounts.yaml").exists());
    }

    #[test]
    fn yaml_store_requires_init() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            YamlStore::open(dir.path()),
            Err(CrmError::NotInitialized)
        ));
    }

    fn ids_are_never_reused<S: RecordStore>(store: &mut S) {
        let a = store.insert(Account::new("alice", "A")).unwrap();
        let b = store.insert(Account::new("alice", "B")).unwrap();
        store.delete::<Account>(a.id).unwrap();
        let c = store.insert(Account::new("alice", "C")).unwrap();
        assert!(c.id > b.id);

        // Deleting the newest row must not free its id either.
        store.delete::<Account>(c.id).unwrap();
        let d = store.insert(Account::new("alice", "D")).unwrap();
        assert!(d.id > c.id);
    }

    #[test]
    fn memory_store_never_reuses_ids() {
        ids_are_never_reused(&mut MemoryStore::new());
    }

    #[test]
    fn yaml_store_never_reuses_ids_across_reopen() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".crm")).unwrap();
        ids_are_never_reused(&mut YamlStore::open(dir.path()).unwrap());

        let mut reopened = YamlStore::open(dir.path()).unwrap();
        let last: Vec<Account> = reopened.fetch_all(None).unwrap();
        let top = last.iter().map(|a| a.id).max().unwrap();
        reopened.delete::<Account>(top).unwrap();
        let next = reopened.insert(Account::new("alice", "E")).unwrap();
        assert!(next.id > top);
    }

    #[test]
    fn yaml_store_concurrent_inserts_keep_every_row() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".crm")).unwrap();
        let root = dir.path().to_path_buf();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let root = root.clone();
                std::thread::spawn(move || {
                    let mut store = YamlStore::open(&root).unwrap();
                    store
                        .insert(Account::new("alice", format!("Acct {i}")))
                        .unwrap()
                        .id
                })
            })
            .collect();
        let mut ids: Vec<RecordId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);

        let rows: Vec<Account> = YamlStore::open(&root).unwrap().fetch_all(None).unwrap();
        assert_eq!(rows.len(), 16);
    }

    #[test]
    fn delete_where_cascades() {
        let mut store = MemoryStore::new();
        store.insert(step(1, 1)).unwrap();
        store.insert(step(1, 2)).unwrap();
        store.insert(step(2, 1)).unwrap();
        let removed = store
            .delete_where::<SequenceStep, _>(|s| s.sequence_id == 1)
            .unwrap();
        assert_eq!(removed, 2);
        let left: Vec<SequenceStep> = store.fetch_all(None).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].sequence_id, 2);
    }

    #[test]
    fn corrupt_table_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".crm/data")).unwrap();
        std::fs::write(dir.path().join(".crm/data/accounts.yaml"), "{{not yaml").unwrap();
        let store = YamlStore::open(dir.path()).unwrap();
        let err = store.fetch_all::<Account>(None).unwrap_err();
        assert!(matches!(
            err,
            CrmError::Store {
                table: Table::Accounts,
                ..
            }
        ));
    }
}
