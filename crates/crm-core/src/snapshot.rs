use crate::activity::Activity;
use crate::clock::Timestamp;
use crate::contact::{Account, Contact};
use crate::deal::Deal;
use crate::enrollment::{self, ContactSequence, DueItem};
use crate::error::Result;
use crate::sequence::{Sequence, SequenceStep};
use crate::store::RecordStore;
use crate::task::Task;
use crate::types::RecordId;
use serde::{Deserialize, Serialize};

/// Every record one operator can see, loaded in one pass.
///
/// Engine functions run against a snapshot and return mutations; after the
/// caller persists them the snapshot is thrown away and reloaded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub owner: String,
    pub accounts: Vec<Account>,
    pub contacts: Vec<Contact>,
    pub sequences: Vec<Sequence>,
    /// Shared catalog, not filtered by owner.
    pub steps: Vec<SequenceStep>,
    pub enrollments: Vec<ContactSequence>,
    pub deals: Vec<Deal>,
    pub activities: Vec<Activity>,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    pub fn load<S: RecordStore>(store: &S, owner: &str) -> Result<Self> {
        let me = Some(owner);
        Ok(Self {
            owner: owner.to_string(),
            accounts: store.fetch_all(me)?,
            contacts: store.fetch_all(me)?,
            sequences: store.fetch_all(me)?,
            steps: store.fetch_all(None)?,
            enrollments: store.fetch_all(me)?,
            deals: store.fetch_all(me)?,
            activities: store.fetch_all(me)?,
            tasks: store.fetch_all(me)?,
        })
    }

    pub fn contact(&self, id: RecordId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    pub fn account(&self, id: RecordId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    pub fn sequence(&self, id: RecordId) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id == id)
    }

    pub fn enrollment(&self, id: RecordId) -> Option<&ContactSequence> {
        self.enrollments.iter().find(|e| e.id == id)
    }

    pub fn due_steps(&self, now: &Timestamp) -> Vec<DueItem> {
        enrollment::compute_due_steps(&self.enrollments, &self.sequences, &self.steps, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::StepType;

    #[test]
    fn load_scopes_to_owner_but_shares_steps() {
        let mut store = MemoryStore::new();
        let mine = store.insert(Sequence::new("ana", "Mine")).unwrap();
        store.insert(Sequence::new("bo", "Theirs")).unwrap();
        store
            .insert(SequenceStep::new(mine.id, 1, StepType::Email, 0))
            .unwrap();
        store.insert(SequenceStep::new(99, 1, StepType::Call, 0)).unwrap();
        store.insert(Contact::new("bo", "Cy", "D")).unwrap();

        let snap = Snapshot::load(&store, "ana").unwrap();
        assert_eq!(snap.owner, "ana");
        assert_eq!(snap.sequences.len(), 1);
        assert_eq!(snap.sequence(mine.id).map(|s| s.name.as_str()), Some("Mine"));
        assert_eq!(snap.steps.len(), 2);
        assert!(snap.contacts.is_empty());
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let snap = Snapshot {
            owner: "ana".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["owner"], "ana");
        assert!(json["enrollments"].as_array().unwrap().is_empty());
    }
}
