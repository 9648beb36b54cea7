use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::lookup::{CategoryLookup, VenueLookup};
use crate::models::{CategoryDocument, EventRecord, OrderRecord, VenueDocument};

/// Everything the views read, as of one fetch.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub events: Vec<EventRecord>,
    pub venues: Vec<VenueDocument>,
    pub categories: Vec<CategoryDocument>,
    pub orders: Vec<OrderRecord>,
}

impl Snapshot {
    pub fn venue_lookup(&self) -> VenueLookup {
        VenueLookup::from_documents(&self.venues)
    }

    pub fn category_lookup(&self) -> CategoryLookup {
        CategoryLookup::from_documents(&self.categories)
    }
}

pub trait SnapshotProvider {
    /// `organizer` narrows events to one organizer and orders to those
    /// events.
    fn fetch_snapshot(&self, organizer: Option<&str>) -> Result<Snapshot, StoreError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Default)]
struct CellState {
    issued: u64,
    installed: u64,
    current: Option<Arc<Snapshot>>,
}

/// Latest snapshot, guarded so a fetch that started earlier can never
/// replace data from one that started later.
#[derive(Default)]
pub struct SnapshotCell {
    state: Mutex<CellState>,
}

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_fetch(&self) -> FetchTicket {
        let mut guard = self.state.lock().expect("snapshot mutex poisoned");
        guard.issued += 1;
        FetchTicket(guard.issued)
    }

    /// Returns whether the snapshot was installed.
    pub fn install(&self, ticket: FetchTicket, snapshot: Snapshot) -> bool {
        let mut guard = self.state.lock().expect("snapshot mutex poisoned");
        if ticket.0 <= guard.installed {
            tracing::debug!(
                ticket = ticket.0,
                installed = guard.installed,
                "dropping stale snapshot"
            );
            return false;
        }
        guard.installed = ticket.0;
        guard.current = Some(Arc::new(snapshot));
        true
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.state
            .lock()
            .expect("snapshot mutex poisoned")
            .current
            .clone()
    }

    /// Fetch from `provider` and install the result if nothing newer landed
    /// meanwhile.
    pub fn refresh<P: SnapshotProvider + ?Sized>(
        &self,
        provider: &P,
        organizer: Option<&str>,
    ) -> Result<bool, StoreError> {
        let ticket = self.begin_fetch();
        let snapshot = provider.fetch_snapshot(organizer)?;
        Ok(self.install(ticket, snapshot))
    }
}
