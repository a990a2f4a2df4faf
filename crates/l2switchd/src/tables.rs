//! Process-wide learning state: one [`LearningTable`] per attached switch.
//!
//! Tables are created lazily on the first packet-in from a switch and are
//! only dropped when the switch detaches. The map is sharded, so packet-ins
//! from different switches rarely contend; a closure passed to
//! [`ProcessTables::with_table`] runs while holding the switch's entry lock,
//! which makes "get-or-create, learn, look up" atomic per switch.

use crate::learning_table::LearningTable;
use dashmap::DashMap;
use sdn_types::{MacAddress, PortId, SwitchId};

/// Capacity reserved for a table when a switch sends its first packet-in.
const DEFAULT_TABLE_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct ProcessTables {
    tables: DashMap<SwitchId, LearningTable>,
    table_capacity: usize,
}

impl Default for ProcessTables {
    fn default() -> Self {
        Self::with_table_capacity(DEFAULT_TABLE_CAPACITY)
    }
}

impl ProcessTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables created later will pre-allocate room for `capacity` addresses.
    pub fn with_table_capacity(capacity: usize) -> Self {
        Self {
            tables: DashMap::new(),
            table_capacity: capacity,
        }
    }

    /// Runs `f` on the switch's table, creating an empty one first if needed.
    ///
    /// `f` must not call back into this `ProcessTables` for the same switch.
    pub fn with_table<R>(&self, switch: SwitchId, f: impl FnOnce(&mut LearningTable) -> R) -> R {
        let mut table = self
            .tables
            .entry(switch)
            .or_insert_with(|| LearningTable::with_capacity(self.table_capacity));
        f(table.value_mut())
    }

    /// Drops the switch's table. Unknown switches are a no-op.
    pub fn forget(&self, switch: SwitchId) -> Option<LearningTable> {
        self.tables.remove(&switch).map(|(_, table)| table)
    }

    /// Read-only lookup; never creates a table or an entry.
    pub fn lookup(&self, switch: SwitchId, mac: &MacAddress) -> Option<PortId> {
        self.tables.get(&switch).and_then(|table| table.get(mac))
    }

    pub fn contains_switch(&self, switch: SwitchId) -> bool {
        self.tables.contains_key(&switch)
    }

    pub fn switch_count(&self) -> usize {
        self.tables.len()
    }

    /// Number of learned addresses on `switch`, or `None` if it has no table.
    pub fn table_len(&self, switch: SwitchId) -> Option<usize> {
        self.tables.get(&switch).map(|table| table.len())
    }

    pub fn total_entries(&self) -> usize {
        self.tables.iter().map(|table| table.len()).sum()
    }

    /// Runs `f` on every table in turn (used by the aging sweep).
    pub fn for_each_table(&self, mut f: impl FnMut(SwitchId, &mut LearningTable)) {
        for mut table in self.tables.iter_mut() {
            let switch = *table.key();
            f(switch, table.value_mut());
        }
    }
}
