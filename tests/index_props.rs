//! Property tests pitting every index query against a brute-force linear
//! scan over the column's current values, across arbitrary interleavings of
//! cell mutations and row deletions.

use proptest::prelude::*;
use tabula::{DataType, RangeFlags, Table, Tuple};

#[derive(Debug, Clone)]
enum Op {
    /// Overwrite a (still live) row's value.
    Set(usize, i32),
    /// Delete a (still live) row.
    Delete(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), -50i32..50).prop_map(|(row, v)| Op::Set(row, v)),
        1 => any::<usize>().prop_map(Op::Delete),
    ]
}

/// Shadow model entry: (key, insertion sequence, row).
#[derive(Debug, Clone)]
struct Entry {
    key: i32,
    seq: u64,
    row: usize,
}

struct Harness {
    table: Table,
    tuples: Vec<Tuple>,
    model: Vec<Entry>,
    next_seq: u64,
    /// A deletion forces a rebuild, which re-enters surviving rows in row
    /// order; ties among equal keys then follow row order, not history.
    rebuilt: bool,
}

impl Harness {
    fn new(values: &[i32]) -> Self {
        let mut table = Table::new();
        table.add_column("k", DataType::Int).unwrap();
        table.create_index("k").unwrap();
        let tuples = table.add_rows(values.len());
        let mut model = Vec::new();
        let mut next_seq = 0u64;
        for (tuple, value) in tuples.iter().zip(values) {
            table.set_int(*tuple, "k", *value).unwrap();
            model.push(Entry {
                key: *value,
                seq: next_seq,
                row: tuple.row(),
            });
            next_seq += 1;
        }
        // force the initial build so later Sets are incremental patches
        table.index("k").unwrap();
        Self {
            table,
            tuples,
            model,
            next_seq,
            rebuilt: false,
        }
    }

    fn live_rows(&self) -> Vec<usize> {
        (0..self.tuples.len())
            .filter(|i| self.table.is_valid(self.tuples[*i]))
            .collect()
    }

    fn apply(&mut self, op: &Op) {
        let live = self.live_rows();
        if live.is_empty() {
            return;
        }
        match op {
            Op::Set(pick, value) => {
                let slot = live[pick % live.len()];
                let old = self.table.get_int(self.tuples[slot], "k").unwrap();
                if old == *value {
                    // a suppressed no-op write patches nothing
                    return;
                }
                self.table.set_int(self.tuples[slot], "k", *value).unwrap();
                self.model.retain(|e| e.row != slot);
                self.model.push(Entry {
                    key: *value,
                    seq: self.next_seq,
                    row: slot,
                });
                self.next_seq += 1;
            }
            Op::Delete(pick) => {
                let slot = live[pick % live.len()];
                self.table.delete_row(self.tuples[slot]).unwrap();
                self.model.retain(|e| e.row != slot);
                self.rebuilt = true;
            }
        }
    }

    /// Entries in the order the index must produce them ascending.
    fn expected_ascending(&self) -> Vec<Entry> {
        let mut entries = self.model.clone();
        if self.rebuilt {
            entries.sort_by(|a, b| a.key.cmp(&b.key).then(a.row.cmp(&b.row)));
        } else {
            entries.sort_by(|a, b| a.key.cmp(&b.key).then(a.seq.cmp(&b.seq)));
        }
        entries
    }
}

proptest! {
    #[test]
    fn index_queries_match_linear_scan(
        values in proptest::collection::vec(-50i32..50, 1..32),
        ops in proptest::collection::vec(op_strategy(), 0..24),
        lo in -60i32..60,
        hi in -60i32..60,
        ascending in any::<bool>(),
        left_inclusive in any::<bool>(),
        right_inclusive in any::<bool>(),
    ) {
        let mut harness = Harness::new(&values);
        for op in &ops {
            harness.apply(op);
        }

        let expected = harness.expected_ascending();
        let flags = RangeFlags {
            ascending,
            left_inclusive,
            right_inclusive,
        };

        let index = harness.table.index("k").unwrap();

        // range query against the brute-force filter of the shadow model
        let mut wanted: Vec<usize> = expected
            .iter()
            .filter(|e| {
                let lo_ok = if left_inclusive { e.key >= lo } else { e.key > lo };
                let hi_ok = if right_inclusive { e.key <= hi } else { e.key < hi };
                lo_ok && hi_ok
            })
            .map(|e| e.row)
            .collect();
        if !ascending {
            wanted.reverse();
        }
        let got: Vec<usize> = index.rows_int(lo, hi, flags).unwrap().collect();
        prop_assert_eq!(got, wanted);

        // extremes, median, and cardinalities against the same model
        prop_assert_eq!(index.size(), expected.len());
        prop_assert_eq!(index.minimum(), expected.first().map(|e| e.row));
        prop_assert_eq!(index.maximum(), expected.last().map(|e| e.row));
        prop_assert_eq!(
            index.median(),
            if expected.is_empty() {
                None
            } else {
                Some(expected[expected.len() / 2].row)
            }
        );
        let mut keys: Vec<i32> = expected.iter().map(|e| e.key).collect();
        keys.dedup();
        prop_assert_eq!(index.unique_count(), keys.len());
    }

    #[test]
    fn bool_index_matches_linear_scan(
        values in proptest::collection::vec(any::<bool>(), 1..48),
        flips in proptest::collection::vec((any::<usize>(), any::<bool>()), 0..16),
    ) {
        let mut table = Table::new();
        table.add_column("b", DataType::Bool).unwrap();
        table.create_index("b").unwrap();
        let tuples = table.add_rows(values.len());
        let mut current = values.clone();
        for (tuple, value) in tuples.iter().zip(&values) {
            table.set_bool(*tuple, "b", *value).unwrap();
        }
        table.index("b").unwrap();
        for (pick, value) in &flips {
            let row = pick % current.len();
            table.set_bool(tuples[row], "b", *value).unwrap();
            current[row] = *value;
        }

        // the bitset index orders equal keys by row number
        let mut wanted: Vec<usize> = (0..current.len()).filter(|r| !current[*r]).collect();
        wanted.extend((0..current.len()).filter(|r| current[*r]));

        let index = table.index("b").unwrap();
        let got: Vec<usize> = index.all(true).collect();
        prop_assert_eq!(got, wanted);

        let trues = current.iter().filter(|b| **b).count();
        let falses = current.len() - trues;
        prop_assert_eq!(
            index.unique_count(),
            usize::from(trues > 0) + usize::from(falses > 0)
        );
        prop_assert_eq!(
            index.rows_bool(true).unwrap().count(),
            trues
        );
    }
}
