//! Arena of value cells and the edges between them.
//!
//! Every state variable and every essential value of every component owns one
//! cell. Edges are recorded as `inputs` (what a cell read during its last
//! evaluation) and mirrored as `subscribers` for invalidation. Recomputation
//! is demand driven: invalidation only flips freshness, and the next read
//! recomputes.

use crate::core::ComponentIdx;
use crate::value::{Value, ValueKind};
use indexmap::IndexSet;
use smallvec::SmallVec;
use std::collections::HashSet;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct CellId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Freshness {
    Stale,
    /// On the evaluation stack; reaching it again is a cycle.
    Resolving,
    Fresh,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellKind {
    /// Index into the owner's state variables.
    StateVar(usize),
    /// Index into the owner's essential values.
    Essential(usize),
}

/// Where one dependency item came from, kept so inverse definitions can be
/// routed back to the cell that produced the item.
#[derive(Clone, Debug, PartialEq)]
pub enum DepSource {
    Cell(CellId),
    /// One element of a list-valued cell (0-based).
    Item(CellId, usize),
    Literal(Value),
}

impl DepSource {
    pub fn cell(&self) -> Option<CellId> {
        match self {
            DepSource::Cell(cell) | DepSource::Item(cell, _) => Some(*cell),
            DepSource::Literal(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct Cell {
    pub owner: ComponentIdx,
    pub kind: CellKind,
    pub value_kind: ValueKind,
    pub freshness: Freshness,
    pub value: Value,
    pub inputs: SmallVec<[CellId; 4]>,
    pub subscribers: IndexSet<CellId>,
    /// Per query, the sources of the items handed to the definition.
    pub sources: Vec<Vec<DepSource>>,
    pub cycle_reported: bool,
}

impl Cell {
    pub fn is_essential(&self) -> bool {
        matches!(self.kind, CellKind::Essential(_))
    }
}

#[derive(Debug, Default)]
pub struct Graph {
    cells: Vec<Cell>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Essential cells start fresh with their initial value; derived cells
    /// start stale.
    pub fn alloc(
        &mut self,
        owner: ComponentIdx,
        kind: CellKind,
        value_kind: ValueKind,
        initial: Option<Value>,
    ) -> CellId {
        let id = CellId(self.cells.len() as u32);
        let (freshness, value) = match initial {
            Some(value) => (Freshness::Fresh, value),
            None => (Freshness::Stale, value_kind.default_value()),
        };
        self.cells.push(Cell {
            owner,
            kind,
            value_kind,
            freshness,
            value,
            inputs: SmallVec::new(),
            subscribers: IndexSet::new(),
            sources: Vec::new(),
            cycle_reported: false,
        });
        id
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0 as usize]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn freshness(&self, id: CellId) -> Freshness {
        self.cell(id).freshness
    }

    pub fn begin(&mut self, id: CellId) {
        self.cell_mut(id).freshness = Freshness::Resolving;
    }

    /// Replace the recorded inputs of `id`, keeping subscriber lists in sync.
    pub fn set_inputs(&mut self, id: CellId, inputs: SmallVec<[CellId; 4]>) {
        let old = std::mem::take(&mut self.cell_mut(id).inputs);
        let kept = inputs.iter().copied().collect::<HashSet<_>>();
        for input in old.iter().filter(|input| !kept.contains(input)) {
            self.cell_mut(*input).subscribers.swap_remove(&id);
        }
        for input in &inputs {
            self.cell_mut(*input).subscribers.insert(id);
        }
        self.cell_mut(id).inputs = inputs;
    }

    /// Store the result of an evaluation. The cell stays stale when one of
    /// the inputs it read was invalidated before the evaluation finished.
    pub fn finish(&mut self, id: CellId, value: Value, inputs: SmallVec<[CellId; 4]>, sources: Vec<Vec<DepSource>>) {
        let stale_input = inputs
            .iter()
            .any(|input| self.cell(*input).freshness == Freshness::Stale);
        self.set_inputs(id, inputs);
        let cell = self.cell_mut(id);
        cell.value = value;
        cell.sources = sources;
        cell.freshness = if stale_input { Freshness::Stale } else { Freshness::Fresh };
    }

    /// Mark everything downstream of `id` stale. Cells currently being
    /// evaluated keep their state, but the walk continues through them.
    /// Returns the number of cells that became stale.
    pub fn invalidate_subscribers(&mut self, id: CellId) -> usize {
        let mut worklist = self.cell(id).subscribers.iter().copied().collect::<Vec<_>>();
        let mut visited = HashSet::new();
        let mut count = 0;
        while let Some(next) = worklist.pop() {
            if !visited.insert(next) {
                continue;
            }
            let cell = self.cell_mut(next);
            match cell.freshness {
                Freshness::Fresh => {
                    cell.freshness = Freshness::Stale;
                    count += 1;
                    worklist.extend(cell.subscribers.iter().copied());
                }
                Freshness::Resolving => worklist.extend(cell.subscribers.iter().copied()),
                Freshness::Stale => {}
            }
        }
        log::trace!("invalidated {count} cells downstream of {id:?}");
        count
    }

    /// Set a cell's value directly and invalidate its subscribers.
    pub fn write(&mut self, id: CellId, value: Value) {
        let cell = self.cell_mut(id);
        cell.value = value;
        cell.freshness = Freshness::Fresh;
        self.invalidate_subscribers(id);
    }

    /// Drop all edges out of a cell that no longer takes part in evaluation.
    pub fn detach(&mut self, id: CellId) {
        self.set_inputs(id, SmallVec::new());
        if !self.cell(id).is_essential() {
            self.cell_mut(id).freshness = Freshness::Stale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn graph_with(count: usize) -> (Graph, Vec<CellId>) {
        let mut graph = Graph::new();
        let ids = (0..count)
            .map(|i| {
                if i == 0 {
                    graph.alloc(ComponentIdx(0), CellKind::Essential(0), ValueKind::Number, Some(Value::Number(1.0)))
                } else {
                    graph.alloc(ComponentIdx(0), CellKind::StateVar(i), ValueKind::Number, None)
                }
            })
            .collect();
        (graph, ids)
    }

    #[test]
    fn set_inputs_keeps_subscribers_in_sync() {
        let (mut graph, ids) = graph_with(3);
        graph.set_inputs(ids[2], smallvec![ids[0], ids[1]]);
        assert!(graph.cell(ids[0]).subscribers.contains(&ids[2]));
        graph.set_inputs(ids[2], smallvec![ids[1]]);
        assert!(graph.cell(ids[0]).subscribers.is_empty());
        assert_eq!(graph.cell(ids[1]).subscribers.len(), 1);
        graph.set_inputs(ids[2], smallvec![ids[1], ids[1]]);
        assert_eq!(graph.cell(ids[1]).subscribers.len(), 1);
    }

    #[test]
    fn write_invalidates_transitively() {
        let (mut graph, ids) = graph_with(4);
        graph.finish(ids[1], Value::Number(2.0), smallvec![ids[0]], Vec::new());
        graph.finish(ids[2], Value::Number(3.0), smallvec![ids[1]], Vec::new());
        graph.finish(ids[3], Value::Number(4.0), SmallVec::new(), Vec::new());
        graph.write(ids[0], Value::Number(5.0));
        assert_eq!(graph.freshness(ids[1]), Freshness::Stale);
        assert_eq!(graph.freshness(ids[2]), Freshness::Stale);
        assert_eq!(graph.freshness(ids[3]), Freshness::Fresh);
    }

    #[test]
    fn invalidation_passes_through_resolving_cells() {
        let (mut graph, ids) = graph_with(3);
        graph.finish(ids[1], Value::Number(2.0), smallvec![ids[0]], Vec::new());
        graph.finish(ids[2], Value::Number(3.0), smallvec![ids[1]], Vec::new());
        assert_eq!(graph.freshness(ids[2]), Freshness::Fresh);
        graph.begin(ids[1]);
        assert_eq!(graph.invalidate_subscribers(ids[0]), 1);
        assert_eq!(graph.freshness(ids[1]), Freshness::Resolving);
        assert_eq!(graph.freshness(ids[2]), Freshness::Stale);
    }

    #[test]
    fn wide_fan_out_rewires_and_invalidates_every_reader() {
        let (mut graph, ids) = graph_with(50_001);
        for reader in &ids[1..] {
            graph.finish(*reader, Value::Number(0.0), smallvec![ids[0]], Vec::new());
        }
        assert_eq!(graph.cell(ids[0]).subscribers.len(), 50_000);
        for reader in &ids[1..] {
            graph.set_inputs(*reader, smallvec![ids[0]]);
        }
        assert_eq!(graph.cell(ids[0]).subscribers.len(), 50_000);
        assert_eq!(graph.invalidate_subscribers(ids[0]), 50_000);
        assert_eq!(graph.freshness(ids[50_000]), Freshness::Stale);
    }

    #[test]
    fn finish_with_stale_input_stays_stale() {
        let (mut graph, ids) = graph_with(3);
        graph.finish(ids[2], Value::Number(1.0), smallvec![ids[1]], Vec::new());
        assert_eq!(graph.freshness(ids[2]), Freshness::Stale);
        graph.detach(ids[2]);
        assert!(graph.cell(ids[1]).subscribers.is_empty());
    }
}
