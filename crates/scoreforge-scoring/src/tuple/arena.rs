//! Generation-checked storage for live tuples.

use super::{Row, Tuple, TupleId, TupleState};
use crate::error::{EngineError, Result};

struct Entry {
    generation: u32,
    tuple: Option<Tuple>,
}

/// Owns every live tuple of a session.
///
/// Freed entries are reused; the generation in a [`TupleId`] makes stale
/// ids fail loudly instead of reaching a recycled tuple.
#[derive(Default)]
pub(crate) struct TupleArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    live: usize,
}

impl TupleArena {
    pub fn allocate(&mut self, values: Row, store_size: usize) -> TupleId {
        let tuple = Tuple::new(values, store_size);
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.tuple = Some(tuple);
                TupleId {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                self.entries.push(Entry {
                    generation: 0,
                    tuple: Some(tuple),
                });
                TupleId {
                    index: (self.entries.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    pub fn get(&self, id: TupleId) -> Result<&Tuple> {
        self.entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.tuple.as_ref())
            .ok_or_else(|| stale(id))
    }

    pub fn get_mut(&mut self, id: TupleId) -> Result<&mut Tuple> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.tuple.as_mut())
            .ok_or_else(|| stale(id))
    }

    pub fn free(&mut self, id: TupleId) -> Result<Tuple> {
        let entry = self
            .entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .ok_or_else(|| stale(id))?;
        let mut tuple = entry.tuple.take().ok_or_else(|| stale(id))?;
        tuple.state = TupleState::Dead;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Ok(tuple)
    }

    pub fn len(&self) -> usize {
        self.live
    }
}

fn stale(id: TupleId) -> EngineError {
    EngineError::internal(
        "tuple arena",
        format!("tuple {}@{} is not live", id.index, id.generation),
    )
}
