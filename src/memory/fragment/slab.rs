/*!
 * Fragment Slab
 * Dense table of fragment metadata addressed by slot index
 *
 * Each slot carries a generation that is bumped when the slot is vacated,
 * so a stale (index, generation) pair read back from a region header never
 * resolves to a recycled fragment.
 */

use crate::core::types::{Address, FragId, Size};

/// The link slot that currently points at a free fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    /// Head of the bucket with this index
    Bucket(usize),
    /// `next_free` field of this fragment
    Frag(FragId),
}

/// Fragment metadata
#[derive(Debug, Clone)]
pub(crate) struct Fragment<R> {
    /// Header offset in the region; the payload starts FRAG_OVERHEAD later
    pub offset: Address,
    /// Payload size
    pub size: Size,
    pub free: bool,
    /// Next fragment in the same bucket (free fragments only)
    pub next_free: Option<FragId>,
    /// Slot referencing this fragment (free fragments only)
    pub prev_link: Option<Link>,
    pub prev_phys: Option<FragId>,
    pub next_phys: Option<FragId>,
    pub record: R,
}

impl<R: Default> Fragment<R> {
    pub fn new(offset: Address, size: Size) -> Self {
        Self {
            offset,
            size,
            free: false,
            next_free: None,
            prev_link: None,
            prev_phys: None,
            next_phys: None,
            record: R::default(),
        }
    }
}

#[derive(Debug)]
enum SlotState<R> {
    Live(Fragment<R>),
    Vacant {
        next: Option<FragId>,
        /// Record of the fragment that last lived here
        tombstone: Option<R>,
    },
}

#[derive(Debug)]
struct Slot<R> {
    generation: u32,
    state: SlotState<R>,
}

/// Outcome of resolving an (index, generation) pair
pub(crate) enum Lookup<'a, R> {
    Live(&'a Fragment<R>),
    /// The fragment was merged away; its last record may still be known
    Stale(Option<&'a R>),
    Missing,
}

#[derive(Debug)]
pub(crate) struct Slab<R> {
    slots: Vec<Slot<R>>,
    vacant: Option<FragId>,
    live: usize,
}

impl<R: Clone> Slab<R> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: None,
            live: 0,
        }
    }

    /// Number of live fragments
    pub fn len(&self) -> usize {
        self.live
    }

    /// Store a fragment, returning its slot and generation
    pub fn insert(&mut self, frag: Fragment<R>) -> (FragId, u32) {
        self.live += 1;
        match self.vacant {
            Some(id) => {
                let slot = &mut self.slots[id as usize];
                if let SlotState::Vacant { next, .. } = slot.state {
                    self.vacant = next;
                }
                slot.state = SlotState::Live(frag);
                (id, slot.generation)
            }
            None => {
                let id = self.slots.len() as FragId;
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Live(frag),
                });
                (id, 0)
            }
        }
    }

    /// Vacate a slot, keeping the record as a tombstone
    pub fn remove(&mut self, id: FragId) -> Fragment<R> {
        let slot = &mut self.slots[id as usize];
        let state = std::mem::replace(
            &mut slot.state,
            SlotState::Vacant {
                next: self.vacant,
                tombstone: None,
            },
        );
        let frag = match state {
            SlotState::Live(frag) => frag,
            SlotState::Vacant { .. } => unreachable!("fragment slot {id} removed twice"),
        };
        if let SlotState::Vacant { tombstone, .. } = &mut slot.state {
            *tombstone = Some(frag.record.clone());
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant = Some(id);
        self.live -= 1;
        frag
    }

    pub fn get(&self, id: FragId) -> &Fragment<R> {
        match &self.slots[id as usize].state {
            SlotState::Live(frag) => frag,
            SlotState::Vacant { .. } => unreachable!("fragment slot {id} is vacant"),
        }
    }

    pub fn get_mut(&mut self, id: FragId) -> &mut Fragment<R> {
        match &mut self.slots[id as usize].state {
            SlotState::Live(frag) => frag,
            SlotState::Vacant { .. } => unreachable!("fragment slot {id} is vacant"),
        }
    }

    pub fn lookup(&self, id: FragId, generation: u32) -> Lookup<'_, R> {
        let Some(slot) = self.slots.get(id as usize) else {
            return Lookup::Missing;
        };
        match &slot.state {
            SlotState::Live(frag) if slot.generation == generation => Lookup::Live(frag),
            SlotState::Vacant { tombstone, .. }
                if slot.generation == generation.wrapping_add(1) =>
            {
                Lookup::Stale(tombstone.as_ref())
            }
            _ if generation < slot.generation => Lookup::Stale(None),
            _ => Lookup::Missing,
        }
    }
}
