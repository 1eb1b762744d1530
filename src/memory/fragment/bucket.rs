/*!
 * Segregated Free Lists
 * Size-class buckets of free fragments with O(1) unlink
 */

use super::size_class::{bucket_index, is_exact};
use super::slab::{Link, Slab};
use crate::core::limits::HASH_SIZE;
use crate::core::types::{BucketIdx, FragId, Size};

/// Head of one size class
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Bucket {
    pub first: Option<FragId>,
    pub no: usize,
}

/// Bitmap of non-empty buckets
#[derive(Debug, Clone)]
struct BucketMap {
    words: Vec<u64>,
}

impl BucketMap {
    fn new(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(64)],
        }
    }

    #[inline]
    fn set(&mut self, idx: BucketIdx) {
        self.words[idx / 64] |= 1 << (idx % 64);
    }

    #[inline]
    fn clear(&mut self, idx: BucketIdx) {
        self.words[idx / 64] &= !(1 << (idx % 64));
    }

    /// First non-empty bucket at or above `from`
    fn next_set(&self, from: BucketIdx) -> Option<BucketIdx> {
        let mut word_idx = from / 64;
        if word_idx >= self.words.len() {
            return None;
        }
        let mut word = self.words[word_idx] & (!0u64 << (from % 64));
        loop {
            if word != 0 {
                return Some(word_idx * 64 + word.trailing_zeros() as usize);
            }
            word_idx += 1;
            if word_idx >= self.words.len() {
                return None;
            }
            word = self.words[word_idx];
        }
    }
}

/// All free-list buckets of a block
#[derive(Debug, Clone)]
pub(crate) struct FreeHash {
    buckets: Vec<Bucket>,
    map: BucketMap,
}

impl FreeHash {
    pub fn new() -> Self {
        Self {
            buckets: vec![Bucket::default(); HASH_SIZE],
            map: BucketMap::new(HASH_SIZE),
        }
    }

    pub fn bucket(&self, idx: BucketIdx) -> &Bucket {
        &self.buckets[idx]
    }

    /// Indices of non-empty buckets in increasing order
    pub fn non_empty(&self) -> impl Iterator<Item = BucketIdx> + '_ {
        let mut from = 0;
        std::iter::from_fn(move || {
            let idx = self.map.next_set(from)?;
            from = idx + 1;
            Some(idx)
        })
    }

    fn slot<R: Clone>(&self, slab: &Slab<R>, link: Link) -> Option<FragId> {
        match link {
            Link::Bucket(idx) => self.buckets[idx].first,
            Link::Frag(id) => slab.get(id).next_free,
        }
    }

    fn set_slot<R: Clone>(&mut self, slab: &mut Slab<R>, link: Link, value: Option<FragId>) {
        match link {
            Link::Bucket(idx) => self.buckets[idx].first = value,
            Link::Frag(id) => slab.get_mut(id).next_free = value,
        }
    }

    /// Link a fragment into the bucket of its current size
    ///
    /// Logarithmic buckets stay sorted by ascending size so the first fit
    /// found there is also the tightest.
    pub fn insert<R: Clone>(&mut self, slab: &mut Slab<R>, id: FragId) {
        let size = slab.get(id).size;
        let idx = bucket_index(size);
        let mut link = Link::Bucket(idx);
        let mut cur = self.buckets[idx].first;
        if !is_exact(idx) {
            while let Some(c) = cur {
                if size <= slab.get(c).size {
                    break;
                }
                link = Link::Frag(c);
                cur = slab.get(c).next_free;
            }
        }

        {
            let frag = slab.get_mut(id);
            frag.prev_link = Some(link);
            frag.next_free = cur;
        }
        if let Some(c) = cur {
            slab.get_mut(c).prev_link = Some(Link::Frag(id));
        }
        self.set_slot(slab, link, Some(id));

        self.buckets[idx].no += 1;
        self.map.set(idx);
    }

    /// Unlink a free fragment through its back-reference
    ///
    /// Must run before the fragment's size changes.
    pub fn remove<R: Clone>(&mut self, slab: &mut Slab<R>, id: FragId) {
        let (link, next, idx) = {
            let frag = slab.get_mut(id);
            let Some(link) = frag.prev_link.take() else {
                unreachable!("fragment {id} is not linked into a bucket");
            };
            (link, frag.next_free.take(), bucket_index(frag.size))
        };

        debug_assert_eq!(self.slot(slab, link), Some(id));
        self.set_slot(slab, link, next);
        if let Some(n) = next {
            slab.get_mut(n).prev_link = Some(link);
        }

        let bucket = &mut self.buckets[idx];
        bucket.no -= 1;
        if bucket.no == 0 {
            self.map.clear(idx);
        }
    }

    /// First free fragment of at least `size` bytes
    ///
    /// Starts at the bucket for `size` and escalates to larger classes.
    pub fn find<R: Clone>(&self, slab: &Slab<R>, size: Size) -> Option<FragId> {
        let mut next = self.map.next_set(bucket_index(size));
        while let Some(idx) = next {
            let mut cur = self.buckets[idx].first;
            while let Some(c) = cur {
                let frag = slab.get(c);
                if frag.size >= size {
                    return Some(c);
                }
                cur = frag.next_free;
            }
            next = self.map.next_set(idx + 1);
        }
        None
    }

    /// Walk the members of one bucket
    #[cfg(test)]
    pub fn members<'a, R: Clone>(
        &'a self,
        slab: &'a Slab<R>,
        idx: BucketIdx,
    ) -> impl Iterator<Item = FragId> + 'a {
        let mut cur = self.buckets[idx].first;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = slab.get(id).next_free;
            Some(id)
        })
    }
}
