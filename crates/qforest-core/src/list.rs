//! List / Sublist - doubly-linked orderings over arena records
//!
//! A master [`List`] owns two arenas, one for link records and one for
//! payload records. Active links form a doubly-linked sequence between a
//! head and a tail sentinel; removed links are zeroed and moved onto a
//! second sequence (the free list) from which later insertions take their
//! storage, so removal never releases memory.
//!
//! A [`Sublist`] owns only link records. Its entries refer to payload
//! records of a master list by payload index, letting several independent
//! orderings share one payload population (all trees of a forest versus the
//! trees of one segment, for example). Membership is checked against the
//! master on insertion.
//!
//! # Invariants
//!
//! - every non-sentinel link is either in the active sequence or in the free
//!   sequence, never both
//! - sentinel links are never removed or reused
//! - iteration between two links that are not connected in order is an
//!   error, never a silent truncation

use crate::arena::Chunk;
use crate::error::{Error, Result};
use std::cmp::Ordering;

const HEAD: usize = 0;
const TAIL: usize = 1;
const FREE_HEAD: usize = 2;
const FREE_TAIL: usize = 3;
const SENTINELS: usize = 4;
const NONE: usize = usize::MAX;

/// Handle to a link record of a [`List`] or [`Sublist`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LinkState {
    #[default]
    Unused,
    Sentinel,
    Active,
    Free,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: usize,
    next: usize,
    payload: usize,
    state: LinkState,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            prev: NONE,
            next: NONE,
            payload: NONE,
            state: LinkState::Unused,
        }
    }
}

/// Link arena with the active and free sequences
#[derive(Debug, Clone)]
struct Chain {
    links: Chunk<Link>,
    count: usize,
}

impl Chain {
    fn new(capacity: usize) -> Result<Self> {
        let mut chain = Self {
            links: Chunk::new(capacity.max(1) + SENTINELS)?,
            count: 0,
        };
        chain.init_sentinels()?;
        Ok(chain)
    }

    fn init_sentinels(&mut self) -> Result<()> {
        for _ in 0..SENTINELS {
            self.links.push(Link {
                state: LinkState::Sentinel,
                ..Link::default()
            })?;
        }
        self.links[HEAD].next = TAIL;
        self.links[TAIL].prev = HEAD;
        self.links[FREE_HEAD].next = FREE_TAIL;
        self.links[FREE_TAIL].prev = FREE_HEAD;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.links.clear();
        self.count = 0;
        self.init_sentinels()
    }

    fn unlink(&mut self, i: usize) {
        let Link { prev, next, .. } = self.links[i];
        self.links[prev].next = next;
        self.links[next].prev = prev;
        self.links[i].prev = NONE;
        self.links[i].next = NONE;
    }

    fn insert_before(&mut self, i: usize, at: usize) {
        let prev = self.links[at].prev;
        self.links[i].prev = prev;
        self.links[i].next = at;
        self.links[prev].next = i;
        self.links[at].prev = i;
    }

    /// Pop the oldest free link, if any.
    fn take_free(&mut self) -> Option<usize> {
        let i = self.links[FREE_HEAD].next;
        if i == FREE_TAIL {
            return None;
        }
        self.unlink(i);
        Some(i)
    }

    fn new_link(&mut self, payload: usize) -> Result<usize> {
        self.links.push(Link {
            payload,
            ..Link::default()
        })
    }

    fn activate_before(&mut self, i: usize, at: usize) {
        self.insert_before(i, at);
        self.links[i].state = LinkState::Active;
        self.count += 1;
    }

    fn release(&mut self, i: usize) {
        self.unlink(i);
        self.insert_before(i, FREE_TAIL);
        self.links[i].state = LinkState::Free;
        self.count -= 1;
    }

    fn state(&self, item: Item) -> Result<LinkState> {
        self.links
            .get(item.0)
            .map(|link| link.state)
            .ok_or_else(|| Error::NotFound(format!("list item {}", item.0)))
    }

    /// Require an item of the active sequence.
    fn check_active(&self, item: Item) -> Result<()> {
        match self.state(item)? {
            LinkState::Active => Ok(()),
            state => Err(Error::InvalidState(format!(
                "list item {} is not active ({:?})",
                item.0, state
            ))),
        }
    }

    /// Require an active item or one of the two bounding sentinels.
    fn check_bound(&self, item: Item) -> Result<()> {
        if item.0 == HEAD || item.0 == TAIL {
            return Ok(());
        }
        self.check_active(item)
    }

    /// Collect the links strictly between `begin` and `end`, walking `next`.
    fn walk_forward(&self, begin: Item, end: Item) -> Result<Vec<usize>> {
        self.check_bound(begin)?;
        self.check_bound(end)?;
        let mut out = Vec::new();
        let mut i = self.links[begin.0].next;
        while i != end.0 {
            if i == NONE || i == TAIL || out.len() > self.count {
                return Err(Error::InvalidState(format!(
                    "list chain from {} does not reach {}",
                    begin.0, end.0
                )));
            }
            out.push(i);
            i = self.links[i].next;
        }
        Ok(out)
    }

    /// Collect the links strictly between `begin` and `end`, walking `prev`.
    fn walk_backward(&self, begin: Item, end: Item) -> Result<Vec<usize>> {
        self.check_bound(begin)?;
        self.check_bound(end)?;
        let mut out = Vec::new();
        let mut i = self.links[begin.0].prev;
        while i != end.0 {
            if i == NONE || i == HEAD || out.len() > self.count {
                return Err(Error::InvalidState(format!(
                    "list chain from {} does not reach {} backwards",
                    begin.0, end.0
                )));
            }
            out.push(i);
            i = self.links[i].prev;
        }
        Ok(out)
    }

    fn first(&self) -> Option<Item> {
        let i = self.links[HEAD].next;
        (i != TAIL).then_some(Item(i))
    }

    fn last(&self) -> Option<Item> {
        let i = self.links[TAIL].prev;
        (i != HEAD).then_some(Item(i))
    }

    fn next(&self, item: Item) -> Option<Item> {
        let i = self.links.get(item.0)?.next;
        (i != TAIL && i != NONE && self.links[i].state == LinkState::Active).then_some(Item(i))
    }

    fn prev(&self, item: Item) -> Option<Item> {
        let i = self.links.get(item.0)?.prev;
        (i != HEAD && i != NONE && self.links[i].state == LinkState::Active).then_some(Item(i))
    }

    fn items(&self) -> Items<'_> {
        Items {
            chain: self,
            front: self.links[HEAD].next,
            back: self.links[TAIL].prev,
            remaining: self.count,
        }
    }

    fn free_count(&self) -> usize {
        let mut n = 0;
        let mut i = self.links[FREE_HEAD].next;
        while i != FREE_TAIL && i != NONE {
            n += 1;
            i = self.links[i].next;
        }
        n
    }
}

/// Iterator over the active items of a list in order
#[derive(Debug, Clone)]
pub struct Items<'a> {
    chain: &'a Chain,
    front: usize,
    back: usize,
    remaining: usize,
}

impl Iterator for Items<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.front;
        self.front = self.chain.links[i].next;
        self.remaining -= 1;
        Some(Item(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Items<'_> {
    fn next_back(&mut self) -> Option<Item> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.back;
        self.back = self.chain.links[i].prev;
        self.remaining -= 1;
        Some(Item(i))
    }
}

impl ExactSizeIterator for Items<'_> {}

/// Master list owning its link and payload arenas
///
/// # Examples
///
/// ```
/// use qforest_core::List;
///
/// let mut list: List<u32> = List::new(8).unwrap();
/// let a = list.append(1).unwrap();
/// list.append(2).unwrap();
/// list.prepend(0).unwrap();
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
///
/// list.remove(a).unwrap();
/// assert_eq!(list.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct List<T> {
    chain: Chain,
    payloads: Chunk<T>,
    /// Link owning each payload record
    owners: Chunk<usize>,
}

impl<T: Default> List<T> {
    /// Create a master list whose arenas grow in blocks of `capacity` records.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = capacity.max(1);
        Ok(Self {
            chain: Chain::new(capacity)?,
            payloads: Chunk::new(capacity)?,
            owners: Chunk::new(capacity)?,
        })
    }

    /// Take a recycled link (keeping its payload slot) or allocate a new pair.
    fn acquire(&mut self, value: T) -> Result<usize> {
        if let Some(i) = self.chain.take_free() {
            let payload = self.chain.links[i].payload;
            self.payloads[payload] = value;
            return Ok(i);
        }
        let payload = self.payloads.push(value)?;
        let i = self.chain.new_link(payload)?;
        self.owners.push(i)?;
        Ok(i)
    }

    /// Append a value to the end of the list.
    pub fn append(&mut self, value: T) -> Result<Item> {
        let i = self.acquire(value)?;
        self.chain.activate_before(i, TAIL);
        Ok(Item(i))
    }

    /// Prepend a value to the beginning of the list.
    pub fn prepend(&mut self, value: T) -> Result<Item> {
        let i = self.acquire(value)?;
        let first = self.chain.links[HEAD].next;
        self.chain.activate_before(i, first);
        Ok(Item(i))
    }

    /// Insert a value right after `at`.
    ///
    /// `at` may be [`List::head`] to insert at the front.
    pub fn insert_at(&mut self, at: Item, value: T) -> Result<Item> {
        self.chain.check_bound(at)?;
        if at.0 == TAIL {
            return Err(Error::InvalidParameter(
                "cannot insert after the tail sentinel".to_string(),
            ));
        }
        let i = self.acquire(value)?;
        let next = self.chain.links[at.0].next;
        self.chain.activate_before(i, next);
        Ok(Item(i))
    }

    /// Insert a value before the first item that does not compare less.
    ///
    /// Keeps an ascending list ascending; equal values go in front of the
    /// existing ones.
    pub fn insert_sorted<F>(&mut self, value: T, mut compare: F) -> Result<Item>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let at = self.sorted_position(&value, &mut compare).unwrap_or(TAIL);
        let i = self.acquire(value)?;
        self.chain.activate_before(i, at);
        Ok(Item(i))
    }

    /// Insert a value in sorted position unless an equal value exists.
    ///
    /// Returns `None` when an equal value was found and nothing was inserted.
    pub fn insert_unique<F>(&mut self, value: T, mut compare: F) -> Result<Option<Item>>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let at = match self.sorted_position(&value, &mut compare) {
            Some(at) => {
                let existing = &self.payloads[self.chain.links[at].payload];
                if compare(&value, existing) == Ordering::Equal {
                    return Ok(None);
                }
                at
            }
            None => TAIL,
        };
        let i = self.acquire(value)?;
        self.chain.activate_before(i, at);
        Ok(Some(Item(i)))
    }

    fn sorted_position<F>(&self, value: &T, compare: &mut F) -> Option<usize>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.chain
            .items()
            .find(|item| {
                let existing = &self.payloads[self.chain.links[item.0].payload];
                compare(value, existing) != Ordering::Greater
            })
            .map(|item| item.0)
    }

    /// Remove an item: unlink it, reset its payload to the default value
    /// and move the link onto the free list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the item is not in the active sequence.
    pub fn remove(&mut self, item: Item) -> Result<()> {
        self.chain.check_active(item)?;
        self.release(item.0);
        Ok(())
    }

    fn release(&mut self, i: usize) {
        let payload = self.chain.links[i].payload;
        self.payloads[payload] = T::default();
        self.chain.release(i);
    }

    /// Remove the first item.
    pub fn remove_first(&mut self) -> Result<()> {
        let first = self
            .chain
            .first()
            .ok_or_else(|| Error::NotFound("first item of empty list".to_string()))?;
        self.remove(first)
    }

    /// Remove the last item.
    pub fn remove_last(&mut self) -> Result<()> {
        let last = self
            .chain
            .last()
            .ok_or_else(|| Error::NotFound("last item of empty list".to_string()))?;
        self.remove(last)
    }

    /// Remove every item strictly between `begin` and `end`.
    ///
    /// Nothing is removed if `end` cannot be reached from `begin`.
    pub fn remove_between(&mut self, begin: Item, end: Item) -> Result<usize> {
        let doomed = self.chain.walk_forward(begin, end)?;
        for &i in &doomed {
            self.release(i);
        }
        Ok(doomed.len())
    }

    /// Remove every item after `from`.
    pub fn remove_rest(&mut self, from: Item) -> Result<usize> {
        self.remove_between(from, Item(TAIL))
    }

    /// Reset the list and both arenas, keeping their memory.
    pub fn clear(&mut self) -> Result<()> {
        self.chain.clear()?;
        self.payloads.clear();
        self.owners.clear();
        Ok(())
    }

    /// Re-lay the payloads so that the active order is contiguous from
    /// payload index 0, dropping the free list.
    ///
    /// Payload indices handed out earlier are invalidated.
    pub fn pack(&mut self) -> Result<()> {
        let order: Vec<usize> = self
            .chain
            .items()
            .map(|item| self.chain.links[item.0].payload)
            .collect();
        let mut values = Vec::with_capacity(order.len());
        for payload in order {
            values.push(std::mem::take(&mut self.payloads[payload]));
        }
        self.clear()?;
        for value in values {
            self.append(value)?;
        }
        log::debug!("packed list of {} items", self.len());
        Ok(())
    }
}

impl<T> List<T> {
    /// Head sentinel, usable as an exclusive iteration bound.
    #[inline]
    pub fn head(&self) -> Item {
        Item(HEAD)
    }

    /// Tail sentinel, usable as an exclusive iteration bound.
    #[inline]
    pub fn tail(&self) -> Item {
        Item(TAIL)
    }

    /// Number of active items
    #[inline]
    pub fn len(&self) -> usize {
        self.chain.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chain.count == 0
    }

    /// Number of links waiting on the free list
    pub fn free_len(&self) -> usize {
        self.chain.free_count()
    }

    pub fn first(&self) -> Option<Item> {
        self.chain.first()
    }

    pub fn last(&self) -> Option<Item> {
        self.chain.last()
    }

    /// Item following `item` in the active sequence.
    pub fn next(&self, item: Item) -> Option<Item> {
        self.chain.next(item)
    }

    /// Item preceding `item` in the active sequence.
    pub fn prev(&self, item: Item) -> Option<Item> {
        self.chain.prev(item)
    }

    /// Get the value of an active item.
    pub fn get(&self, item: Item) -> Result<&T> {
        self.chain.check_active(item)?;
        Ok(&self.payloads[self.chain.links[item.0].payload])
    }

    /// Get the value of an active item mutably.
    pub fn get_mut(&mut self, item: Item) -> Result<&mut T> {
        self.chain.check_active(item)?;
        let payload = self.chain.links[item.0].payload;
        Ok(&mut self.payloads[payload])
    }

    /// Payload index of an active item, stable until the item is removed.
    pub fn payload_index(&self, item: Item) -> Result<usize> {
        self.chain.check_active(item)?;
        Ok(self.chain.links[item.0].payload)
    }

    /// Item owning an active payload index.
    pub fn item_of(&self, index: usize) -> Option<Item> {
        let &link = self.owners.get(index)?;
        (self.chain.links[link].state == LinkState::Active).then_some(Item(link))
    }

    /// Check whether a payload index belongs to an active item of this list.
    pub fn contains_payload(&self, index: usize) -> bool {
        self.item_of(index).is_some()
    }

    /// Get an active payload by index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the index is not held by an active item.
    pub fn payload(&self, index: usize) -> Result<&T> {
        if !self.contains_payload(index) {
            return Err(Error::NotFound(format!("payload {}", index)));
        }
        Ok(&self.payloads[index])
    }

    /// Get an active payload by index, mutably.
    pub fn payload_mut(&mut self, index: usize) -> Result<&mut T> {
        if !self.contains_payload(index) {
            return Err(Error::NotFound(format!("payload {}", index)));
        }
        Ok(&mut self.payloads[index])
    }

    /// Read a payload slot whether or not it is active.
    ///
    /// Released slots hold the default value.
    pub fn raw_payload(&self, index: usize) -> Option<&T> {
        self.payloads.get(index)
    }

    /// Number of payload slots ever allocated
    pub fn payload_slots(&self) -> usize {
        self.payloads.len()
    }

    /// Iterate active items in order.
    pub fn items(&self) -> Items<'_> {
        self.chain.items()
    }

    /// Iterate active values in order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.chain
            .items()
            .map(move |item| &self.payloads[self.chain.links[item.0].payload])
    }

    /// Run `handler` on every value strictly between `begin` and `end`,
    /// walking forward.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] before running the handler if `end`
    /// cannot be reached from `begin`; handler errors are returned as is.
    pub fn iterate_forward<E, F>(&mut self, begin: Item, end: Item, mut handler: F) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&mut T) -> std::result::Result<(), E>,
    {
        for i in self.chain.walk_forward(begin, end)? {
            let payload = self.chain.links[i].payload;
            handler(&mut self.payloads[payload])?;
        }
        Ok(())
    }

    /// Run `handler` on every value strictly between `begin` and `end`,
    /// walking backward.
    pub fn iterate_backward<E, F>(&mut self, begin: Item, end: Item, mut handler: F) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&mut T) -> std::result::Result<(), E>,
    {
        for i in self.chain.walk_backward(begin, end)? {
            let payload = self.chain.links[i].payload;
            handler(&mut self.payloads[payload])?;
        }
        Ok(())
    }
}

/// Non-owning ordering over the payloads of a master [`List`]
///
/// # Examples
///
/// ```
/// use qforest_core::{List, Sublist};
///
/// let mut master: List<&str> = List::new(4).unwrap();
/// let a = master.append("a").unwrap();
/// let b = master.append("b").unwrap();
///
/// let mut sub = Sublist::new(4).unwrap();
/// sub.append(&master, master.payload_index(b).unwrap()).unwrap();
/// sub.append(&master, master.payload_index(a).unwrap()).unwrap();
/// assert_eq!(sub.iter(&master).copied().collect::<Vec<_>>(), vec!["b", "a"]);
/// ```
#[derive(Debug, Clone)]
pub struct Sublist {
    chain: Chain,
}

impl Sublist {
    /// Create an empty sublist whose link arena grows in blocks of `capacity`.
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            chain: Chain::new(capacity)?,
        })
    }

    fn acquire<T>(&mut self, master: &List<T>, payload: usize) -> Result<usize> {
        if !master.contains_payload(payload) {
            return Err(Error::NotFound(format!(
                "payload {} is not part of the master list",
                payload
            )));
        }
        if let Some(i) = self.chain.take_free() {
            self.chain.links[i].payload = payload;
            return Ok(i);
        }
        self.chain.new_link(payload)
    }

    /// Append a reference to a master payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the master holds no such active payload.
    pub fn append<T>(&mut self, master: &List<T>, payload: usize) -> Result<Item> {
        let i = self.acquire(master, payload)?;
        self.chain.activate_before(i, TAIL);
        Ok(Item(i))
    }

    /// Prepend a reference to a master payload.
    pub fn prepend<T>(&mut self, master: &List<T>, payload: usize) -> Result<Item> {
        let i = self.acquire(master, payload)?;
        let first = self.chain.links[HEAD].next;
        self.chain.activate_before(i, first);
        Ok(Item(i))
    }

    /// Insert a reference right after `at`.
    pub fn insert_at<T>(&mut self, at: Item, master: &List<T>, payload: usize) -> Result<Item> {
        self.chain.check_bound(at)?;
        if at.0 == TAIL {
            return Err(Error::InvalidParameter(
                "cannot insert after the tail sentinel".to_string(),
            ));
        }
        let i = self.acquire(master, payload)?;
        let next = self.chain.links[at.0].next;
        self.chain.activate_before(i, next);
        Ok(Item(i))
    }

    /// Remove an entry; the master payload is left untouched.
    pub fn remove(&mut self, item: Item) -> Result<()> {
        self.chain.check_active(item)?;
        self.chain.links[item.0].payload = NONE;
        self.chain.release(item.0);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.chain.clear()
    }

    /// Packing would have to move master payloads, which a sublist does not own.
    pub fn pack(&mut self) -> Result<()> {
        Err(Error::Unimplemented("packing a sublist"))
    }

    #[inline]
    pub fn head(&self) -> Item {
        Item(HEAD)
    }

    #[inline]
    pub fn tail(&self) -> Item {
        Item(TAIL)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chain.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chain.count == 0
    }

    pub fn first(&self) -> Option<Item> {
        self.chain.first()
    }

    pub fn last(&self) -> Option<Item> {
        self.chain.last()
    }

    pub fn next(&self, item: Item) -> Option<Item> {
        self.chain.next(item)
    }

    pub fn prev(&self, item: Item) -> Option<Item> {
        self.chain.prev(item)
    }

    /// Master payload index referenced by an entry.
    pub fn payload_index(&self, item: Item) -> Result<usize> {
        self.chain.check_active(item)?;
        Ok(self.chain.links[item.0].payload)
    }

    /// Master payload indices in order.
    pub fn indices(&self) -> Vec<usize> {
        self.chain
            .items()
            .map(|item| self.chain.links[item.0].payload)
            .collect()
    }

    /// Check whether the sublist references a payload index.
    pub fn contains_payload(&self, payload: usize) -> bool {
        self.chain
            .items()
            .any(|item| self.chain.links[item.0].payload == payload)
    }

    /// Iterate the referenced master values in order.
    ///
    /// Entries whose payload was removed from the master are skipped.
    pub fn iter<'a, T>(&'a self, master: &'a List<T>) -> impl Iterator<Item = &'a T> + 'a {
        self.chain
            .items()
            .filter_map(move |item| master.payload(self.chain.links[item.0].payload).ok())
    }

    /// Run `handler` on every referenced value strictly between `begin` and
    /// `end`, walking forward.
    pub fn iterate_forward<T, E, F>(
        &self,
        master: &List<T>,
        begin: Item,
        end: Item,
        mut handler: F,
    ) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&T) -> std::result::Result<(), E>,
    {
        for i in self.chain.walk_forward(begin, end)? {
            handler(master.payload(self.chain.links[i].payload)?)?;
        }
        Ok(())
    }

    /// Run `handler` on every referenced value strictly between `begin` and
    /// `end`, walking backward.
    pub fn iterate_backward<T, E, F>(
        &self,
        master: &List<T>,
        begin: Item,
        end: Item,
        mut handler: F,
    ) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&T) -> std::result::Result<(), E>,
    {
        for i in self.chain.walk_backward(begin, end)? {
            handler(master.payload(self.chain.links[i].payload)?)?;
        }
        Ok(())
    }
}
