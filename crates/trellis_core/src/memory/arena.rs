//! # Generational Arena
//!
//! Slot storage with a free list and two-phase removal.
//!
//! Values are never freed while a caller may still be walking them: removal
//! first *marks* a slot, and a dedicated [`Arena::collect_marked`] pass frees
//! every marked slot at once. Freed slots bump their generation so stale
//! handles resolve to `None` instead of aliasing a newer value.

use super::Handle;

/// One slot of the arena.
struct Slot<T> {
    /// Current generation of this slot.
    generation: u32,
    /// Stored value (None when the slot is free).
    value: Option<T>,
    /// Marked for removal, waiting for the next collection pass.
    marked: bool,
}

/// A growable generational arena.
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Use one arena per thread.
///
/// # Example
///
/// ```rust
/// use trellis_core::Arena;
///
/// let mut arena = Arena::new();
/// let handle = arena.insert("panel");
///
/// // Phase one: the value is still readable while marked
/// arena.mark_for_removal(handle);
/// assert_eq!(arena.get(handle), Some(&"panel"));
///
/// // Phase two: the dedicated pass frees it
/// let freed = arena.collect_marked();
/// assert_eq!(freed.len(), 1);
/// assert!(arena.get(handle).is_none());
/// ```
pub struct Arena<T> {
    /// The slot storage.
    slots: Vec<Slot<T>>,
    /// Free list - indices of available slots.
    free_list: Vec<u32>,
    /// Number of occupied slots (marked ones included).
    len: usize,
    /// Indices marked for removal, in marking order.
    marked: Vec<u32>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty arena with room for `capacity` values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
            marked: Vec::new(),
        }
    }

    /// Returns the number of occupied slots, including marked ones.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the arena holds no values.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots waiting for the next collection pass.
    #[inline]
    #[must_use]
    pub fn pending_removals(&self) -> usize {
        self.marked.len()
    }

    /// Stores a value and returns its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        self.insert_with(|_| value)
    }

    /// Stores a value built from its own handle.
    ///
    /// Useful when the value needs to know its identity up front.
    pub fn insert_with(&mut self, build: impl FnOnce(Handle) -> T) -> Handle {
        self.len += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            let handle = Handle::new(index, slot.generation);
            slot.value = Some(build(handle));
            slot.marked = false;
            return handle;
        }

        let index = u32::try_from(self.slots.len()).expect("arena exceeded u32::MAX slots");
        let handle = Handle::new(index, 0);
        self.slots.push(Slot {
            generation: 0,
            value: Some(build(handle)),
            marked: false,
        });
        handle
    }

    /// Returns the slot for a handle if its generation still matches.
    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        let slot = self.slots.get(handle.index() as usize)?;
        (slot.generation == handle.generation() && slot.value.is_some()).then_some(slot)
    }

    /// Returns true if the handle refers to a stored value (marked or not).
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_some()
    }

    /// Returns true if the handle refers to a value that is not marked for removal.
    #[inline]
    #[must_use]
    pub fn is_live(&self, handle: Handle) -> bool {
        self.slot(handle).is_some_and(|slot| !slot.marked)
    }

    /// Returns true if the value is marked for removal but not yet collected.
    #[inline]
    #[must_use]
    pub fn is_marked(&self, handle: Handle) -> bool {
        self.slot(handle).is_some_and(|slot| slot.marked)
    }

    /// Gets a reference to a stored value.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slot(handle)?.value.as_ref()
    }

    /// Gets a mutable reference to a stored value.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Marks a value for removal.
    ///
    /// The value stays readable until [`Arena::collect_marked`] runs.
    /// Returns false if the handle is stale or already marked.
    pub fn mark_for_removal(&mut self, handle: Handle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index() as usize) else {
            return false;
        };
        if slot.generation != handle.generation() || slot.value.is_none() || slot.marked {
            return false;
        }
        slot.marked = true;
        self.marked.push(handle.index());
        true
    }

    /// Frees every marked slot and returns the removed values.
    ///
    /// Values are returned in marking order.
    pub fn collect_marked(&mut self) -> Vec<(Handle, T)> {
        let marked = std::mem::take(&mut self.marked);
        let mut freed = Vec::with_capacity(marked.len());

        for index in marked {
            let slot = &mut self.slots[index as usize];
            if let Some(value) = slot.value.take() {
                freed.push((Handle::new(index, slot.generation), value));
                slot.generation = slot.generation.wrapping_add(1);
                slot.marked = false;
                self.free_list.push(index);
                self.len -= 1;
            }
        }

        freed
    }

    /// Frees a value immediately, skipping the marking phase.
    ///
    /// Only for storage that is never observed during a traversal.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() {
            return None;
        }
        let value = slot.value.take()?;
        if slot.marked {
            slot.marked = false;
            self.marked.retain(|&index| index != handle.index());
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index());
        self.len -= 1;
        Some(value)
    }

    /// Iterates over all stored values, marked ones included.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let value = slot.value.as_ref()?;
            // Slot count is bounded by u32 in `insert_with`.
            #[allow(clippy::cast_possible_truncation)]
            Some((Handle::new(index as u32, slot.generation), value))
        })
    }

    /// Iterates mutably over all stored values, marked ones included.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            let value = slot.value.as_mut()?;
            #[allow(clippy::cast_possible_truncation)]
            Some((Handle::new(index as u32, generation), value))
        })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);

        assert_eq!(arena.get(a), Some(&1));
        assert_eq!(arena.get(b), Some(&2));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_two_phase_removal() {
        let mut arena = Arena::new();
        let a = arena.insert("a");

        assert!(arena.mark_for_removal(a));
        assert!(!arena.mark_for_removal(a));
        assert!(arena.contains(a));
        assert!(!arena.is_live(a));
        assert!(arena.is_marked(a));
        assert_eq!(arena.pending_removals(), 1);

        let freed = arena.collect_marked();
        assert_eq!(freed, vec![(a, "a")]);
        assert!(!arena.contains(a));
        assert!(arena.is_empty());
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut arena = Arena::new();
        let old = arena.insert(10);
        arena.mark_for_removal(old);
        arena.collect_marked();

        let new = arena.insert(20);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(arena.get(old).is_none());
        assert!(arena.get_mut(old).is_none());
        assert_eq!(arena.get(new), Some(&20));
    }

    #[test]
    fn test_immediate_remove_clears_mark() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        arena.mark_for_removal(a);

        assert_eq!(arena.remove(a), Some(1));
        assert_eq!(arena.pending_removals(), 0);
        assert!(arena.collect_marked().is_empty());
        assert_eq!(arena.remove(a), None);
    }

    #[test]
    fn test_insert_with_sees_own_handle() {
        let mut arena = Arena::new();
        let handle = arena.insert_with(|h| h.index());
        assert_eq!(arena.get(handle), Some(&handle.index()));
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let _b = arena.insert(2);
        arena.remove(a);

        let values: Vec<i32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![2]);

        for (_, value) in arena.iter_mut() {
            *value += 1;
        }
        assert_eq!(arena.iter().map(|(_, v)| *v).sum::<i32>(), 3);
    }
}
