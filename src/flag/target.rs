//! Caller-owned cells holding resolved flag values.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Logical identity of a [`Target`].
///
/// Keys are handed out once per `Target::new` and shared by every clone, so a
/// command can map a target back to the flags it was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetKey(u64);

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// A shared, mutable cell holding a flag's resolved value.
///
/// The caller creates the target with its compiled-in default, hands a clone to
/// a [`Value`](super::Value) wrapper, and reads the resolved value once the
/// command runs. Invocations are single-threaded, so the cell is not `Send`.
///
/// Every clone also shares whether the target has been assigned since it was
/// created. [`Target::set`] marks it, as does a successful write through a
/// collection value, and [`Slice`](super::Slice) renders an empty, never
/// assigned target as `<nil>`.
///
/// # Example
///
/// ```
/// use flagbind::flag::Target;
///
/// let house = Target::new(String::from("Hufflepuff"));
/// let handle = house.clone();
/// handle.set(String::from("Ravenclaw"));
/// assert_eq!(house.get(), "Ravenclaw");
/// ```
pub struct Target<T> {
    key: TargetKey,
    cell: Rc<RefCell<T>>,
    assigned: Rc<Cell<bool>>,
}

impl<T> Target<T> {
    /// Creates a target holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            key: TargetKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed)),
            cell: Rc::new(RefCell::new(initial)),
            assigned: Rc::new(Cell::new(false)),
        }
    }

    /// Returns the logical key shared by all clones of this target.
    #[must_use]
    pub const fn key(&self) -> TargetKey {
        self.key
    }

    /// Overwrites the held value and marks the target as assigned.
    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
        self.mark_assigned();
    }

    /// Returns whether the target has been assigned since it was created.
    #[must_use]
    pub fn assigned(&self) -> bool {
        self.assigned.get()
    }

    pub(crate) fn mark_assigned(&self) {
        self.assigned.set(true);
    }

    /// Borrows the held value.
    ///
    /// # Panics
    ///
    /// Panics if the value is currently being modified, which cannot happen
    /// outside of a value's own `set`.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    /// Runs `update` with mutable access to the held value.
    pub(crate) fn update<R>(&self, update: impl FnOnce(&mut T) -> R) -> R {
        update(&mut self.cell.borrow_mut())
    }
}

impl<T: Clone> Target<T> {
    /// Returns a copy of the held value.
    #[must_use]
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }
}

impl<T: Default> Default for Target<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Clone for Target<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            cell: Rc::clone(&self.cell),
            assigned: Rc::clone(&self.assigned),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Target<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("key", &self.key)
            .field("value", &*self.cell.borrow())
            .finish()
    }
}
