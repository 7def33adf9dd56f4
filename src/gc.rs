use std::{ops::Deref, rc::Rc};

/// A shared handle to an object owned by a [`Heap`](crate::Heap).
///
/// Objects are never reclaimed one by one. The heap keeps a handle to everything it ever
/// allocated and releases them all at once when it is dropped, so a `Gc` never dangles
/// while its heap is alive. No object type can point back at itself, so the reference
/// counts underneath never form a cycle.
#[derive(Debug)]
pub struct Gc<T: ?Sized> {
    raw: Rc<T>,
}

impl<T> Gc<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            raw: Rc::new(value),
        }
    }
}

impl<T: ?Sized> Gc<T> {
    /// Return true if both handles point at the same object.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.raw, &other.raw)
    }
}

impl<T: ?Sized> Deref for Gc<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.raw.deref()
    }
}

impl<T: ?Sized> Clone for Gc<T> {
    fn clone(&self) -> Self {
        Self {
            raw: Rc::clone(&self.raw),
        }
    }
}

// Heap objects compare by identity.
impl<T: ?Sized> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Eq for Gc<T> {}
