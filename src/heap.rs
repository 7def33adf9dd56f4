use std::fmt;

use string_interner::{symbol::SymbolU32, DefaultBackend, DefaultHashBuilder};

use crate::{Function, Gc, NativeFun, Object};

/// Default string interner
pub type StringInterner<B = DefaultBackend<StrId>, H = DefaultHashBuilder> =
    string_interner::StringInterner<StrId, B, H>;

/// Interned string id
pub type StrId = SymbolU32;

/// Owner of every object created while compiling and running programs.
///
/// Each allocation is recorded in a single list that is only released when the heap is
/// dropped. Strings go through the intern table first, so there is never more than one
/// string object with a given content.
pub struct Heap {
    strings: StringInterner,
    objects: Vec<Object>,
}

impl Default for Heap {
    fn default() -> Self {
        Self {
            strings: StringInterner::new(),
            objects: Vec::new(),
        }
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("strings", &self.strings.len())
            .field("objects", &self.objects.len())
            .finish()
    }
}

impl Heap {
    /// Intern a string if it has not been allocated by this heap, otherwise, returning the
    /// existing id for that string.
    pub fn intern<S: AsRef<str>>(&mut self, s: S) -> StrId {
        let s = s.as_ref();
        if let Some(id) = self.strings.get(s) {
            return id;
        }
        let id = self.strings.get_or_intern(s);
        self.objects.push(Object::String(id));
        id
    }

    /// Look up a string without interning it.
    pub fn lookup<S: AsRef<str>>(&self, s: S) -> Option<StrId> {
        self.strings.get(s)
    }

    /// Get the string content using its id.
    pub fn str(&self, id: StrId) -> &str {
        self.strings
            .resolve(id)
            .expect("String must be allocated before access.")
    }

    /// Move a finished function onto the heap.
    pub fn alloc_function(&mut self, function: Function) -> Gc<Function> {
        let function = Gc::new(function);
        self.objects.push(Object::Function(function.clone()));
        function
    }

    /// Move a native function onto the heap.
    pub fn alloc_native(&mut self, native: NativeFun) -> Gc<NativeFun> {
        let native = Gc::new(native);
        self.objects.push(Object::Native(native.clone()));
        native
    }

    /// Number of objects allocated so far.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Return true if nothing has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_contents_share_one_object() {
        let mut heap = Heap::default();
        let a = heap.intern("hello");
        let b = heap.intern(String::from("hel") + "lo");
        assert_eq!(a, b);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.str(a), "hello");

        let c = heap.intern("world");
        assert_ne!(a, c);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn lookup_does_not_allocate() {
        let mut heap = Heap::default();
        assert_eq!(heap.lookup("x"), None);
        assert!(heap.is_empty());
        let x = heap.intern("x");
        assert_eq!(heap.lookup("x"), Some(x));
    }

    #[test]
    fn functions_are_tracked() {
        let mut heap = Heap::default();
        let f = heap.alloc_function(Function::new(None));
        let g = heap.alloc_function(Function::new(None));
        assert!(Gc::ptr_eq(&f, &f.clone()));
        assert!(!Gc::ptr_eq(&f, &g));
        assert_eq!(heap.len(), 2);
    }
}
