use std::collections::HashMap;

/// Resources addressed by opaque `u64` handles. Handle 0 is never issued.
pub struct HandleStore<T> {
    items: HashMap<u64, T>,
    next_handle: u64,
}

impl<T> HandleStore<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn insert(&mut self, item: T) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.items.insert(handle, item);
        handle
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        self.items.get(&handle)
    }

    pub fn remove(&mut self, handle: u64) -> Option<T> {
        self.items.remove(&handle)
    }

    pub fn contains(&self, handle: u64) -> bool {
        self.items.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
