use strider_common::Disposable;

/// Resources released at teardown, in registration order.
#[derive(Default)]
pub struct DisposerRegistry {
    items: Vec<Box<dyn Disposable>>,
}

impl DisposerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, item: Box<dyn Disposable>) {
        tracing::trace!(name = item.name(), "disposable registered");
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.name()).collect()
    }

    /// Release everything. Consumes the registry. Returns the count released.
    pub fn dispose_all(self) -> usize {
        let count = self.items.len();
        for item in self.items {
            tracing::debug!(name = item.name(), "disposing");
            item.dispose();
        }
        count
    }
}
