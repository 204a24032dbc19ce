//! Multi-listener notifications.
//!
//! An [`Event`] carries no payload: handlers receive the sender and read
//! whatever state they need from it.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub struct Event<S: ?Sized> {
    handlers: Vec<(SubscriptionId, Box<dyn FnMut(&S)>)>,
    next_id: u64,
}

impl<S: ?Sized> Default for Event<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> Event<S> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 1,
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&S) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns false if the subscription was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _)| *sub != id);
        self.handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn emit(&mut self, sender: &S) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(sender);
        }
    }
}
