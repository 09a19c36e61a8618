use crate::error::LoadError;

/// Ordered observer list. Every callback runs on each emit, in insertion
/// order.
pub struct Listeners<A> {
    callbacks: Vec<Box<dyn FnMut(&A)>>,
}

impl<A> Default for Listeners<A> {
    fn default() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }
}

impl<A> Listeners<A> {
    pub fn push(&mut self, callback: impl FnMut(&A) + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn emit(&mut self, value: &A) {
        for callback in self.callbacks.iter_mut() {
            callback(value);
        }
    }

    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Everything a [`TrackController`](super::TrackController) can notify.
#[derive(Default)]
pub struct ControllerEvents {
    pub play: Listeners<()>,
    pub pause: Listeners<()>,
    pub end: Listeners<()>,
    pub progress: Listeners<f32>,
    /// Narration finished loading.
    pub ready: Listeners<()>,
    pub error: Listeners<LoadError>,
}

impl ControllerEvents {
    pub fn clear(&mut self) {
        self.play.clear();
        self.pause.clear();
        self.end.clear();
        self.progress.clear();
        self.ready.clear();
        self.error.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.play.is_empty()
            && self.pause.is_empty()
            && self.end.is_empty()
            && self.progress.is_empty()
            && self.ready.is_empty()
            && self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_run_in_insertion_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::<f32>::default();

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            listeners.push(move |value| order.borrow_mut().push((tag, *value)));
        }
        listeners.emit(&0.25);

        assert_eq!(
            *order.borrow(),
            vec![("first", 0.25), ("second", 0.25), ("third", 0.25)]
        );
    }

    #[test]
    fn clear_drops_every_list() {
        let mut events = ControllerEvents::default();
        events.play.push(|_| {});
        events.progress.push(|_| {});
        assert!(!events.is_empty());

        events.clear();
        assert!(events.is_empty());
    }
}
