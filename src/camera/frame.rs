//! Display resource ownership.
//!
//! A `Surface` turns a frame payload into something the display can show and
//! takes it back when it is no longer shown. `FrameBuffer` holds the single
//! live resource and swaps it with replace-and-release semantics: the new
//! resource is installed before the old one is released, so the display never
//! has an empty gap between frames.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty frame payload")]
    Empty,
    #[error("frame decode failed: {0}")]
    Decode(String),
}

pub trait Surface {
    type Resource;

    /// Build a displayable resource from a raw payload
    fn create(&mut self, payload: &[u8]) -> Result<Self::Resource, FrameError>;

    /// Give a resource back once nothing displays it any more
    fn release(&mut self, resource: Self::Resource);
}

pub struct FrameBuffer<S: Surface> {
    surface: S,
    active: Option<S::Resource>,
    installs: u64,
    releases: u64,
}

impl<S: Surface> FrameBuffer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            active: None,
            installs: 0,
            releases: 0,
        }
    }

    /// Decode `payload`, show it, then release whatever was shown before.
    /// On failure the current frame stays up untouched.
    pub fn replace(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        let next = self.surface.create(payload)?;
        let previous = self.active.replace(next);
        self.installs += 1;
        if let Some(previous) = previous {
            self.surface.release(previous);
            self.releases += 1;
        }
        Ok(())
    }

    /// Release the active resource, if any
    pub fn clear(&mut self) {
        if let Some(resource) = self.active.take() {
            self.surface.release(resource);
            self.releases += 1;
        }
    }

    pub fn active(&self) -> Option<&S::Resource> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut S::Resource> {
        self.active.as_mut()
    }

    pub fn has_frame(&self) -> bool {
        self.active.is_some()
    }

    pub fn installs(&self) -> u64 {
        self.installs
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: Surface> Drop for FrameBuffer<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{FrameError, Surface};

    /// Ledger shared between a test and the surface it hands to a FrameBuffer
    #[derive(Debug, Default)]
    pub struct Ledger {
        pub created: Vec<u64>,
        pub released: Vec<u64>,
    }

    /// Surface whose resources are sequence numbers; rejects empty payloads
    pub struct CountingSurface {
        next: u64,
        pub ledger: Rc<RefCell<Ledger>>,
    }

    impl CountingSurface {
        pub fn new() -> (Self, Rc<RefCell<Ledger>>) {
            let ledger = Rc::new(RefCell::new(Ledger::default()));
            (
                Self {
                    next: 0,
                    ledger: ledger.clone(),
                },
                ledger,
            )
        }
    }

    impl Surface for CountingSurface {
        type Resource = u64;

        fn create(&mut self, payload: &[u8]) -> Result<u64, FrameError> {
            if payload.is_empty() {
                return Err(FrameError::Empty);
            }
            let id = self.next;
            self.next += 1;
            self.ledger.borrow_mut().created.push(id);
            Ok(id)
        }

        fn release(&mut self, resource: u64) {
            self.ledger.borrow_mut().released.push(resource);
        }
    }
}
