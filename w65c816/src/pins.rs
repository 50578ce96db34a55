//! External interrupt request lines.
//!
//! NMI, IRQ and RESET are modelled as single-writer/single-reader latches:
//! any holder of a `Pins` handle may raise them, and the interpreter consumes
//! them between instructions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Pins {
    inner: Arc<PinState>,
}

#[derive(Default)]
struct PinState {
    nmi: AtomicBool,
    irq: AtomicBool,
    reset: AtomicBool,
}

impl Pins {
    pub fn new() -> Pins {
        Pins::default()
    }

    pub fn raise_nmi(&self) {
        self.inner.nmi.store(true, Ordering::Release);
    }

    pub fn raise_irq(&self) {
        self.inner.irq.store(true, Ordering::Release);
    }

    pub fn raise_reset(&self) {
        self.inner.reset.store(true, Ordering::Release);
    }

    pub(crate) fn take_nmi(&self) -> bool {
        self.inner.nmi.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn take_irq(&self) -> bool {
        self.inner.irq.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn take_reset(&self) -> bool {
        self.inner.reset.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::Pins;

    #[test]
    fn latches_are_consumed_once() {
        let pins = Pins::new();
        let handle = pins.clone();
        handle.raise_nmi();
        assert!(pins.take_nmi());
        assert!(!pins.take_nmi());
        assert!(!pins.take_irq());
    }
}
