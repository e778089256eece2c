//! Awaitable simulation triggers.
//!
//! A task suspends on a [`TriggerFuture`] and is resumed by the kernel when
//! the matching clock phase or time point is reached.

use crate::simulation::SimHandle;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// The points in a time step a task can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    RisingEdge,
    FallingEdge,
    /// All signal values of the current time step are settled.
    ReadOnly,
    /// The start of the next time step that has any event.
    NextTimeStep,
    /// `n` time units from now (at least one).
    Timer(u64),
}

/// Shared between a suspended trigger future and the kernel list it is
/// registered in.
pub struct WaitSlot {
    fired: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl WaitSlot {
    pub(crate) fn new(waker: Waker) -> Self {
        Self {
            fired: Cell::new(false),
            waker: RefCell::new(Some(waker)),
        }
    }

    pub(crate) fn fire(&self) {
        self.fired.set(true);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.get()
    }
}

impl std::fmt::Debug for WaitSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSlot")
            .field("fired", &self.fired.get())
            .finish()
    }
}

/// Future returned by the trigger methods of [`SimHandle`].
#[must_use = "triggers do nothing unless awaited"]
pub struct TriggerFuture {
    handle: SimHandle,
    trigger: Trigger,
    slot: Option<Rc<WaitSlot>>,
}

impl TriggerFuture {
    pub(crate) fn new(handle: SimHandle, trigger: Trigger) -> Self {
        Self {
            handle,
            trigger,
            slot: None,
        }
    }
}

impl Future for TriggerFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match &this.slot {
            Some(slot) if slot.is_fired() => Poll::Ready(()),
            Some(slot) => {
                *slot.waker.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
            None => {
                let slot = Rc::new(WaitSlot::new(cx.waker().clone()));
                this.handle.register(this.trigger, Rc::clone(&slot));
                this.slot = Some(slot);
                Poll::Pending
            }
        }
    }
}
