use std::{collections::BTreeMap, io, os::fd::AsRawFd};

use crate::system::poll::PollSet;

use super::io_util::was_interrupted;

pub(crate) trait Process: Sized {
    /// IO Events that this process should handle.
    type Event: Copy + Eq;
    /// Reason why the event loop should break.
    ///
    /// See [`EventRegistry::set_break`] for more information.
    type Break;
    /// Reason why the event loop should exit.
    ///
    /// See [`EventRegistry::set_exit`] for more information.
    type Exit;
    /// Handle the corresponding event.
    fn on_event(&mut self, event: Self::Event, registry: &mut EventRegistry<Self>);
}

enum Status<T: Process> {
    Continue,
    Stop(StopReason<T>),
}

impl<T: Process> Status<T> {
    fn take_stop(&mut self) -> Option<StopReason<T>> {
        // If the status ends up to be `Continue`, we are replacing it by another `Continue`.
        let status = std::mem::replace(self, Self::Continue);
        match status {
            Status::Continue => None,
            Status::Stop(reason) => Some(reason),
        }
    }

    fn take_break(&mut self) -> Option<T::Break> {
        match self.take_stop()? {
            StopReason::Break(break_reason) => Some(break_reason),
            reason @ StopReason::Exit(_) => {
                // Replace back the status because it was not a `Break`.
                *self = Self::Stop(reason);
                None
            }
        }
    }
}

pub(crate) enum StopReason<T: Process> {
    Break(T::Break),
    Exit(T::Exit),
}

#[derive(PartialEq, Eq, Hash, Ord, PartialOrd, Clone, Copy)]
struct EventId(usize);

/// A type able to register file descriptors to be polled.
pub(crate) struct EventRegistry<T: Process> {
    seed: usize,
    poll_set: PollSet<EventId>,
    events: BTreeMap<EventId, T::Event>,
    status: Status<T>,
}

impl<T: Process> EventRegistry<T> {
    /// Create a new and empty registry.
    pub(crate) fn new() -> Self {
        Self {
            seed: 0,
            poll_set: PollSet::new(),
            events: BTreeMap::new(),
            status: Status::Continue,
        }
    }

    fn next_id(&mut self) -> EventId {
        let id = EventId(self.seed);
        self.seed += 1;
        id
    }

    /// Set the `fd` descriptor to be polled for read events and dispatch `event` if `fd` is
    /// ready.
    ///
    /// Events are dispatched in registration order when several descriptors are ready at once.
    pub(crate) fn register_read_event<F: AsRawFd>(&mut self, fd: &F, event: T::Event) {
        let id = self.next_id();
        self.poll_set.add_fd_read(id, fd);
        self.events.insert(id, event);
    }

    /// Stop the event loop when the current callback is done and set a reason for it.
    ///
    /// This means that the event loop will stop even if other events are ready.
    pub(crate) fn set_break(&mut self, reason: T::Break) {
        self.status = Status::Stop(StopReason::Break(reason));
    }

    /// Stop the event loop when the callbacks for the events that are ready by now have been
    /// dispatched and set a reason for it.
    pub(crate) fn set_exit(&mut self, reason: T::Exit) {
        self.status = Status::Stop(StopReason::Exit(reason));
    }

    /// Run the event loop for this handler.
    ///
    /// The event loop will continue indefinitely unless you call [`EventRegistry::set_break`] or
    /// [`EventRegistry::set_exit`]. Polling is retried when a signal interrupts it, any other
    /// polling error stops the loop.
    pub(crate) fn event_loop(&mut self, process: &mut T) -> io::Result<StopReason<T>> {
        let mut event_queue = Vec::with_capacity(self.events.len());

        loop {
            let ids = match self.poll_set.poll() {
                Ok(ids) => ids,
                Err(err) if was_interrupted(&err) => continue,
                Err(err) => return Err(err),
            };

            for id in ids {
                event_queue.push(self.events[&id]);
            }

            for event in event_queue.drain(..) {
                process.on_event(event, self);

                if let Some(reason) = self.status.take_break() {
                    return Ok(StopReason::Break(reason));
                }
            }

            if let Some(reason) = self.status.take_stop() {
                return Ok(reason);
            }
        }
    }
}
