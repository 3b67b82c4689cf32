// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display-event ingestion.
//!
//! A producer thread reads native events, converts them and pushes them on a
//! bounded queue, blocking while the queue is full. A dispatcher thread pops
//! them in order, resolves the target node and hands each one to the shell
//! thread, waiting until it has been applied before popping the next. A
//! busy shell therefore stalls the producer once the queue is full.

use std::io;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use canopy_core::event::Notification;
use canopy_core::scene::SurfaceHandle;
use tracing::{debug, trace, warn};

use crate::{ShellError, ShellHandle, SurfaceRegistry};

/// A blocking source of native display events.
pub trait DisplayEventSource: Send + 'static {
    /// The native event type.
    type Event: Send + 'static;

    /// Blocks until the next event is available.
    ///
    /// `Ok(None)` means the display connection closed.
    fn next_event(&mut self) -> io::Result<Option<Self::Event>>;
}

/// Turns native events into notifications.
pub trait EventConverter: Send + 'static {
    /// The native event type.
    type Event;

    /// Converts one event, or returns `None` for events the shell ignores.
    fn convert(&self, event: &Self::Event) -> Option<DisplayNotification>;
}

/// A notification addressed to a native surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayNotification {
    /// The surface the display reported on.
    pub surface: SurfaceHandle,
    /// What happened to it.
    pub notification: Notification,
}

impl DisplayNotification {
    /// Creates a notification for `surface`.
    #[must_use]
    pub fn new(surface: SurfaceHandle, notification: Notification) -> Self {
        Self {
            surface,
            notification,
        }
    }
}

/// Counters reported when a pump stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Native events read from the source.
    pub read: u64,
    /// Events the converter ignored.
    pub filtered: u64,
    /// Notifications dropped because no node owned their surface.
    pub unresolved: u64,
    /// Notifications handed to the shell thread.
    pub delivered: u64,
}

/// The running producer and dispatcher threads.
#[derive(Debug)]
pub struct EventPump {
    producer: JoinHandle<io::Result<(u64, u64)>>,
    dispatcher: JoinHandle<(u64, u64)>,
}

impl EventPump {
    /// Starts pumping events from `source` into the shell behind `shell`.
    ///
    /// `capacity` bounds the queue between the two threads; zero is treated
    /// as one.
    pub fn spawn<S, C>(
        source: S,
        converter: C,
        registry: SurfaceRegistry,
        shell: ShellHandle,
        capacity: usize,
    ) -> Result<Self, ShellError>
    where
        S: DisplayEventSource,
        C: EventConverter<Event = S::Event>,
    {
        let (queue, pending) = mpsc::sync_channel(capacity.max(1));
        let dispatcher = thread::Builder::new()
            .name(String::from("canopy-dispatch"))
            .spawn(move || dispatch(&pending, &registry, &shell))?;
        let producer = thread::Builder::new()
            .name(String::from("canopy-events"))
            .spawn(move || produce(source, &converter, &queue))?;
        Ok(Self {
            producer,
            dispatcher,
        })
    }

    /// Waits for the source to close and the queue to drain.
    ///
    /// Returns the source's error if it failed.
    pub fn join(self) -> Result<PumpStats, ShellError> {
        let produced = self.producer.join();
        let dispatched = self.dispatcher.join();
        let (read, filtered) = produced.map_err(|_| ShellError::Panicked)??;
        let (delivered, unresolved) = dispatched.map_err(|_| ShellError::Panicked)?;
        let stats = PumpStats {
            read,
            filtered,
            unresolved,
            delivered,
        };
        debug!(?stats, "event pump stopped");
        Ok(stats)
    }
}

fn produce<S, C>(
    mut source: S,
    converter: &C,
    queue: &SyncSender<DisplayNotification>,
) -> io::Result<(u64, u64)>
where
    S: DisplayEventSource,
    C: EventConverter<Event = S::Event>,
{
    let (mut read, mut filtered) = (0, 0);
    loop {
        let event = match source.next_event() {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "display event source failed");
                return Err(err);
            }
        };
        read += 1;
        let Some(notification) = converter.convert(&event) else {
            filtered += 1;
            continue;
        };
        if queue.send(notification).is_err() {
            debug!("event dispatcher gone; producer exiting");
            break;
        }
    }
    Ok((read, filtered))
}

fn dispatch(
    pending: &Receiver<DisplayNotification>,
    registry: &SurfaceRegistry,
    shell: &ShellHandle,
) -> (u64, u64) {
    let (mut delivered, mut unresolved) = (0, 0);
    for DisplayNotification {
        surface,
        notification,
    } in pending
    {
        let Some(node) = registry.lookup(surface) else {
            trace!(?surface, ?notification, "no node for surface; dropped");
            unresolved += 1;
            continue;
        };
        // Waiting for the delivery to be applied keeps the bounded queue
        // full while the shell is busy, and lets the next lookup see
        // surfaces the delivery attached.
        let applied = shell
            .submit(move |shell| {
                if let Err(err) = shell.deliver(node, notification) {
                    trace!(%err, "notification not applied");
                }
                Ok(())
            })
            .wait();
        if applied.is_err() {
            debug!("shell stopped; dispatcher exiting");
            break;
        }
        delivered += 1;
    }
    (delivered, unresolved)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use canopy_core::event::EventKind;
    use canopy_core::geometry::Rect;
    use canopy_core::scene::NodeId;

    use super::*;
    use crate::headless::{HeadlessBackend, Passthrough, channel_source};
    use crate::{Shell, ShellConfig, ShellExecutor};

    const ROOT: SurfaceHandle = SurfaceHandle(1);
    const CLIENT: SurfaceHandle = SurfaceHandle(2);

    struct Failing;

    impl DisplayEventSource for Failing {
        type Event = DisplayNotification;

        fn next_event(&mut self) -> io::Result<Option<DisplayNotification>> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "display gone"))
        }
    }

    /// Yields `total` focus events for the client, counting every read.
    struct Counted {
        reads: Arc<AtomicUsize>,
        total: usize,
    }

    impl DisplayEventSource for Counted {
        type Event = DisplayNotification;

        fn next_event(&mut self) -> io::Result<Option<DisplayNotification>> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            Ok((n < self.total)
                .then(|| DisplayNotification::new(CLIENT, Notification::FocusGained)))
        }
    }

    fn running() -> (ShellExecutor, NodeId, Arc<Mutex<Vec<EventKind>>>) {
        let mut shell = Shell::new(
            &ShellConfig::default(),
            Some(ROOT),
            Rect::new(0, 0, 320, 240),
            HeadlessBackend::new(),
        );
        let root = shell.tree().root();
        let client = shell
            .attach_surface(root, CLIENT, Rect::new(0, 0, 10, 10))
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        shell.subscribe(Some(client), move |_, event| {
            log.lock().unwrap().push(event.kind.clone());
        });
        (ShellExecutor::spawn(shell, "pump-test").unwrap(), client, seen)
    }

    #[test]
    fn delivers_in_display_order_and_drops_unknown_surfaces() {
        let (executor, _, seen) = running();
        let registry = executor
            .handle()
            .submit(|shell| Ok(shell.registry().clone()))
            .wait()
            .unwrap();
        let (events, source) = channel_source();
        let pump = EventPump::spawn(source, Passthrough, registry, executor.handle(), 2).unwrap();

        let sent = [
            DisplayNotification::new(CLIENT, Notification::FocusGained),
            DisplayNotification::new(SurfaceHandle(99), Notification::FocusGained),
            DisplayNotification::new(CLIENT, Notification::Protocol("ping".into())),
            DisplayNotification::new(CLIENT, Notification::FocusLost),
        ];
        for event in sent {
            events.send(event).unwrap();
        }
        drop(events);

        let stats = pump.join().unwrap();
        assert_eq!(
            stats,
            PumpStats {
                read: 4,
                filtered: 0,
                unresolved: 1,
                delivered: 3,
            }
        );
        executor.shutdown().unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            [
                EventKind::Notify(Notification::FocusGained),
                EventKind::Notify(Notification::Protocol("ping".into())),
                EventKind::Notify(Notification::FocusLost),
            ]
        );
    }

    #[test]
    fn source_failure_is_reported_on_join() {
        let (executor, _, _) = running();
        let pump = EventPump::spawn(
            Failing,
            Passthrough,
            SurfaceRegistry::new(),
            executor.handle(),
            1,
        )
        .unwrap();
        assert!(matches!(pump.join(), Err(ShellError::Io(_))));
        executor.shutdown().unwrap();
    }

    #[test]
    fn busy_shell_stalls_the_producer() {
        let (executor, _, seen) = running();
        let handle = executor.handle();
        let registry = handle
            .submit(|shell| Ok(shell.registry().clone()))
            .wait()
            .unwrap();
        let (release, blocked) = std::sync::mpsc::channel::<()>();
        handle
            .post(move |_| {
                let _ = blocked.recv();
            })
            .unwrap();

        let reads = Arc::new(AtomicUsize::new(0));
        let source = Counted {
            reads: Arc::clone(&reads),
            total: 200,
        };
        let pump = EventPump::spawn(source, Passthrough, registry, handle, 1).unwrap();
        thread::sleep(Duration::from_millis(100));

        // One event waits in the dispatcher, one fills the queue and the
        // producer is parked sending the third.
        let read_while_blocked = reads.load(Ordering::SeqCst);
        assert!(
            read_while_blocked <= 3,
            "producer read {read_while_blocked} events while the shell was busy"
        );

        release.send(()).unwrap();
        let stats = pump.join().unwrap();
        assert_eq!(stats.read, 200, "every event is eventually read");
        assert_eq!(stats.delivered, 200, "every event is delivered");
        executor.shutdown().unwrap();
        assert_eq!(seen.lock().unwrap().len(), 200);
    }
}
