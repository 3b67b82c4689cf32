// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The owning shell thread and its request futures.
//!
//! Once a [`Shell`] is handed to [`ShellExecutor::spawn`], only the executor
//! thread touches it. Other threads submit closures through a cloneable
//! [`ShellHandle`]; each submission runs, the shell is flushed, and the
//! outcome is sent back on a oneshot channel wrapped in a [`Request`].

use core::fmt;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use canopy_core::error::SceneError;
use canopy_core::policy::DestroyOrigin;
use canopy_core::scene::{NodeId, ShellTree};
use futures::channel::oneshot;
use tracing::{debug, trace};

use crate::{Shell, ShellError};

type Reply = Box<dyn FnOnce(&Shell) + Send>;
type Task = Box<dyn FnOnce(&mut Shell) -> Option<Reply> + Send>;

enum Message {
    Run(Task),
    Stop,
}

fn task<F>(f: F) -> Task
where
    F: FnOnce(&mut Shell) -> Option<Reply> + Send + 'static,
{
    Box::new(f)
}

fn reply<F>(f: F) -> Option<Reply>
where
    F: FnOnce(&Shell) + Send + 'static,
{
    Some(Box::new(f))
}

/// Runs a [`Shell`] on a dedicated thread.
pub struct ShellExecutor {
    handle: ShellHandle,
    thread: JoinHandle<Shell>,
}

impl fmt::Debug for ShellExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellExecutor")
            .field("thread", &self.thread.thread().name())
            .finish_non_exhaustive()
    }
}

impl ShellExecutor {
    /// Moves `shell` onto a new thread named `thread_name`.
    pub fn spawn(shell: Shell, thread_name: &str) -> Result<Self, ShellError> {
        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name(thread_name.to_owned())
            .spawn(move || run(shell, &receiver))?;
        Ok(Self {
            handle: ShellHandle { sender },
            thread,
        })
    }

    /// Returns a handle for submitting work.
    #[must_use]
    pub fn handle(&self) -> ShellHandle {
        self.handle.clone()
    }

    /// Stops the thread after the tasks already queued and returns the shell.
    ///
    /// Tasks submitted after this call resolve to [`ShellError::Rejected`].
    pub fn shutdown(self) -> Result<Shell, ShellError> {
        // The thread may already be gone, in which case join reports it.
        let _ = self.handle.sender.send(Message::Stop);
        self.thread.join().map_err(|_| ShellError::Panicked)
    }
}

fn run(mut shell: Shell, receiver: &mpsc::Receiver<Message>) -> Shell {
    debug!("shell thread started");
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => {
                let answer = job(&mut shell);
                shell.flush();
                if let Some(answer) = answer {
                    answer(&shell);
                }
            }
            Message::Stop => break,
        }
    }
    debug!("shell thread stopped");
    shell
}

/// A cloneable, thread-safe handle to a running [`ShellExecutor`].
#[derive(Clone)]
pub struct ShellHandle {
    sender: mpsc::Sender<Message>,
}

impl fmt::Debug for ShellHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellHandle").finish_non_exhaustive()
    }
}

impl ShellHandle {
    /// Runs `f` on the shell thread and resolves to its result.
    ///
    /// The shell is flushed after `f` returns and before the request
    /// resolves, so display calls caused by `f` have been made by then.
    pub fn submit<T, F>(&self, f: F) -> Request<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Shell) -> Result<T, ShellError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(task(move |shell| {
            let result = f(shell);
            reply(move |_| {
                let _ = tx.send(result);
            })
        }));
        Request { receiver: rx }
    }

    /// Runs `f` on the shell thread without waiting for it.
    pub fn post<F>(&self, f: F) -> Result<(), ShellError>
    where
        F: FnOnce(&mut Shell) + Send + 'static,
    {
        let job = task(move |shell| {
            f(shell);
            None
        });
        self.sender
            .send(Message::Run(job))
            .map_err(|_| ShellError::Rejected)
    }

    /// Asks `node` to move to `(x, y)` relative to its parent.
    pub fn request_move(&self, node: NodeId, x: i32, y: i32) -> Request<()> {
        self.submit_for(node, move |tree| tree.request_move(node, x, y))
    }

    /// Asks `node` to resize.
    pub fn request_resize(&self, node: NodeId, width: u32, height: u32) -> Request<()> {
        self.submit_for(node, move |tree| tree.request_resize(node, width, height))
    }

    /// Asks `node` to raise.
    pub fn request_raise(&self, node: NodeId) -> Request<()> {
        self.submit_for(node, move |tree| tree.request_raise(node))
    }

    /// Asks `node` to lower.
    pub fn request_lower(&self, node: NodeId) -> Request<()> {
        self.submit_for(node, move |tree| tree.request_lower(node))
    }

    /// Asks `node` to become visible.
    pub fn request_show(&self, node: NodeId) -> Request<()> {
        self.submit_for(node, move |tree| tree.request_show(node))
    }

    /// Asks `node` to become hidden.
    pub fn request_hide(&self, node: NodeId) -> Request<()> {
        self.submit_for(node, move |tree| tree.request_hide(node))
    }

    /// Asks `node` to move under `new_parent`.
    pub fn request_reparent(&self, node: NodeId, new_parent: NodeId) -> Request<()> {
        self.submit_for(node, move |tree| tree.request_reparent(node, new_parent))
    }

    /// Tears down `node` and, per the destroy policy, its subtree.
    pub fn destroy(&self, node: NodeId) -> Request<()> {
        self.submit(move |shell| Ok(shell.tree_mut().destroy(node, DestroyOrigin::Teardown)?))
    }

    /// Posts a request and resolves once it has been dispatched and flushed.
    ///
    /// Resolves to [`ShellError::TargetDestroyed`] if `node` did not survive
    /// the flush.
    fn submit_for<F>(&self, node: NodeId, f: F) -> Request<()>
    where
        F: FnOnce(&mut ShellTree) -> Result<(), SceneError> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(task(move |shell| {
            let posted = f(shell.tree_mut()).map_err(ShellError::from);
            reply(move |shell| {
                let result = posted.and_then(|()| {
                    if shell.tree().is_alive(node) {
                        Ok(())
                    } else {
                        Err(ShellError::TargetDestroyed(node))
                    }
                });
                let _ = tx.send(result);
            })
        }));
        Request { receiver: rx }
    }

    fn send(&self, job: Task) {
        if self.sender.send(Message::Run(job)).is_err() {
            // Dropping the task drops its reply sender and cancels the request.
            trace!("shell executor gone; task rejected");
        }
    }
}

/// The pending outcome of a task submitted to the shell thread.
///
/// Await it from async code or call [`wait`](Self::wait). Never wait on the
/// shell thread itself; the task cannot run while that thread is blocked.
#[must_use = "a request does nothing unless its outcome is awaited"]
pub struct Request<T> {
    receiver: oneshot::Receiver<Result<T, ShellError>>,
}

impl<T> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request").finish_non_exhaustive()
    }
}

impl<T> Request<T> {
    /// Blocks the calling thread until the request resolves.
    pub fn wait(self) -> Result<T, ShellError> {
        futures::executor::block_on(self)
    }
}

impl<T> Future for Request<T> {
    type Output = Result<T, ShellError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|outcome| match outcome {
            Ok(result) => result,
            Err(oneshot::Canceled) => Err(ShellError::Rejected),
        })
    }
}
