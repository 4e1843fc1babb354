//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

//! Process-wide shutdown signal.
//!
//! The crawler runs until killed, but every suspension point (dial timeouts, backoff waits, re-graft delays,
//! liveness polls) is raced against a [`ShutdownSignal`] so that a supervised shutdown never has to wait out a raw
//! sleep.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    task::{Context, Poll},
    time::Duration,
};

use futures::{
    channel::oneshot,
    future::{FusedFuture, Shared},
    FutureExt,
};

/// Trigger for shutdowns.
///
/// Use `to_signal` to create a future which will resolve when `Shutdown` is triggered.
/// Use `trigger` to signal. All signals will resolve.
///
/// _Note_: Signals also resolve once every clone of the `Shutdown` has been dropped, so the instance should be held
/// for as long as the crawler is expected to run.
#[derive(Clone, Debug)]
pub struct Shutdown {
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    signal: ShutdownSignal,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            sender: Arc::new(Mutex::new(Some(tx))),
            signal: ShutdownSignal { inner: rx.shared() },
        }
    }

    pub fn trigger(&mut self) {
        if let Some(tx) = self.sender().take() {
            let _ignore = tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.sender().is_none()
    }

    pub fn to_signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }

    fn sender(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// The wait was cut short because shutdown was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Interrupted by shutdown")]
pub struct Interrupted;

/// Receiver end of a shutdown signal. Once it resolves the consumer should wind down.
#[derive(Debug, Clone)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ShutdownSignal {
    inner: Shared<oneshot::Receiver<()>>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        self.inner.clone().now_or_never().is_some()
    }

    /// Runs `fut` to completion unless shutdown is triggered first.
    pub async fn run_until<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let signal = self.clone();
        tokio::select! {
            biased;
            _ = signal => Err(Interrupted),
            output = fut => Ok(output),
        }
    }

    /// Sleeps for `duration`, returning `Err(Interrupted)` as soon as shutdown is triggered.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        self.run_until(tokio::time::sleep(duration)).await
    }
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Resolve on both an explicit trigger and a dropped sender
        Pin::new(&mut self.inner).poll(cx).map(|_| ())
    }
}

impl FusedFuture for ShutdownSignal {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}
