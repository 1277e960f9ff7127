// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Detects shutdown of the runtime a transport was created on

use tokio::sync::oneshot::{self, error::TryRecvError};

/// Liveness probe for the tokio runtime that was current at construction.
///
/// A parked task on that runtime holds the sender half of a oneshot channel.
/// Runtime shutdown drops the task, and with it the sender, which the
/// receiver observes as `Closed`.
#[derive(Debug)]
pub(crate) struct RuntimeWatch {
    probe: Option<oneshot::Receiver<()>>,
}

impl RuntimeWatch {
    /// Watch the current runtime. Outside a runtime there is nothing to
    /// watch and the probe always reports alive.
    pub(crate) fn current() -> Self {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => return Self { probe: None },
        };

        let (mut tx, rx) = oneshot::channel::<()>();
        handle.spawn(async move {
            tx.closed().await;
        });
        Self { probe: Some(rx) }
    }

    /// Check if the runtime is still running
    pub(crate) fn is_alive(&mut self) -> bool {
        match &mut self.probe {
            None => true,
            Some(rx) => matches!(rx.try_recv(), Err(TryRecvError::Empty)),
        }
    }
}
