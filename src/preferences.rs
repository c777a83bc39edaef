//! Persists the position of the floating "add record" button.
//!
//! The button is dragged around by the user, which produces a burst of
//! position updates. [PreferenceStore::save] holds on to the latest position
//! and only writes it once no further update has arrived for the debounce
//! window.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::{Error, gateway::PreferenceGateway};

/// The key the button position is stored under.
pub const BUTTON_POSITION_KEY: &str = "plusButtonPosition";

/// Screen coordinates of the floating "add record" button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ButtonPosition {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Default for ButtonPosition {
    fn default() -> Self {
        Self { x: 200.0, y: 400.0 }
    }
}

/// Loads and saves the button position through a [PreferenceGateway].
#[derive(Debug)]
pub struct PreferenceStore<G> {
    gateway: Arc<G>,
    debounce: Duration,
    pending: Arc<Mutex<Option<ButtonPosition>>>,
    timer: Option<JoinHandle<()>>,
}

impl<G: PreferenceGateway + 'static> PreferenceStore<G> {
    /// Create a store that waits `debounce` after the last call to
    /// [Self::save] before writing.
    pub fn new(gateway: Arc<G>, debounce: Duration) -> Self {
        Self {
            gateway,
            debounce,
            pending: Arc::new(Mutex::new(None)),
            timer: None,
        }
    }

    /// The stored button position, or [ButtonPosition::default] if nothing
    /// has been stored or the stored value cannot be read.
    ///
    /// A position passed to [Self::save] that has not been written yet is
    /// returned in place of the stored one.
    pub fn load(&self) -> ButtonPosition {
        if let Some(position) = self.pending.lock().ok().and_then(|pending| *pending) {
            return position;
        }

        match read_position(self.gateway.as_ref()) {
            Ok(Some(position)) => position,
            Ok(None) => ButtonPosition::default(),
            Err(error) => {
                tracing::warn!("Could not load the button position, using the default: {error}");
                ButtonPosition::default()
            }
        }
    }

    /// Schedule `position` to be written once the debounce window has passed
    /// without another call to `save`.
    ///
    /// # Panics
    /// Panics if called outside of a tokio runtime.
    pub fn save(&mut self, position: ButtonPosition) {
        match self.pending.lock() {
            Ok(mut pending) => *pending = Some(position),
            Err(_) => {
                tracing::error!("Could not acquire the pending button position lock.");
                return;
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let gateway = Arc::clone(&self.gateway);
        let pending = Arc::clone(&self.pending);
        let debounce = self.debounce;

        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            if let Some(position) = take_pending(&pending) {
                write_position(gateway.as_ref(), position);
            }
        }));
    }

    /// Write the pending position now instead of waiting for the debounce
    /// window, e.g. when the application is about to exit.
    pub fn flush(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        if let Some(position) = take_pending(&self.pending) {
            write_position(self.gateway.as_ref(), position);
        }
    }
}

fn take_pending(pending: &Mutex<Option<ButtonPosition>>) -> Option<ButtonPosition> {
    match pending.lock() {
        Ok(mut pending) => pending.take(),
        Err(_) => {
            tracing::error!("Could not acquire the pending button position lock.");
            None
        }
    }
}

fn read_position(gateway: &impl PreferenceGateway) -> Result<Option<ButtonPosition>, Error> {
    gateway
        .get_bytes(BUTTON_POSITION_KEY)?
        .map(|bytes| serde_json::from_slice(&bytes))
        .transpose()
        .map_err(Error::from)
}

fn write_position(gateway: &impl PreferenceGateway, position: ButtonPosition) {
    let result = serde_json::to_vec(&position)
        .map_err(Error::from)
        .and_then(|bytes| gateway.set_bytes(BUTTON_POSITION_KEY, &bytes));

    match result {
        Ok(()) => tracing::debug!("Saved button position {position:?}."),
        Err(error) => tracing::error!("Could not save button position {position:?}: {error}"),
    }
}
