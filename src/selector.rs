//! Sticky base selection: which origin answered last in this session.

use std::sync::{Arc, Mutex};

use crate::network::Origin;
use crate::storage::Storage;

/// Session slot holding `"local"` or `"prod"`.
pub const BASE_KEY: &str = "apiBase";

pub struct BaseSelector {
    chosen: Mutex<Option<Origin>>,
    session: Arc<dyn Storage>,
}

impl BaseSelector {
    /// Restores a previously recorded choice from the session store, if any.
    pub fn new(session: Arc<dyn Storage>) -> Self {
        let chosen = session.get(BASE_KEY).and_then(|s| match s.parse::<Origin>() {
            Ok(o) => Some(o),
            Err(_) => {
                log::warn!("Ignoring unrecognized stored base '{}'", s);
                None
            }
        });
        if let Some(o) = chosen {
            log::debug!("Restored base selection: {}", o.label());
        }
        BaseSelector {
            chosen: Mutex::new(chosen),
            session,
        }
    }

    /// The recorded choice, or `None` before first contact.
    pub fn sticky(&self) -> Option<Origin> {
        *self.chosen.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The base requests go to by default; `Local` until something is recorded.
    pub fn active(&self) -> Origin {
        self.sticky().unwrap_or(Origin::Local)
    }

    pub fn set(&self, origin: Origin) {
        {
            let mut chosen = self.chosen.lock().unwrap_or_else(|e| e.into_inner());
            if *chosen == Some(origin) {
                return;
            }
            *chosen = Some(origin);
        }
        self.session.set(BASE_KEY, origin.as_str());
        log::debug!("Base selected: {}", origin.label());
    }

    pub fn force(&self, origin: Origin) {
        self.set(origin);
    }

    pub fn reset(&self) {
        *self.chosen.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.session.remove(BASE_KEY);
        log::debug!("Base reset (will reselect on next request)");
    }

    pub fn label(&self) -> &'static str {
        self.active().label()
    }
}
