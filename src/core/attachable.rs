//! Ordered collection of appenders owned by a logger node
//!
//! The collection has no lock of its own; the owning logger node guards it.

use super::appender::{same_appender, AppenderRef};
use super::diagnostics;
use super::event::LoggingEvent;
use std::panic::{self, AssertUnwindSafe};

#[derive(Default, Clone)]
pub struct AppenderAttachable {
    appenders: Vec<AppenderRef>,
}

impl AppenderAttachable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an appender.
    ///
    /// Attaching a handle that is already present does nothing. Attaching a
    /// different appender under a name that is already taken replaces the old
    /// one in its slot, so the attachment order of the name is kept; the
    /// displaced handle is returned and left open since other loggers may
    /// still use it.
    pub fn add(&mut self, appender: AppenderRef) -> Option<AppenderRef> {
        if self.contains(&appender) {
            return None;
        }

        match self
            .appenders
            .iter()
            .position(|a| a.name() == appender.name())
        {
            Some(idx) => Some(std::mem::replace(&mut self.appenders[idx], appender)),
            None => {
                self.appenders.push(appender);
                None
            }
        }
    }

    pub fn remove(&mut self, appender: &AppenderRef) -> bool {
        let before = self.appenders.len();
        self.appenders.retain(|a| !same_appender(a, appender));
        self.appenders.len() != before
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<AppenderRef> {
        let idx = self.appenders.iter().position(|a| a.name() == name)?;
        Some(self.appenders.remove(idx))
    }

    pub fn remove_all(&mut self) -> Vec<AppenderRef> {
        std::mem::take(&mut self.appenders)
    }

    pub fn get(&self, name: &str) -> Option<AppenderRef> {
        self.appenders.iter().find(|a| a.name() == name).cloned()
    }

    pub fn contains(&self, appender: &AppenderRef) -> bool {
        self.appenders.iter().any(|a| same_appender(a, appender))
    }

    /// Handles in attachment order
    pub fn snapshot(&self) -> Vec<AppenderRef> {
        self.appenders.clone()
    }

    pub fn len(&self) -> usize {
        self.appenders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appenders.is_empty()
    }

    /// Hand the event to every appender in attachment order and return how
    /// many were invoked.
    ///
    /// Each appender is isolated: an error or a panic is reported and the
    /// loop moves on to the next one.
    pub fn append_loop_on_appenders(&self, event: &LoggingEvent) -> usize {
        for appender in &self.appenders {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| appender.append(event)));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    diagnostics::error(format!(
                        "Appender '{}' failed: {}",
                        appender.name(),
                        e
                    ));
                }
                Err(panic_info) => {
                    diagnostics::error(format!(
                        "Appender '{}' panicked: {}. Other appenders continue to function.",
                        appender.name(),
                        diagnostics::panic_message(panic_info.as_ref())
                    ));
                }
            }
        }

        self.appenders.len()
    }
}
