//! engine::bus
//!
//! Named-topic publish/subscribe between the engine and its presentation
//! consumer.
//!
//! # Delivery
//!
//! - Synchronous, in subscription order
//! - The handler list is copied before any handler runs, so subscribing or
//!   unsubscribing from inside a handler only affects later publishes
//! - A handler that returns an error or panics is isolated: the failure is
//!   logged and reported, and the remaining handlers still run
//!
//! The bus is single-threaded (`Rc`/`RefCell`). Clones share subscribers.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use gitcoach::engine::bus::{Event, EventBus, Topic};
//!
//! let bus = EventBus::new();
//! let seen = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&seen);
//! bus.subscribe(Topic::ScenarioCompleted, move |_| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//! });
//!
//! let report = bus.publish(&Event::ScenarioCompleted { scenario: "intro".into() });
//! assert_eq!(report.delivered, 1);
//! assert_eq!(seen.get(), 1);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde::Serialize;
use uuid::Uuid;

use crate::core::repo::snapshot::RepoSnapshot;
use crate::core::types::{BranchName, FilePath};
use crate::core::ErrorKind;

/// Event topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    StateChanged,
    StepCompleted,
    StepProgress,
    ScenarioCompleted,
    CommandRejected,
    MergeConflict,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::StateChanged,
        Topic::StepCompleted,
        Topic::StepProgress,
        Topic::ScenarioCompleted,
        Topic::CommandRejected,
        Topic::MergeConflict,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::StateChanged => "state-changed",
            Topic::StepCompleted => "step-completed",
            Topic::StepProgress => "step-progress",
            Topic::ScenarioCompleted => "scenario-completed",
            Topic::CommandRejected => "command-rejected",
            Topic::MergeConflict => "merge-conflict",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payloads published on the bus.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Repository state changed. `command` is `None` for resets and step
    /// seeding.
    StateChanged {
        command: Option<String>,
        snapshot: Box<RepoSnapshot>,
    },
    StepCompleted {
        scenario: String,
        step: u32,
    },
    /// The current step's predicate is not met yet.
    StepProgress {
        scenario: String,
        step: u32,
        unmet: Vec<String>,
    },
    ScenarioCompleted {
        scenario: String,
    },
    CommandRejected {
        command: String,
        kind: ErrorKind,
        message: String,
    },
    MergeConflict {
        branch: BranchName,
        paths: Vec<FilePath>,
    },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::StateChanged { .. } => Topic::StateChanged,
            Event::StepCompleted { .. } => Topic::StepCompleted,
            Event::StepProgress { .. } => Topic::StepProgress,
            Event::ScenarioCompleted { .. } => Topic::ScenarioCompleted,
            Event::CommandRejected { .. } => Topic::CommandRejected,
            Event::MergeConflict { .. } => Topic::MergeConflict,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Handler = Rc<dyn Fn(&Event) -> anyhow::Result<()>>;

/// A handler that failed during a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub topic: Topic,
    pub subscription: SubscriptionId,
    pub message: String,
}

impl HandlerFailure {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::EventHandlerFailure
    }
}

/// What happened during one publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that ran to completion
    pub delivered: usize,
    pub failures: Vec<HandlerFailure>,
}

/// Publish/subscribe hub.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Rc<RefCell<HashMap<Topic, Vec<(SubscriptionId, Handler)>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.handlers
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        before != list.len()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.handlers.borrow().get(&topic).map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its topic.
    pub fn publish(&self, event: &Event) -> PublishReport {
        let topic = event.topic();
        let scheduled: Vec<(SubscriptionId, Handler)> = self
            .handlers
            .borrow()
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for (id, handler) in scheduled {
            let message = match panic::catch_unwind(AssertUnwindSafe(|| (*handler)(event))) {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(err)) => format!("{err:#}"),
                Err(payload) => panic_message(payload.as_ref()),
            };
            tracing::warn!(%topic, subscription = %id, error = %message, "event handler failed");
            report.failures.push(HandlerFailure {
                topic,
                subscription: id,
                message,
            });
        }
        report
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        let mut map = f.debug_map();
        for topic in Topic::ALL {
            if let Some(list) = handlers.get(&topic) {
                map.entry(&topic.as_str(), &list.len());
            }
        }
        map.finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
