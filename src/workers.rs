//! Worker roles and the timing-record event slots that bound them.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::{KernTraceError, KernTraceResult};

// Event ids written by the megakernel into each instruction's timing record.
pub const TEVENT_CONTROLLER_START: usize = 0;
pub const TEVENT_IFETCH_DONE: usize = 1;
pub const TEVENT_PAGE_ALLOC_DONE: usize = 2;
pub const TEVENT_SEMS_SETUP: usize = 3;
pub const TEVENT_CONTROLLER_END: usize = 4;
pub const TEVENT_LOADER_START: usize = 5;
pub const TEVENT_IFETCH_DONE_LOADER: usize = 6;
pub const TEVENT_LAUNCHER_START: usize = 7;
pub const TEVENT_LAUNCHER_END: usize = 8;
pub const TEVENT_STORER_START: usize = 9;
pub const TEVENT_STORER_END: usize = 10;
pub const TEVENT_CONSUMER_START: usize = 11;

/// Minimum depth of a timing record as produced by the kernel.
pub const MIN_EVENT_SLOTS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Controller,
    Loader,
    Launcher,
    Storer,
    Consumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventSlots {
    pub start: usize,
    pub end: usize,
}

impl WorkerRole {
    pub const ALL: [WorkerRole; 5] = [
        WorkerRole::Controller,
        WorkerRole::Loader,
        WorkerRole::Launcher,
        WorkerRole::Storer,
        WorkerRole::Consumer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerRole::Controller => "controller",
            WorkerRole::Loader => "loader",
            WorkerRole::Launcher => "launcher",
            WorkerRole::Storer => "storer",
            WorkerRole::Consumer => "consumer",
        }
    }

    pub fn slots(self) -> EventSlots {
        let (start, end) = match self {
            WorkerRole::Controller => (TEVENT_CONTROLLER_START, TEVENT_CONTROLLER_END),
            WorkerRole::Loader => (TEVENT_LOADER_START, TEVENT_IFETCH_DONE_LOADER),
            WorkerRole::Launcher => (TEVENT_LAUNCHER_START, TEVENT_LAUNCHER_END),
            WorkerRole::Storer => (TEVENT_STORER_START, TEVENT_STORER_END),
            // Consumer warps own two adjacent slots.
            WorkerRole::Consumer => (TEVENT_CONSUMER_START, TEVENT_CONSUMER_START + 1),
        };
        EventSlots { start, end }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerRole {
    type Err = KernTraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkerRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| KernTraceError::UnknownWorker(s.to_string()))
    }
}

pub fn slots_for(worker: &str) -> KernTraceResult<EventSlots> {
    Ok(worker.parse::<WorkerRole>()?.slots())
}

pub fn list_available_workers() -> Vec<&'static str> {
    WorkerRole::ALL.iter().map(|r| r.as_str()).collect()
}
