//! Dispatch of per-box execution units
//!
//! Each unit runs on its own OS thread and owns everything it touches.
//! Schedulers differ only in when units are started relative to each
//! other; every started unit is joined before `run` returns, and a panic
//! inside a unit is caught at the join and reported, never propagated.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::errors::{CropError, CropResult};
use super::box_writer::BoxWriteSummary;

/// Work of one box
pub type UnitWork = Box<dyn FnOnce() -> CropResult<BoxWriteSummary> + Send + 'static>;

/// One independently failing execution unit
pub struct Unit {
    pub box_index: usize,
    pub work: UnitWork,
}

impl Unit {
    pub fn new(box_index: usize, work: impl FnOnce() -> CropResult<BoxWriteSummary> + Send + 'static) -> Self {
        Unit { box_index, work: Box::new(work) }
    }
}

/// How a unit ended
#[derive(Debug)]
pub enum UnitOutcome {
    /// The unit returned, successfully or with an error
    Completed(CropResult<BoxWriteSummary>),
    /// The unit panicked; holds the panic message
    Panicked(String),
}

/// Called once per unit as soon as it has been joined
pub type CompletionHook<'a> = &'a mut dyn FnMut(usize, &UnitOutcome);

/// Strategy for starting and joining units
pub trait TaskScheduler: Send + Sync {
    /// Run every unit and return their outcomes in box order
    fn run(&self, units: Vec<Unit>, on_complete: CompletionHook<'_>) -> Vec<(usize, UnitOutcome)>;

    fn mode(&self) -> DispatchMode;
}

/// Starts one unit, waits for it, then starts the next
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialScheduler;

impl TaskScheduler for SerialScheduler {
    fn run(&self, units: Vec<Unit>, on_complete: CompletionHook<'_>) -> Vec<(usize, UnitOutcome)> {
        let mut outcomes = Vec::with_capacity(units.len());

        for unit in units {
            let box_index = unit.box_index;
            let outcome = match spawn_unit(unit) {
                Ok(handle) => join_unit(box_index, handle),
                Err(outcome) => outcome,
            };
            on_complete(box_index, &outcome);
            outcomes.push((box_index, outcome));
        }

        outcomes
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Serialized
    }
}

/// Starts every unit, then joins them all
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelScheduler;

impl TaskScheduler for ParallelScheduler {
    fn run(&self, units: Vec<Unit>, on_complete: CompletionHook<'_>) -> Vec<(usize, UnitOutcome)> {
        let started: Vec<(usize, Result<JoinHandle<_>, UnitOutcome>)> = units
            .into_iter()
            .map(|unit| (unit.box_index, spawn_unit(unit)))
            .collect();
        debug!("Started {} units", started.len());

        started
            .into_iter()
            .map(|(box_index, handle)| {
                let outcome = match handle {
                    Ok(handle) => join_unit(box_index, handle),
                    Err(outcome) => outcome,
                };
                on_complete(box_index, &outcome);
                (box_index, outcome)
            })
            .collect()
    }

    fn mode(&self) -> DispatchMode {
        DispatchMode::Parallel
    }
}

fn spawn_unit(unit: Unit) -> Result<JoinHandle<CropResult<BoxWriteSummary>>, UnitOutcome> {
    let Unit { box_index, work } = unit;
    thread::Builder::new()
        .name(format!("box-{}", box_index))
        .spawn(work)
        .map_err(|e| {
            error!("Could not start unit for box {}: {}", box_index, e);
            UnitOutcome::Completed(Err(CropError::IoError(e)))
        })
}

fn join_unit(box_index: usize, handle: JoinHandle<CropResult<BoxWriteSummary>>) -> UnitOutcome {
    match handle.join() {
        Ok(result) => UnitOutcome::Completed(result),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Unit for box {} panicked: {}", box_index, message);
            UnitOutcome::Panicked(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Whether units run one after another or all at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One unit at a time, in box order
    #[default]
    Serialized,
    /// Every unit started before any is joined
    Parallel,
}

impl DispatchMode {
    /// Scheduler implementing this mode
    pub fn scheduler(&self) -> Box<dyn TaskScheduler> {
        match self {
            DispatchMode::Serialized => Box::new(SerialScheduler),
            DispatchMode::Parallel => Box::new(ParallelScheduler),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DispatchMode::Serialized => "serialized",
            DispatchMode::Parallel => "parallel",
        }
    }
}

impl FromStr for DispatchMode {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serialized" | "serial" => Ok(DispatchMode::Serialized),
            "parallel" => Ok(DispatchMode::Parallel),
            other => Err(CropError::ConfigError(format!(
                "Unknown dispatch mode '{}', expected serialized or parallel", other
            ))),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
