use veris_types::events::Event;

use crate::errors::{AdmissionError, AdmissionResult};

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

/// Per-transaction context threaded through the admission chain.
///
/// Holds only transient accounting: gas, events, and the block coordinates
/// the surrounding consensus engine supplied. Decorators never reach past it
/// into persistent state.
#[derive(Debug)]
pub struct AdmissionContext {
    pub block_height: u64,
    pub block_time_unix: u64,
    /// Simulation runs must leave every counter untouched.
    pub simulate: bool,
    gas_used: u64,
    gas_limit: Option<u64>,
    events: Vec<Event>,
}

impl AdmissionContext {
    pub fn new(block_height: u64, block_time_unix: u64) -> Self {
        Self {
            block_height,
            block_time_unix,
            simulate: false,
            gas_used: 0,
            gas_limit: None,
            events: Vec::new(),
        }
    }

    pub fn simulated(mut self) -> Self {
        self.simulate = true;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn set_gas_limit(&mut self, gas_limit: u64) {
        self.gas_limit = Some(gas_limit);
    }

    /// Consumes gas, failing once the limit (when set) is crossed.
    pub fn consume_gas(&mut self, amount: u64, operation: &str) -> AdmissionResult<()> {
        self.gas_used = self.gas_used.saturating_add(amount);
        match self.gas_limit {
            Some(limit) if self.gas_used > limit => Err(AdmissionError::OutOfGas {
                operation: operation.to_owned(),
                used: self.gas_used,
                limit,
            }),
            _ => Ok(()),
        }
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Records an event for the surrounding engine to publish.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
