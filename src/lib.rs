//! Support ticket workflow with asynchronous sentiment enrichment.
//!
//! The record-keeping side ([`service::TicketService`]) owns tickets, comments and
//! their audit history and publishes lifecycle events after each committed change.
//! The enrichment side ([`enrichment::EnrichmentOrchestrator`]) scores those events
//! and answers each with one result, which [`applier::ResultApplier`] merges back.

pub mod anthropic;
pub mod applier;
pub mod bus;
pub mod config;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod service;
pub mod store;
pub mod workflow;
