//! Corso: a tenant-aware learning-content engine.
//!
//! Assembles course → module → submodule → lesson hierarchies from
//! repository ports, overlays per-user progress with deterministic
//! status/percentage derivation, and keeps a best-effort remote cache
//! consistent under cascading writes. The relational store behind the
//! repository ports is always authoritative; the cache degrades to misses on
//! any failure and staleness is bounded by TTL.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
