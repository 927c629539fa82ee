#![warn(missing_docs)]
//! Webwatch is a website monitoring engine: periodic uptime and latency
//! probes per monitored URL, on-demand performance audits against an external
//! audit engine, and an ordered lifecycle event stream for dashboards.

pub mod audit;
pub mod config;
pub mod events;
pub mod http_client;
pub mod http_server;
pub mod models;
pub mod persistence;
pub mod probe;
pub mod scheduler;
pub mod supervisor;
