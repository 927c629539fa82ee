// Integration test root for http_server tests.
// Submodules live under `tests/http_server/` directory.

#[path = "http_server/helpers.rs"]
mod helpers;

#[path = "http_server/monitors.rs"]
mod monitors;

#[path = "http_server/audits.rs"]
mod audits;

#[path = "http_server/health.rs"]
mod health;

#[path = "http_server/ws.rs"]
mod ws;
