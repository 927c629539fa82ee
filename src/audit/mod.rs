//! The audit invoker: one heavyweight performance audit per call, executed
//! against an external audit engine (PageSpeed Insights v5).

mod error;
mod invoker;

pub use error::AuditError;
pub use invoker::{AuditInvoker, PagespeedInvoker};

#[cfg(test)]
pub use invoker::MockAuditInvoker;
