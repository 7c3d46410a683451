//! Connection routing: pick the driver handle an operation executes on.
//!
//! Resolution precedence is fixed: an active transaction in the [`Session`]
//! wins unconditionally (reads inside a transaction must observe its
//! uncommitted writes), then the write handle when the operation declares
//! write intent, then the read handle. The router only selects among handles
//! supplied at construction; it never creates, pools, or closes connections.

use std::sync::Arc;

use crate::driver::{Driver, Session};

/// Read/write pair of driver handles for one backend.
///
/// Cloning is cheap; the handles are shared.
#[derive(Clone)]
pub struct Router {
    read: Arc<dyn Driver>,
    write: Arc<dyn Driver>,
}

impl Router {
    /// Router over separate read and write handles (e.g. a replica and a
    /// primary).
    pub fn replicated(read: Arc<dyn Driver>, write: Arc<dyn Driver>) -> Self {
        Router { read, write }
    }

    /// Router over a single handle serving both roles.
    pub fn single(conn: Arc<dyn Driver>) -> Self {
        Router {
            read: Arc::clone(&conn),
            write: conn,
        }
    }

    /// Resolve the handle for one operation: transaction > write > read.
    pub fn resolve<'s>(&'s self, session: &Session<'s>, write_intent: bool) -> &'s dyn Driver {
        if let Some(tx) = session.transaction_handle() {
            return tx;
        }
        if write_intent {
            self.write.as_ref()
        } else {
            self.read.as_ref()
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field(
                "replicated",
                &!std::ptr::addr_eq(Arc::as_ptr(&self.read), Arc::as_ptr(&self.write)),
            )
            .finish()
    }
}
