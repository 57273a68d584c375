//! Internal logging helpers for structured tablet writer events.

use std::fmt;

use crate::id::{TabletId, TxnId};

/// Single logging target for the tablet write path.
pub(crate) const LOG_TARGET: &str = "tablet_writer";

/// Common key/value fields appended to every log line emitted by one writer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LogContext {
    tablet_id: TabletId,
    txn_id: TxnId,
}

impl LogContext {
    pub(crate) const fn new(tablet_id: TabletId, txn_id: TxnId) -> Self {
        Self { tablet_id, txn_id }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tablet_id={} txn_id={}", self.tablet_id, self.txn_id)
    }
}

macro_rules! tablet_log {
    ($level:expr, ctx: $ctx:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} {} {}",
                $event,
                $ctx,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use tablet_log;
