//! Connection records and the table that owns them.
//!
//! A [`ConnectionRecord`] pairs the two [`SideAssembler`]s of one connection
//! with its metadata, lifecycle status and last activity time. The engine
//! keeps every record in a crate-internal table indexed both by
//! [`FlowKey`](crate::flow::FlowKey) and by last activity, so idle sweeps and
//! purges visit the oldest records first without scanning the whole table.
//!
//! [`SideAssembler`]: crate::assembler::SideAssembler

mod record;
mod table;

pub use record::{ConnectionRecord, ConnectionState, ConnectionStatus};
pub(crate) use table::{ConnectionTable, Routed};
