//! Transaction-time clock
//!
//! Every version record is stamped with an `OpTime`, a `(seconds, counter)`
//! pair that is strictly monotonic within a process. The `ClockSource` is the
//! single authority handing out stamps; issuance is serialized so two writes
//! can never observe the same stamp, even across logical documents.

mod optime;
mod source;

pub use optime::OpTime;
pub use source::ClockSource;
