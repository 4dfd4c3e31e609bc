#![recursion_limit="128"]

#![cfg_attr(feature="clippy", feature(plugin))]
#![cfg_attr(feature="clippy", plugin(clippy))]

#![allow(dead_code)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
extern crate bytes;
#[macro_use]
extern crate nom;
extern crate serde;
#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate pretty_env_logger;

#[macro_use]
pub mod errors;
mod wire;
pub mod envelope;
pub mod version;
pub mod classify;
pub mod suppress;
pub mod driver;
pub mod collab;
#[macro_use]
mod protocol;
pub mod requests;

pub use errors::{Error, ErrorKind, KafkaCode, Result};
pub use envelope::{CorrelationIdGen, EnvelopeState, KafkaEvent, Priority, RequestBody,
                   RequestEnvelope, NO_RETRIES};
pub use version::{negotiate, ApiVersionTable, BrokerApiVersion, FeatureFlags};
pub use classify::{classify, Action, Override};
pub use suppress::{FullRequestKind, FullRequestSuppressor, Permit};
pub use driver::{decide, group_refresh, refresh, Disposition, GroupRefresh, MetadataRefresh};
pub use collab::{BrokerSink, Clock, GroupHooks, MetadataHooks, ThrottleObserver};
pub use protocol::{ApiKeys, RequestHeader, ResponseHeader};
pub use requests::{Built, Outcome};
