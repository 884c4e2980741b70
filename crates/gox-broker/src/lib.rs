//! In-process pub/sub topic + pipe routing (spec §4.2).

pub mod address;
pub mod broker;
pub mod chunking;
pub mod pattern;
pub mod pipe;
pub mod spec;
pub mod topic;

pub use address::{BrokerAddress, Codec};
pub use broker::{Broker, BrokerConfig};
pub use chunking::ChunkingPublisher;
pub use spec::{Specifier, parse_specifiers};
pub use topic::{Subscription, SubscriptionId};
