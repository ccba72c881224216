mod collect;
mod graph;
mod parse;
mod synthetic;

pub use collect::load_snapshot;
pub use graph::{Connection, Endpoint, Topology, error_ratio};
pub use parse::{EdgeRecord, NodeRecord, Snapshot, parse_snapshot};
pub use synthetic::synthetic_snapshot;
