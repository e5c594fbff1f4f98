// UniFeed: feed aggregation for the UniFeed campus network.
//
// This is the library root. `feed` is the pure core (rows, aggregation,
// live state); the other modules are the I/O around it.

pub mod config;
pub mod db;
pub mod feed;
pub mod output;
pub mod source;
pub mod status;
