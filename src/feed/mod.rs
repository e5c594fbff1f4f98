// Feed model and aggregation — the pure core of UniFeed.
//
// Nothing in here does I/O. Rows come in from a `source`, get filtered by an
// `audience`, collapsed by `aggregate`, and handed to the renderer.

pub mod aggregate;
pub mod attribution;
pub mod audience;
pub mod count;
pub mod live;
pub mod row;

pub use aggregate::{aggregate, DisplayEntry};
pub use row::{ActivityRow, Author, RowKind};
