pub mod pager;
pub mod retry;
pub mod scylla;

pub use self::pager::{
    scan, scan_as, scan_pages, scan_pages_as, scan_pages_with, scan_with, PageSource,
};
pub use self::retry::RetryPolicy;
pub use self::scylla::ScyllaConnection;
