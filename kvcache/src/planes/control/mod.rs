pub mod provisioning;
pub mod purge;

pub use provisioning::init_bucket;
pub use purge::{PurgeReport, purge_all};
