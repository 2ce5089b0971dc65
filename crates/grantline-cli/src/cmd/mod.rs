pub mod fetch;
pub mod materialize;
pub mod serve;
