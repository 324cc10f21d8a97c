pub mod clock;
pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod ordering;
pub mod projection;
pub mod query;
pub mod report;
pub mod tabwriter;
pub mod terminal;
