//! atrium-adapter-postgres - PostgreSQL 适配器

mod connection;
mod error_mapper;
mod migration;
mod session;

pub use connection::*;
pub use error_mapper::*;
pub use migration::*;
pub use session::*;
