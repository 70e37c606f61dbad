//! atrium-auth-core - 认证核心库
//!
//! 认证主体、JWT Claims 与令牌提供者

mod claims;
mod subject;
mod token;

pub use claims::*;
pub use subject::*;
pub use token::*;
