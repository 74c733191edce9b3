mod executor;
mod records;
mod tracks;
mod webhooks;

pub use crate::redis::executor::{create_pool, RedisExecutor};
pub use crate::redis::tracks::*;
pub use crate::redis::webhooks::*;
