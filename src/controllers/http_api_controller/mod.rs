pub(crate) mod middleware;
mod router;
pub(crate) mod v1;

pub(crate) use router::{HttpApiConfig, HttpApiRouter};
