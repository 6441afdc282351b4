pub mod handlers;
pub mod middleware;
pub mod resolver;
pub mod routes;

pub use resolver::{Resolution, Resolver};
pub use routes::create_redirect_router;
