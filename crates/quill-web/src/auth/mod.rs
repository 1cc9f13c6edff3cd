pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::CurrentSession;
