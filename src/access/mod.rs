pub mod origins;
pub mod routes;

pub use origins::{normalize_origin, OriginAllowlist};
pub use routes::{is_protected, PublicPath, RouteClassifier};
