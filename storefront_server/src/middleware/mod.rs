mod acl;
mod authentication;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use authentication::{AuthenticationMiddlewareFactory, AuthenticationMiddlewareService};
