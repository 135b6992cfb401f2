//! Purpose: Map a service descriptor to its gateway route prefix.
//! Exports: `host_route`, `ip_route`.
//! Role: Pure helpers used by service-specific clients to address one instance.
//! Invariants: Output is `/<serviceClass>/<host-or-ip>/<port>`; fields are not validated.

use super::registry::ServiceDescriptor;

/// Route through the instance's hostname.
pub fn host_route(service: &ServiceDescriptor) -> String {
    let host = service.host.as_deref().unwrap_or_default();
    format!("/{}/{}/{}", service.service_class, host, service.port)
}

/// Route through the instance's IP address.
pub fn ip_route(service: &ServiceDescriptor) -> String {
    format!("/{}/{}/{}", service.service_class, service.ip, service.port)
}
