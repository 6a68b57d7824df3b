//! Port allocator
//!
//! In-memory owner→port table. Fixed ports are checked against the table and
//! against a local bind; dynamic ports come from the OS and are redrawn when
//! the OS hands back a port another owner still holds.

use crate::domain::DomainError;
use std::collections::HashMap;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

const EPHEMERAL_ATTEMPTS: usize = 16;

pub struct PortAllocator {
    allocations: Mutex<HashMap<String, u16>>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self {
            allocations: Mutex::new(HashMap::new()),
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, u16>> {
        self.allocations.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Allocate `requested` (or an ephemeral port for None/0) to `owner`
    pub fn allocate(&self, owner: &str, requested: Option<u16>) -> Result<u16, DomainError> {
        let mut table = self.table();

        let port = match requested.filter(|p| *p != 0) {
            Some(port) => {
                if let Some((holder, _)) = table.iter().find(|(_, p)| **p == port) {
                    if holder == owner {
                        return Ok(port);
                    }
                    return Err(DomainError::PortAlreadyAllocated {
                        port,
                        owner: holder.clone(),
                    });
                }
                TcpListener::bind((Ipv4Addr::LOCALHOST, port)).map_err(|e| {
                    DomainError::PortUnavailable {
                        port,
                        reason: e.to_string(),
                    }
                })?;
                port
            }
            None => first_unreserved(
                || TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?.local_addr().map(|a| a.port()),
                |port| table.iter().any(|(holder, p)| *p == port && holder != owner),
            )?,
        };

        if let Some(previous) = table.insert(owner.to_string(), port) {
            debug!(owner = %owner, previous = previous, "Replacing previous port allocation");
        }
        info!(owner = %owner, port = port, "Port allocated");
        Ok(port)
    }

    /// Idempotent
    pub fn release(&self, owner: &str) {
        if let Some(port) = self.table().remove(owner) {
            debug!(owner = %owner, port = port, "Port released");
        }
    }

    pub fn allocated_port(&self, owner: &str) -> Option<u16> {
        self.table().get(owner).copied()
    }

    pub fn is_allocated(&self, port: u16) -> bool {
        self.table().values().any(|p| *p == port)
    }
}

/// Draw ephemeral ports until one is not reserved in the table
fn first_unreserved(
    mut next: impl FnMut() -> std::io::Result<u16>,
    reserved: impl Fn(u16) -> bool,
) -> Result<u16, DomainError> {
    let mut last = 0;
    for _ in 0..EPHEMERAL_ATTEMPTS {
        let port = next()?;
        if !reserved(port) {
            return Ok(port);
        }
        warn!(port = port, "OS returned a port that is still allocated, retrying");
        last = port;
    }
    Err(DomainError::PortUnavailable {
        port: last,
        reason: format!("no unallocated ephemeral port after {} attempts", EPHEMERAL_ATTEMPTS),
    })
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn test_dynamic_allocation() {
        let allocator = PortAllocator::new();
        let a = allocator.allocate("g:a", None).unwrap();
        let b = allocator.allocate("g:b", Some(0)).unwrap();
        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_eq!(allocator.allocated_port("g:a"), Some(a));
        assert!(allocator.is_allocated(b));
    }

    #[test]
    fn test_fixed_port_is_exclusive() {
        let allocator = PortAllocator::new();
        let port = free_port();

        assert_eq!(allocator.allocate("g:a", Some(port)).unwrap(), port);
        // Same owner asking again keeps it
        assert_eq!(allocator.allocate("g:a", Some(port)).unwrap(), port);

        let err = allocator.allocate("g:b", Some(port)).unwrap_err();
        assert!(err.is_resource());
        assert_eq!(
            err,
            DomainError::PortAlreadyAllocated {
                port,
                owner: "g:a".to_string()
            }
        );

        allocator.release("g:a");
        assert_eq!(allocator.allocate("g:b", Some(port)).unwrap(), port);
    }

    #[test]
    fn test_fixed_port_in_use_by_os() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let allocator = PortAllocator::new();
        let err = allocator.allocate("g:a", Some(port)).unwrap_err();
        assert!(matches!(err, DomainError::PortUnavailable { port: p, .. } if p == port));
        assert_eq!(allocator.allocated_port("g:a"), None);
    }

    #[test]
    fn test_ephemeral_skips_reserved_ports() {
        let mut candidates = [5000, 5001].into_iter();
        let port = first_unreserved(|| Ok(candidates.next().unwrap()), |p| p == 5000).unwrap();
        assert_eq!(port, 5001);

        let err = first_unreserved(|| Ok(5000), |_| true).unwrap_err();
        assert!(matches!(err, DomainError::PortUnavailable { port: 5000, .. }));
    }

    #[test]
    fn test_dynamic_allocation_never_reuses_held_port() {
        let allocator = PortAllocator::new();
        let ports: Vec<u16> = (0..20)
            .map(|i| allocator.allocate(&format!("g:{}", i), None).unwrap())
            .collect();
        let mut unique = ports.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ports.len());
    }

    #[test]
    fn test_release_is_idempotent() {
        let allocator = PortAllocator::new();
        allocator.allocate("g:a", None).unwrap();
        allocator.release("g:a");
        allocator.release("g:a");
        assert_eq!(allocator.allocated_port("g:a"), None);
    }
}
