//! Fault-absorbing chained reads: the runtime half of the relocation
//! machinery. Offsets are compiled once per load (see the parent module);
//! walking them is allocation-free and runs on the per-packet path.

/// Read primitive over kernel(-like) memory.
///
/// Mirrors the semantics of the kernel's safe probe reads: an unmapped or
/// otherwise bad access is reported as a fault (`None`), never as an abort.
/// Implementations must be side-effect free, the walker may probe the same
/// address more than once.
pub trait ProbeRead {
    /// Read a 64-bit value at `addr`. `None` means fault.
    fn read_u64(&self, addr: u64) -> Option<u64>;
}

/// A compiled chained read: a list of byte offsets where every link but the
/// last dereferences a pointer and the last one reads the 64-bit leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadChain {
    links: Vec<u64>,
}

impl ReadChain {
    pub(crate) fn new(links: Vec<u64>) -> ReadChain {
        ReadChain { links }
    }

    /// Byte offsets of the chain, in walk order.
    pub fn offsets(&self) -> &[u64] {
        &self.links
    }

    /// Walk the chain starting at `base` and return the leaf value. A null
    /// pointer or a fault anywhere on the way short-circuits to 0; callers
    /// cannot tell those apart from a legitimate zero leaf, by contract.
    pub fn read(&self, mem: &dyn ProbeRead, base: u64) -> u64 {
        let Some((leaf, derefs)) = self.links.split_last() else {
            return 0;
        };

        let mut addr = base;
        for link in derefs {
            if addr == 0 {
                return 0;
            }
            addr = match mem.read_u64(addr.wrapping_add(*link)) {
                Some(ptr) => ptr,
                None => return 0,
            };
        }

        if addr == 0 {
            return 0;
        }
        mem.read_u64(addr.wrapping_add(*leaf)).unwrap_or(0)
    }
}
