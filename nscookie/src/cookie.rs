//! # Netns cookie attribution
//!
//! Resolves the cookie of the network namespace logically owning a packet.
//! Two access paths exist because packets are associated with different
//! owners depending on the processing stage: a received packet typically
//! carries a device, a locally originated one a socket. Either backlink ends
//! at the same `struct net`, whose `net_cookie` member only exists on recent
//! enough kernels.

use anyhow::Result;
use log::debug;

use crate::core::{
    inspect::BtfInfo,
    reloc::{ProbeRead, ReadChain},
};

/// Path walked when the packet carries a device association.
const DEV_PATH: &str = "dev.nd_net.net.net_cookie";
/// Path walked when the packet carries a socket association.
const SK_PATH: &str = "sk.__sk_common.skc_net.net.net_cookie";

/// Per-load cookie resolver for `struct sk_buff` packets.
///
/// Construction runs the feature probe and compiles the access paths against
/// a kernel description; `resolve` is then a pure function of the packet,
/// fit for per-packet use.
pub struct CookieResolver {
    /// Compiled access paths. `None` when the kernel does not expose
    /// `net.net_cookie` (added in v5.7).
    chains: Option<Chains>,
}

struct Chains {
    dev: ReadChain,
    sk: ReadChain,
}

impl CookieResolver {
    /// Probe the kernel described by `info` and compile the access paths.
    ///
    /// The probe resolves once per load, never per packet: on kernels
    /// without the cookie member no chain is compiled at all and `resolve`
    /// returns 0 without touching any pointer.
    pub fn new(info: &BtfInfo) -> Result<CookieResolver> {
        if !Self::probe(info) {
            debug!("struct net has no net_cookie member, namespace attribution is off");
            return Ok(CookieResolver { chains: None });
        }

        Ok(CookieResolver {
            chains: Some(Chains {
                dev: ReadChain::compile(info, "sk_buff", DEV_PATH)?,
                sk: ReadChain::compile(info, "sk_buff", SK_PATH)?,
            }),
        })
    }

    /// Does the kernel support net cookies?
    fn probe(info: &BtfInfo) -> bool {
        if let Ok((btf, r#struct)) = info.resolve_struct("net") {
            for member in r#struct.members.iter() {
                if btf
                    .resolve_name(member)
                    .is_ok_and(|name| name == "net_cookie")
                {
                    return true;
                }
            }
        }

        false
    }

    /// Whether the kernel exposes the cookie at all. Lets callers fail
    /// closed at load time; `resolve` itself collapses this case to 0.
    pub fn supported(&self) -> bool {
        self.chains.is_some()
    }

    /// Compiled device path, if supported.
    pub fn device_chain(&self) -> Option<&ReadChain> {
        self.chains.as_ref().map(|c| &c.dev)
    }

    /// Compiled socket path, if supported.
    pub fn socket_chain(&self) -> Option<&ReadChain> {
        self.chains.as_ref().map(|c| &c.sk)
    }

    /// Resolve the cookie of the namespace owning the packet at `skb`.
    ///
    /// The device backlink is tried first, then the socket one. When both
    /// are present they name the same namespace for any consistent packet
    /// and the device answer wins by convention. Returns 0 iff the kernel
    /// has no cookie support, the packet has neither association, or a read
    /// faulted; callers cannot act differently on those, so they share the
    /// reserved value.
    pub fn resolve(&self, mem: &dyn ProbeRead, skb: u64) -> u64 {
        let Some(chains) = &self.chains else { return 0 };

        match chains.dev.read(mem, skb) {
            0 => chains.sk.read(mem, skb),
            cookie => cookie,
        }
    }
}
