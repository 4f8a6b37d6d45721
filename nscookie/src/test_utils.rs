//! Test-only fixtures: a small BTF encoder to build synthetic kernels, the
//! type graph the accessor walks, and a fake memory image implementing the
//! probe read primitive.

use std::collections::HashMap;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::core::reloc::ProbeRead;

const BTF_MAGIC: u16 = 0xeb9f;
const BTF_VERSION: u8 = 1;
const BTF_HDR_LEN: u32 = 24;

const BTF_KIND_INT: u32 = 1;
const BTF_KIND_PTR: u32 = 2;
const BTF_KIND_STRUCT: u32 = 4;
const BTF_KIND_TYPEDEF: u32 = 8;

const BTF_INT_SIGNED: u32 = 1 << 24;

/// Builds little-endian BTF blobs one type at a time. Type ids are assigned
/// sequentially starting at 1 (0 is void), in insertion order; references to
/// not-yet-inserted ids are valid.
pub(crate) struct BtfBuilder {
    types: Vec<u8>,
    strings: Vec<u8>,
    next_id: u32,
}

impl BtfBuilder {
    pub(crate) fn new() -> BtfBuilder {
        BtfBuilder {
            types: Vec::new(),
            // Offset 0 holds the empty string, used by anonymous types and
            // members.
            strings: vec![0],
            next_id: 1,
        }
    }

    fn str_off(&mut self, name: &str) -> u32 {
        if name.is_empty() {
            return 0;
        }
        let off = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        off
    }

    fn type_header(&mut self, name_off: u32, kind: u32, vlen: u32, size_or_type: u32) {
        self.types.write_u32::<LittleEndian>(name_off).unwrap();
        self.types
            .write_u32::<LittleEndian>((kind << 24) | (vlen & 0xffff))
            .unwrap();
        self.types.write_u32::<LittleEndian>(size_or_type).unwrap();
    }

    fn assign_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// An integer type of `size` bytes.
    pub(crate) fn int(&mut self, name: &str, size: u32, signed: bool) -> u32 {
        let name_off = self.str_off(name);
        self.type_header(name_off, BTF_KIND_INT, 0, size);

        let mut encoding = size * 8;
        if signed {
            encoding |= BTF_INT_SIGNED;
        }
        self.types.write_u32::<LittleEndian>(encoding).unwrap();

        self.assign_id()
    }

    /// A pointer to `r#type`.
    pub(crate) fn ptr(&mut self, r#type: u32) -> u32 {
        self.type_header(0, BTF_KIND_PTR, 0, r#type);
        self.assign_id()
    }

    pub(crate) fn typedef(&mut self, name: &str, r#type: u32) -> u32 {
        let name_off = self.str_off(name);
        self.type_header(name_off, BTF_KIND_TYPEDEF, 0, r#type);
        self.assign_id()
    }

    /// A struct of `size` bytes; members are (name, type id, bit offset).
    /// An empty name makes an anonymous struct or member.
    pub(crate) fn r#struct(&mut self, name: &str, size: u32, members: &[(&str, u32, u32)]) -> u32 {
        let name_off = self.str_off(name);
        self.type_header(name_off, BTF_KIND_STRUCT, members.len() as u32, size);

        for (mname, mtype, moffset) in members {
            let moff = self.str_off(mname);
            self.types.write_u32::<LittleEndian>(moff).unwrap();
            self.types.write_u32::<LittleEndian>(*mtype).unwrap();
            self.types.write_u32::<LittleEndian>(*moffset).unwrap();
        }

        self.assign_id()
    }

    /// Assemble the final blob.
    pub(crate) fn build(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BTF_HDR_LEN as usize + self.types.len() + self.strings.len());

        buf.write_u16::<LittleEndian>(BTF_MAGIC).unwrap();
        buf.write_u8(BTF_VERSION).unwrap();
        buf.write_u8(0).unwrap(); // Flags.
        buf.write_u32::<LittleEndian>(BTF_HDR_LEN).unwrap();
        // Section offsets are relative to the end of the header.
        buf.write_u32::<LittleEndian>(0).unwrap();
        buf.write_u32::<LittleEndian>(self.types.len() as u32).unwrap();
        buf.write_u32::<LittleEndian>(self.types.len() as u32).unwrap();
        buf.write_u32::<LittleEndian>(self.strings.len() as u32).unwrap();

        buf.extend_from_slice(&self.types);
        buf.extend_from_slice(&self.strings);
        buf
    }
}

/// Byte offsets of the synthetic kernel layout below. Loosely modeled after
/// an x86_64 v5.x kernel without being one; tests must only rely on these
/// constants, never on the literals.
pub(crate) const SKB_DEV: u64 = 16;
pub(crate) const SKB_SK: u64 = 24;
pub(crate) const DEV_ND_NET: u64 = 208;
pub(crate) const SOCK_SKC_NET: u64 = 48;
pub(crate) const NET_COOKIE: u64 = 144;

/// BTF of a synthetic kernel, with or without `net.net_cookie`.
///
/// The graph covers everything the accessor has to cope with: pointer hops,
/// an embedded struct (`__sk_common`), and a typedef'd anonymous struct
/// (`possible_net_t`).
pub(crate) fn kernel_btf(with_cookie: bool) -> Vec<u8> {
    let mut b = BtfBuilder::new();

    let u64t = b.int("unsigned long long", 8, false);
    let int = b.int("int", 4, true);

    let mut net_members = vec![("passive", int, 0)];
    if with_cookie {
        net_members.push(("net_cookie", u64t, NET_COOKIE as u32 * 8));
    }
    let net = b.r#struct("net", 4352, &net_members);
    let net_ptr = b.ptr(net);

    let pnet_anon = b.r#struct("", 8, &[("net", net_ptr, 0)]);
    let possible_net_t = b.typedef("possible_net_t", pnet_anon);

    let net_device = b.r#struct(
        "net_device",
        2048,
        &[
            ("ifindex", int, 64),
            ("nd_net", possible_net_t, DEV_ND_NET as u32 * 8),
        ],
    );
    let net_device_ptr = b.ptr(net_device);

    let sock_common = b.r#struct(
        "sock_common",
        136,
        &[
            ("skc_bound_dev_if", int, 64),
            ("skc_net", possible_net_t, SOCK_SKC_NET as u32 * 8),
        ],
    );
    let sock = b.r#struct("sock", 760, &[("__sk_common", sock_common, 0)]);
    let sock_ptr = b.ptr(sock);

    b.r#struct(
        "sk_buff",
        232,
        &[
            ("dev", net_device_ptr, SKB_DEV as u32 * 8),
            ("sk", sock_ptr, SKB_SK as u32 * 8),
            ("len", int, 832),
        ],
    );

    b.build()
}

/// Word-granular fake kernel memory. Addresses that were not explicitly
/// stored fault, like an unmapped page would under a safe probe read.
#[derive(Default)]
pub(crate) struct MemImage {
    words: HashMap<u64, u64>,
}

impl MemImage {
    pub(crate) fn store(&mut self, addr: u64, val: u64) {
        self.words.insert(addr, val);
    }
}

impl ProbeRead for MemImage {
    fn read_u64(&self, addr: u64) -> Option<u64> {
        self.words.get(&addr).copied()
    }
}
