//! # Relocatable chained reads
//!
//! Compiles dotted member paths (e.g. `sk_buff: dev.nd_net.net.net_cookie`)
//! into chains of byte offsets using the kernel BTF, so a single build runs
//! on kernels whose structure layouts differ. Compilation happens once per
//! program load; any error here is a load-time error and never reaches the
//! per-packet path.

pub mod read;
pub use read::*;

use anyhow::{anyhow, bail, Result};
use btf_rs::{Btf, Type};

use super::inspect::BtfInfo;

/// Look up a member by name in a struct or union, descending into anonymous
/// members. Returns the member bit offset (on top of `offset`), its bitfield
/// size if any, and its type.
fn find_member(
    btf: &Btf,
    r#type: &Type,
    name: &str,
    offset: u32,
) -> Option<(u32, Option<u32>, Type)> {
    let r#struct = match r#type {
        Type::Struct(r#struct) | Type::Union(r#struct) => r#struct,
        _ => return None,
    };

    for member in r#struct.members.iter() {
        let mname = btf.resolve_name(member).ok()?;
        if mname.eq(name) {
            let ty = btf.resolve_chained_type(member).ok()?;
            return Some((offset + member.bit_offset(), member.bitfield_size(), ty));
        } else if mname.is_empty() {
            // Anonymous struct or union, look inside.
            let inner = btf.resolve_chained_type(member).ok()?;
            match inner {
                Type::Struct(_) | Type::Union(_) => {
                    if let Some(found) =
                        find_member(btf, &inner, name, offset + member.bit_offset())
                    {
                        return Some(found);
                    }
                }
                _ => (),
            }
        }
    }

    None
}

fn check_one_walkable(t: &Type, ind: &mut u8) -> Result<bool> {
    match t {
        Type::Ptr(_) => *ind += 1,
        Type::Struct(_) | Type::Union(_) => {
            return Ok(true);
        }
        Type::Typedef(_)
        | Type::Volatile(_)
        | Type::Const(_)
        | Type::Restrict(_)
        | Type::DeclTag(_)
        | Type::TypeTag(_) => (),
        _ => bail!("unexpected type ({})", t.name()),
    };

    Ok(false)
}

/// Walk a type chain (typedefs, qualifiers, pointers) until a struct or
/// union shows up, counting pointer indirections on the way.
fn next_walkable(btf: &Btf, r#type: Type) -> Result<(u8, Type)> {
    let btf_type = r#type.as_btf_type();
    let mut ind = 0;

    // Return early if r#type is already walkable.
    if check_one_walkable(&r#type, &mut ind)? {
        return Ok((0, r#type));
    }

    let btf_type = btf_type.ok_or_else(|| {
        anyhow!("cannot convert to iterable type while retrieving next walkable")
    })?;

    for x in btf.type_iter(btf_type) {
        if check_one_walkable(&x, &mut ind)? {
            return Ok((ind, x));
        }
    }

    bail!("failed to retrieve next walkable object")
}

/// Ensure a chain leaf resolves to a 64-bit integer, through typedefs and
/// qualifiers.
fn check_leaf(btf: &Btf, leaf: &Type) -> Result<()> {
    let mut t = leaf.clone();
    loop {
        t = match t {
            Type::Int(ref i) => {
                if i.size() != 8 {
                    bail!("expected a 64-bit integer, got {} byte(s)", i.size());
                }
                return Ok(());
            }
            Type::Typedef(ref x) => btf.resolve_chained_type(x)?,
            Type::Volatile(ref x) => btf.resolve_chained_type(x)?,
            Type::Const(ref x) => btf.resolve_chained_type(x)?,
            Type::Restrict(ref x) => btf.resolve_chained_type(x)?,
            _ => bail!("unsupported leaf type ({})", t.name()),
        };
    }
}

impl ReadChain {
    /// Compile a dotted member path rooted at a named structure into a chain
    /// of byte offsets: one link per pointer dereference, plus the leaf.
    ///
    /// Embedded (possibly anonymous) structs and unions accumulate into the
    /// offset of the next link. Pointers of pointers and bitfield leaves are
    /// rejected, and the leaf must be a 64-bit integer.
    pub fn compile(info: &BtfInfo, root: &str, path: &str) -> Result<ReadChain> {
        let fields: Vec<&str> = path.split('.').collect();
        if fields.iter().any(|f| f.is_empty()) {
            bail!("invalid member path ({path})");
        }

        let (btf, r#struct) = info
            .resolve_struct(root)
            .map_err(|e| anyhow!("unable to resolve {root}: {e}"))?;
        let mut r#type = Type::Struct(r#struct);

        let mut links = Vec::with_capacity(fields.len());
        let mut offt: u32 = 0;

        for (pos, field) in fields.iter().enumerate() {
            let (offset, bfs, snode) = find_member(btf, &r#type, field, offt)
                .ok_or_else(|| anyhow!("no member {field} in {root}.{path}"))?;

            if pos < fields.len() - 1 {
                // Pointers need an indirect load and reset the running
                // offset. Named structs and unions are still part of their
                // parent, so the offset is preserved.
                let (ind, next) = next_walkable(btf, snode)?;
                match ind {
                    0 => offt = offset,
                    1 => {
                        links.push((offset / 8) as u64);
                        offt = 0;
                    }
                    _ => bail!("pointers of pointers are not supported ({field})"),
                }
                r#type = next;
            } else {
                if bfs.unwrap_or(0) > 0 {
                    bail!("{field} is a bitfield, it cannot end a chain");
                }
                check_leaf(btf, &snode)
                    .map_err(|e| anyhow!("invalid leaf {field} in {root}.{path}: {e}"))?;
                links.push((offset / 8) as u64);
            }
        }

        Ok(ReadChain::new(links))
    }
}
