use std::{fs, path::Path};

use anyhow::{anyhow, bail, Result};
use btf_rs::{Btf, Struct, Type};

/// Btf provides multi-module Btf lookups.
pub struct BtfInfo {
    /// Main Btf object (vmlinux).
    vmlinux: Btf,
    /// Extra Btf objects (modules).
    modules: Vec<Btf>,
}

impl BtfInfo {
    /// Parse the running kernel BTF files and create a BtfInfo object.
    pub fn system() -> Result<BtfInfo> {
        let vmlinux = Btf::from_file("/sys/kernel/btf/vmlinux")
            .map_err(|e| anyhow!("Could not open /sys/kernel/btf/vmlinux: {e}"))?;

        // Load module btf files if possible.
        let modules = fs::read_dir("/sys/kernel/btf")?
            .filter(|f| f.is_ok() && f.as_ref().unwrap().file_name().ne("vmlinux"))
            .map(|f| Btf::from_split_file(f.as_ref().unwrap().path(), &vmlinux))
            .collect::<Result<Vec<Btf>>>()?;

        Ok(BtfInfo { vmlinux, modules })
    }

    /// Parse a standalone BTF file, with no split modules. Used to inspect
    /// fixtures or BTF blobs extracted from other kernels.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<BtfInfo> {
        Ok(BtfInfo {
            vmlinux: Btf::from_file(path)?,
            modules: Vec::new(),
        })
    }

    /// Parse an in-memory BTF blob, with no split modules.
    pub fn from_bytes(bytes: &[u8]) -> Result<BtfInfo> {
        Ok(BtfInfo {
            vmlinux: Btf::from_bytes(bytes)?,
            modules: Vec::new(),
        })
    }

    /// Look for types based on their name and return them along with the Btf
    /// object where each was found. Subsequent lookups based on those types
    /// (such as nested types by id) must be done on the returned Btf object
    /// since type ids of different modules overlap.
    ///
    /// vmlinux is given priority in the lookups.
    pub(crate) fn resolve_types_by_name(&self, name: &str) -> Result<Vec<(&Btf, Type)>> {
        let mut types = Vec::new();

        if let Ok(mut found) = self.vmlinux.resolve_types_by_name(name) {
            found.drain(..).for_each(|t| types.push((&self.vmlinux, t)));
        }

        for module in self.modules.iter() {
            if let Ok(mut found) = module.resolve_types_by_name(name) {
                found.drain(..).for_each(|t| types.push((module, t)));
            }
        }

        if types.is_empty() {
            bail!("No type linked to name {name}");
        }

        Ok(types)
    }

    /// Resolve a structure definition by name, skipping same-name non-struct
    /// types and forward declarations.
    pub(crate) fn resolve_struct(&self, name: &str) -> Result<(&Btf, Struct)> {
        let types = self.resolve_types_by_name(name)?;
        match types.into_iter().find(|(_, t)| matches!(t, Type::Struct(_))) {
            Some((btf, Type::Struct(r#struct))) => Ok((btf, r#struct)),
            _ => bail!("Could not resolve {name} to a struct"),
        }
    }
}
