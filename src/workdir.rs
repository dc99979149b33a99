//! Provisioning of the workdir (`mnp --init`, `mnp --cleanup`).
use std::fs::{self, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use anyhow::Context;

use crate::channel::{Category, Ensured, Registry, PAYMENT_DIR, TRANSFER_DIR};
use crate::mode::render_symbolic_mode;
use crate::store::file_ledger::LEDGER_FILE;

const LONG_LIVED: [Category; 3] = [
    Category::TxidFeed,
    Category::DoubleSpendAlert,
    Category::RpcConnectionAlert,
];

/// Create the workdir, its category directories, the ledger file and the
/// long-lived pipes. Whatever already exists is left alone.
pub fn init(registry: &Registry) -> anyhow::Result<()> {
    let root = registry.workdir();
    tracing::debug!(
        workdir = %root.display(),
        dir_mode = %render_symbolic_mode(registry.dir_mode()),
        pipe_mode = %render_symbolic_mode(registry.pipe_mode()),
        "initialising"
    );

    for dir in [root.to_owned(), root.join(TRANSFER_DIR), root.join(PAYMENT_DIR)] {
        registry
            .ensure_dir(&dir)
            .with_context(|| format!("could not create {}", dir.display()))?;
    }

    let ledger = root.join(LEDGER_FILE);
    touch(&ledger, registry.pipe_mode()).with_context(|| format!("could not create {}", ledger.display()))?;

    for category in LONG_LIVED {
        let channel = registry.singleton(category);
        if registry.ensure(&channel)? == Ensured::AlreadyExists {
            tracing::debug!(path = %channel.path().display(), "kept");
        }
    }
    tracing::info!(workdir = %root.display(), "workdir is up");
    Ok(())
}

/// Remove the workdir and everything under it. A missing workdir is fine.
pub fn cleanup(workdir: &Path) -> anyhow::Result<()> {
    match fs::remove_dir_all(workdir) {
        Ok(()) => {
            tracing::info!(workdir = %workdir.display(), "workdir is down");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("could not delete {}", workdir.display())),
    }
}

/// Fail with a pointer to `mnp --init` unless `workdir` is a directory.
pub fn require(workdir: &Path) -> anyhow::Result<()> {
    if workdir.is_dir() {
        Ok(())
    } else {
        anyhow::bail!("workdir {} does not exist; run mnp --init first", workdir.display())
    }
}

fn touch(path: &Path, mode: u32) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    OpenOptions::new().append(true).create(true).mode(mode).open(path)?;
    fs::set_permissions(path, Permissions::from_mode(mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::fifo::is_fifo;

    #[test]
    fn init_is_idempotent_and_cleanup_tolerates_absence() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("w");
        let reg = Registry::new(&root, 0o750, 0o640);

        init(&reg).unwrap();
        init(&reg).unwrap();

        assert!(root.join(TRANSFER_DIR).is_dir());
        assert!(root.join(PAYMENT_DIR).is_dir());
        assert!(root.join(LEDGER_FILE).is_file());
        for c in LONG_LIVED {
            let meta = fs::symlink_metadata(reg.singleton(c).path()).unwrap();
            assert!(is_fifo(&meta));
            assert_eq!(meta.permissions().mode() & 0o777, 0o640);
        }
        require(&root).unwrap();

        cleanup(&root).unwrap();
        assert!(!root.exists());
        cleanup(&root).unwrap();
        assert!(require(&root).is_err());
    }
}
