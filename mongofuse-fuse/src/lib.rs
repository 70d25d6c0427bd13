//! FUSE exposure of the projection engine.
//!
//! The kernel speaks inodes; the engine speaks paths. This layer keeps the
//! inode↔path bookkeeping and maps engine outcomes onto errno values, nothing
//! more. All filesystem semantics live in `mongofuse-core`.

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyStatfs, ReplyWrite, Request, TimeOrNow,
};
use libc::{EIO, EINVAL, ENOENT, EPERM};
use mongofuse_core::{Attributes, FsError, ProjectionEngine};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

const TTL: Duration = Duration::from_secs(1);
const ROOT_INO: u64 = 1;

pub struct MongoFuse {
    engine: Arc<ProjectionEngine>,
    inodes: HashMap<u64, String>,
    by_path: HashMap<String, u64>,
    next_inode: u64,
}

impl MongoFuse {
    pub fn new(engine: Arc<ProjectionEngine>) -> Self {
        let mut inodes = HashMap::new();
        let mut by_path = HashMap::new();
        inodes.insert(ROOT_INO, "/".to_string());
        by_path.insert("/".to_string(), ROOT_INO);
        Self {
            engine,
            inodes,
            by_path,
            next_inode: ROOT_INO + 1,
        }
    }

    fn ino_for(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.by_path.get(path) {
            return *ino;
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.inodes.insert(ino, path.to_string());
        self.by_path.insert(path.to_string(), ino);
        ino
    }

    fn path_for(&self, ino: u64) -> Option<String> {
        self.inodes.get(&ino).cloned()
    }

    fn child_of(&self, parent: u64, name: &OsStr) -> Option<String> {
        let dir = self.path_for(parent)?;
        let name = name.to_str()?;
        Some(if dir == "/" {
            format!("/{name}")
        } else {
            format!("{dir}/{name}")
        })
    }

    fn file_attr(&self, ino: u64, attr: &Attributes) -> FileAttr {
        let kind = if attr.is_dir() {
            FileType::Directory
        } else {
            FileType::RegularFile
        };
        FileAttr {
            ino,
            size: attr.size,
            blocks: (attr.size + 511) / 512,
            atime: SystemTime::UNIX_EPOCH,
            mtime: SystemTime::UNIX_EPOCH,
            ctime: SystemTime::UNIX_EPOCH,
            crtime: SystemTime::UNIX_EPOCH,
            kind,
            perm: if attr.is_dir() { 0o755 } else { 0o644 },
            nlink: 1,
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
            rdev: 0,
            blksize: 512,
            flags: 0,
        }
    }
}

fn errno(err: &FsError) -> i32 {
    match err {
        FsError::NotFound => ENOENT,
        FsError::InvalidPath | FsError::InvalidDocument(_) => EINVAL,
        FsError::Unsupported => EPERM,
        FsError::Store(_) => EIO,
    }
}

impl Filesystem for MongoFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(path) = self.child_of(parent, name) else { reply.error(ENOENT); return; };
        match self.engine.stat(&path) {
            Ok(attr) => {
                let ino = self.ino_for(&path);
                let attr = self.file_attr(ino, &attr);
                reply.entry(&TTL, &attr, 0);
            }
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let Some(path) = self.path_for(ino) else { reply.error(ENOENT); return; };
        match self.engine.stat(&path) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, &attr)),
            Err(err) => reply.error(errno(&err)),
        }
    }

    // Size changes truncate query files; mode/ownership/time changes are
    // accepted and ignored.
    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let Some(path) = self.path_for(ino) else { reply.error(ENOENT); return; };
        if let Some(size) = size {
            if let Err(err) = self.engine.truncate(&path, size) {
                reply.error(errno(&err));
                return;
            }
        }
        match self.engine.stat(&path) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(ino, &attr)),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(dir) = self.path_for(ino) else { reply.error(ENOENT); return; };
        let names = match self.engine.list(&dir) {
            Ok(names) => names,
            Err(err) => {
                reply.error(errno(&err));
                return;
            }
        };
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            if name == "." || name == ".." {
                entries.push((ino, FileType::Directory, name));
                continue;
            }
            let path = if dir == "/" {
                format!("/{name}")
            } else {
                format!("{dir}/{name}")
            };
            // The listing just populated the attribute cache, so these stats
            // stay off the store.
            let Ok(attr) = self.engine.stat(&path) else { continue };
            let kind = if attr.is_dir() {
                FileType::Directory
            } else {
                FileType::RegularFile
            };
            let child_ino = self.ino_for(&path);
            entries.push((child_ino, kind, name));
        }
        for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            if reply.add(ino, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: fuser::ReplyOpen) {
        if self.inodes.contains_key(&ino) {
            reply.opened(0, 0);
        } else {
            reply.error(ENOENT);
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path_for(ino) else { reply.error(ENOENT); return; };
        match self.engine.read(&path, offset.max(0) as u64, size) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Some(path) = self.path_for(ino) else { reply.error(ENOENT); return; };
        if offset != 0 {
            debug!(path = %path, offset, "non-zero write offset; document writes are whole-file");
        }
        match self.engine.write(&path, data) {
            Ok(written) => reply.written(written as u32),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let Some(path) = self.child_of(parent, name) else { reply.error(ENOENT); return; };
        let fh = match self.engine.create(&path) {
            Ok(fh) => fh,
            Err(err) => {
                reply.error(errno(&err));
                return;
            }
        };
        let ino = self.ino_for(&path);
        // new.json is intentionally never stat-able; answer with an empty
        // file so the open that follows create still succeeds.
        let attr = self.engine.stat(&path).unwrap_or(Attributes::file(0));
        let attr = self.file_attr(ino, &attr);
        reply.created(&TTL, &attr, 0, fh, 0);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let Some(path) = self.child_of(parent, name) else { reply.error(ENOENT); return; };
        if let Err(err) = self.engine.mkdir(&path) {
            reply.error(errno(&err));
            return;
        }
        let ino = self.ino_for(&path);
        match self.engine.stat(&path) {
            Ok(attr) => reply.entry(&TTL, &self.file_attr(ino, &attr), 0),
            Err(err) => reply.error(errno(&err)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let Some(path) = self.child_of(parent, name) else { reply.error(ENOENT); return; };
        match self.engine.unlink(&path) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno(&err)),
        }
    }

    // Removing databases and collections through the filesystem is not
    // supported.
    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, _name: &OsStr, reply: ReplyEmpty) {
        reply.error(EPERM);
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn access(&mut self, _req: &Request<'_>, _ino: u64, _mask: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let s = self.engine.statfs();
        reply.statfs(
            s.blocks, s.bfree, s.bavail, s.files, s.ffree, s.bsize, s.namelen, s.frsize,
        );
    }
}
