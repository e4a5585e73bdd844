use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::marker::PhantomData;
use std::ops::Range;
use std::path::{Path, PathBuf};

use bytemuck::{bytes_of, pod_read_unaligned, Pod};
use memmap2::{Mmap, MmapMut};

use crate::error::{Result, SPTreeError};
use crate::plane::HyperPlane;
use crate::store::constants::{
    record_size, Header, NodeRecord, FLAG_LINKED, HEADER_SIZE, KIND_AXIS, KIND_PLANE,
};
use crate::store::{Node, NodeStore, Side, Split};
use crate::value::Value;

/// A 1-based slot number in a [`MappedStore`]. Slot 0 is the null handle and never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Slot(pub(crate) u64);

impl Slot {
    pub fn index(&self) -> u64 {
        self.0
    }

    #[inline]
    fn encode(slot: Option<Slot>) -> u64 {
        slot.map_or(0, |s| s.0)
    }

    #[inline]
    fn decode(raw: u64) -> Option<Slot> {
        (raw != 0).then_some(Slot(raw))
    }
}

#[derive(Debug)]
enum Mapping {
    Writable(MmapMut),
    ReadOnly(Mmap),
}

impl Mapping {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Writable(map) => map,
            Self::ReadOnly(map) => map,
        }
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        match self {
            Self::Writable(map) => Ok(map),
            Self::ReadOnly(_) => Err(SPTreeError::ReadOnly),
        }
    }
}

/// A node arena inside a memory-mapped file.
///
/// The file holds a [header](crate::store), a caller-defined metadata block and `item_count`
/// fixed-size node records. Nodes are bump-allocated and never freed individually; the space is
/// reclaimed only by deleting the file.
///
/// A store made with [`MappedStore::create`] is writable. One opened with [`MappedStore::open`]
/// is mapped read-only, so any number of processes can share it while querying.
#[derive(Debug)]
pub struct MappedStore<const D: usize, P> {
    path: PathBuf,
    mapping: Mapping,
    header: Header,
    phantom: PhantomData<P>,
}

impl<const D: usize, P: Pod> MappedStore<D, P> {
    /// The size in bytes of one node slot: the node record followed by the payload.
    pub const fn item_size() -> usize {
        record_size::<D>() + std::mem::size_of::<P>()
    }

    /// The total file size for `item_count` slots, `None` if it overflows a `u64`.
    fn file_size(item_count: u64, metadata_size: u64) -> Option<u64> {
        (Self::item_size() as u64)
            .checked_mul(item_count)?
            .checked_add(metadata_size)?
            .checked_add(HEADER_SIZE as u64)
    }

    /// Create (or truncate) the file at `path` with room for `item_count` nodes and a
    /// `metadata_size` byte metadata block.
    pub fn create(
        path: impl AsRef<Path>,
        item_count: usize,
        metadata_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let size = Self::file_size(item_count as u64, metadata_size as u64).ok_or_else(|| {
            SPTreeError::General(format!("{item_count} node slots do not fit in one file"))
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| SPTreeError::io(&path, e))?;

        // set_len zero-fills the whole arena up front
        file.set_len(size)
            .map_err(|e| SPTreeError::io(&path, e))?;

        // SAFETY: the file was just created by us; concurrent writers must be excluded by the
        // caller, as for any single-writer arena.
        let map = unsafe { MmapMut::map_mut(&file) }.map_err(|e| SPTreeError::io(&path, e))?;

        let header = Header {
            header_size: HEADER_SIZE as u64,
            item_count: item_count as u64,
            item_size: Self::item_size() as u64,
            metadata_size: metadata_size as u64,
            len: 0,
            root: 0,
            flags: 0,
        };

        let mut store = Self {
            path,
            mapping: Mapping::Writable(map),
            header,
            phantom: PhantomData,
        };
        store.write_header()?;

        log::debug!(
            "Created mapped node store {} ({} items of {} bytes, {} bytes of metadata)",
            store.path.display(),
            item_count,
            Self::item_size(),
            metadata_size
        );
        Ok(store)
    }

    /// Open an existing file read-only, accepting whatever item count it was created with.
    pub fn open(path: impl AsRef<Path>, metadata_size: usize) -> Result<Self> {
        Self::open_checked(path.as_ref(), 0, metadata_size)
    }

    /// Open the file if it exists, otherwise create it.
    ///
    /// When the file exists its header must match; a zero `item_count` accepts any count.
    pub fn open_or_create(
        path: impl AsRef<Path>,
        item_count: usize,
        metadata_size: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open_checked(path, item_count, metadata_size)
        } else {
            Self::create(path, item_count, metadata_size)
        }
    }

    fn open_checked(path: &Path, item_count: usize, metadata_size: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| SPTreeError::io(path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| SPTreeError::io(path, e))?
            .len();

        let mismatch = |field: &'static str, found: u64, expected: u64| {
            SPTreeError::HeaderMismatch {
                path: path.to_path_buf(),
                field,
                found,
                expected,
            }
        };

        if file_len < HEADER_SIZE as u64 {
            return Err(mismatch("file_size", file_len, HEADER_SIZE as u64));
        }

        // SAFETY: mapped read-only; the file must not be truncated while it is in use, as with
        // any memory-mapped file.
        let map = unsafe { Mmap::map(&file) }.map_err(|e| SPTreeError::io(path, e))?;
        let header: Header = pod_read_unaligned(&map[..HEADER_SIZE]);

        if header.header_size != HEADER_SIZE as u64 {
            return Err(mismatch(
                "header_size",
                header.header_size,
                HEADER_SIZE as u64,
            ));
        }
        if header.item_size != Self::item_size() as u64 {
            return Err(mismatch(
                "item_size",
                header.item_size,
                Self::item_size() as u64,
            ));
        }
        if header.metadata_size != metadata_size as u64 {
            return Err(mismatch(
                "metadata_size",
                header.metadata_size,
                metadata_size as u64,
            ));
        }
        if item_count != 0 && header.item_count != item_count as u64 {
            return Err(mismatch("item_count", header.item_count, item_count as u64));
        }
        let Some(expected_len) = Self::file_size(header.item_count, header.metadata_size) else {
            let prefix = (HEADER_SIZE as u64).saturating_add(header.metadata_size);
            let available = file_len.saturating_sub(prefix);
            return Err(mismatch(
                "item_count",
                header.item_count,
                available / Self::item_size() as u64,
            ));
        };
        if file_len != expected_len {
            return Err(mismatch("file_size", file_len, expected_len));
        }
        if header.len > header.item_count {
            return Err(mismatch("len", header.len, header.item_count));
        }
        if header.root > header.len {
            return Err(mismatch("root", header.root, header.len));
        }

        log::debug!(
            "Opened mapped node store {} read-only ({} of {} items in use)",
            path.display(),
            header.len,
            header.item_count
        );

        let store = Self {
            path: path.to_path_buf(),
            mapping: Mapping::ReadOnly(map),
            header,
            phantom: PhantomData,
        };
        store.check_records()?;
        Ok(store)
    }

    /// Validate every record in use, so that queries on a read-only store can't follow a bad
    /// handle.
    ///
    /// Nodes are always allocated before their children and before their successor in the
    /// linked preorder, so a valid handle points forward and stays within `len`.
    fn check_records(&self) -> Result<()> {
        let len = self.header.len;
        let invalid = |slot: u64, field: &'static str, found: u64| SPTreeError::InvalidRecord {
            path: self.path.clone(),
            slot,
            field,
            found,
        };

        for slot in 1..=len {
            let record = self.record(Slot(slot));
            match record.kind {
                KIND_AXIS if record.axis >= D as u64 => {
                    return Err(invalid(slot, "axis", record.axis));
                }
                KIND_AXIS | KIND_PLANE => {}
                kind => return Err(invalid(slot, "kind", kind)),
            }
            for (field, handle) in [
                ("left", record.left),
                ("right", record.right),
                ("next", record.next),
            ] {
                if handle != 0 && (handle <= slot || handle > len) {
                    return Err(invalid(slot, field, handle));
                }
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The number of node slots in the arena.
    pub fn capacity(&self) -> usize {
        self.header.item_count as usize
    }

    /// The caller's metadata block.
    pub fn metadata(&self) -> &[u8] {
        &self.mapping.bytes()[self.metadata_range()]
    }

    pub fn metadata_mut(&mut self) -> Result<&mut [u8]> {
        let range = self.metadata_range();
        Ok(&mut self.mapping.bytes_mut()?[range])
    }

    /// Read a typed value from the front of the metadata block.
    pub fn read_metadata<M: Pod>(&self) -> Result<M> {
        let size = std::mem::size_of::<M>();
        let metadata = self.metadata();
        if size > metadata.len() {
            return Err(SPTreeError::MetadataSize {
                available: metadata.len(),
                requested: size,
            });
        }
        Ok(pod_read_unaligned(&metadata[..size]))
    }

    /// Write a typed value to the front of the metadata block.
    pub fn write_metadata<M: Pod>(&mut self, value: &M) -> Result<()> {
        let bytes = bytes_of(value);
        let metadata = self.metadata_mut()?;
        if bytes.len() > metadata.len() {
            return Err(SPTreeError::MetadataSize {
                available: metadata.len(),
                requested: bytes.len(),
            });
        }
        metadata[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn metadata_range(&self) -> Range<usize> {
        HEADER_SIZE..HEADER_SIZE + self.header.metadata_size as usize
    }

    fn write_header(&mut self) -> Result<()> {
        let header = self.header;
        self.mapping.bytes_mut()?[..HEADER_SIZE].copy_from_slice(bytes_of(&header));
        Ok(())
    }

    /// Byte range of a slot. Panics on the null slot or a slot past the arena's length.
    fn slot_range(&self, slot: Slot) -> Range<usize> {
        assert!(
            slot.0 >= 1 && slot.0 <= self.header.len,
            "Invalid slot {} in arena of length {}",
            slot.0,
            self.header.len
        );
        let start = HEADER_SIZE
            + self.header.metadata_size as usize
            + (slot.0 as usize - 1) * Self::item_size();
        start..start + Self::item_size()
    }

    fn record(&self, slot: Slot) -> NodeRecord<D> {
        let range = self.slot_range(slot);
        pod_read_unaligned(&self.mapping.bytes()[range.start..range.start + record_size::<D>()])
    }

    fn write_record(&mut self, slot: Slot, record: &NodeRecord<D>) -> Result<()> {
        let range = self.slot_range(slot);
        self.mapping.bytes_mut()?[range.start..range.start + record_size::<D>()]
            .copy_from_slice(bytes_of(record));
        Ok(())
    }

    fn update_record(&mut self, slot: Slot, f: impl FnOnce(&mut NodeRecord<D>)) -> Result<()> {
        if !self.writable() {
            return Err(SPTreeError::ReadOnly);
        }
        let mut record = self.record(slot);
        f(&mut record);
        self.write_record(slot, &record)
    }

    fn writable(&self) -> bool {
        matches!(self.mapping, Mapping::Writable(_))
    }
}

impl<const D: usize, P: Pod> NodeStore<D, P> for MappedStore<D, P> {
    type Handle = Slot;

    fn alloc(&mut self, value: Value<D, P>, split: Split<D>) -> Result<Slot> {
        if !self.writable() {
            return Err(SPTreeError::ReadOnly);
        }
        if self.header.len >= self.header.item_count {
            return Err(SPTreeError::ArenaExhausted {
                capacity: self.capacity(),
            });
        }

        let (kind, axis, plane, dist) = match split {
            Split::Axis(axis) => (KIND_AXIS, axis as u64, HyperPlane::zero(), 0.0),
            Split::Plane { plane, dist } => (KIND_PLANE, 0, plane, dist),
        };
        let record = NodeRecord {
            point: value.point,
            normal: *plane.normal(),
            offset: plane.offset(),
            dist,
            axis,
            kind,
            left: 0,
            right: 0,
            next: 0,
        };

        self.header.len += 1;
        self.write_header()?;
        let slot = Slot(self.header.len);
        let range = self.slot_range(slot);
        let bytes = self.mapping.bytes_mut()?;
        bytes[range.start..range.start + record_size::<D>()].copy_from_slice(bytes_of(&record));
        bytes[range.start + record_size::<D>()..range.end]
            .copy_from_slice(bytes_of(&value.payload));
        Ok(slot)
    }

    fn node(&self, slot: Slot) -> Cow<'_, Node<D, P, Slot>> {
        let range = self.slot_range(slot);
        let bytes = &self.mapping.bytes()[range];
        let record: NodeRecord<D> = pod_read_unaligned(&bytes[..record_size::<D>()]);
        let payload: P = pod_read_unaligned(&bytes[record_size::<D>()..]);

        let split = if record.kind == KIND_PLANE {
            Split::Plane {
                plane: HyperPlane::from_parts(record.normal, record.offset),
                dist: record.dist,
            }
        } else {
            Split::Axis(record.axis as usize)
        };

        Cow::Owned(Node {
            value: Value::new(record.point, payload),
            split,
            left: Slot::decode(record.left),
            right: Slot::decode(record.right),
            next: Slot::decode(record.next),
        })
    }

    fn set_child(&mut self, slot: Slot, side: Side, child: Option<Slot>) -> Result<()> {
        let child = Slot::encode(child);
        self.update_record(slot, |record| match side {
            Side::Left => record.left = child,
            Side::Right => record.right = child,
        })
    }

    fn set_next(&mut self, slot: Slot, next: Option<Slot>) -> Result<()> {
        let next = Slot::encode(next);
        self.update_record(slot, |record| record.next = next)
    }

    fn root(&self) -> Option<Slot> {
        Slot::decode(self.header.root)
    }

    fn set_root(&mut self, root: Option<Slot>) -> Result<()> {
        if !self.writable() {
            return Err(SPTreeError::ReadOnly);
        }
        self.header.root = Slot::encode(root);
        self.write_header()
    }

    fn is_linked(&self) -> bool {
        self.header.flags & FLAG_LINKED != 0
    }

    fn set_linked(&mut self, linked: bool) -> Result<()> {
        if !self.writable() {
            return Err(SPTreeError::ReadOnly);
        }
        if linked {
            self.header.flags |= FLAG_LINKED;
        } else {
            self.header.flags &= !FLAG_LINKED;
        }
        self.write_header()
    }

    fn len(&self) -> usize {
        self.header.len as usize
    }

    fn is_writable(&self) -> bool {
        self.writable()
    }

    fn destroy(&mut self, _root: Slot) {
        // Arena slots are never reclaimed individually.
    }

    fn flush(&self) -> Result<()> {
        match &self.mapping {
            Mapping::Writable(map) => map.flush().map_err(|e| SPTreeError::io(&self.path, e)),
            Mapping::ReadOnly(_) => Ok(()),
        }
    }
}
