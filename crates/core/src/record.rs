//! Fixed-layout payload records.
//!
//! The node daemon reads and writes payloads as raw C structs (LP64,
//! little-endian). Each record here serializes through bincode's legacy
//! configuration, which writes fixed-width little-endian integers without
//! length prefixes, and spells out the struct padding as explicit fields.
//! The byte image therefore equals the peer's in-memory layout, and every
//! record has a compile-time `SIZE` that payloads are checked against.

use bincode::config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Revision of the record layouts below. Bump on any field change.
pub const LAYOUT_REVISION: u32 = 1;

/// Number of 64-bit words in a [`CpuSet`] mask.
pub const CPU_MASK_WORDS: usize = 16;

/// Number of CPUs a [`CpuSet`] can describe.
pub const MAX_CPUS: usize = 1024;

const BYTES_PER_KIB: u64 = 1024;
const BYTES_PER_KIB_SIGNED: i64 = 1024;

/// A payload record with a fixed wire size.
pub trait WireRecord: Serialize + DeserializeOwned {
    /// Record name used in error messages.
    const NAME: &'static str;

    /// Exact encoded size in bytes.
    const SIZE: usize;

    /// Encode into exactly [`Self::SIZE`] bytes.
    ///
    /// # Errors
    /// [`Error::PayloadCodec`] if bincode fails, or [`Error::PayloadLength`]
    /// if the encoded image is not `SIZE` bytes.
    fn to_payload(&self) -> Result<Vec<u8>> {
        let bytes = bincode::serde::encode_to_vec(self, config::legacy())
            .map_err(|e| Error::payload_codec(Self::NAME, "encode", e.to_string()))?;
        if bytes.len() != Self::SIZE {
            return Err(Error::payload_length(Self::NAME, Self::SIZE, bytes.len()));
        }
        Ok(bytes)
    }

    /// Decode from a payload of exactly [`Self::SIZE`] bytes.
    ///
    /// # Errors
    /// [`Error::PayloadLength`] on a size mismatch, or [`Error::PayloadCodec`]
    /// if the bytes are not a valid image of the record.
    fn from_payload(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::payload_length(Self::NAME, Self::SIZE, bytes.len()));
        }
        let (record, _) = bincode::serde::decode_from_slice(bytes, config::legacy())
            .map_err(|e| Error::payload_codec(Self::NAME, "decode", e.to_string()))?;
        Ok(record)
    }
}

/// Node memory usage.
///
/// The daemon reports bytes; [`NodeClient::mem_info`](crate::NodeClient::mem_info)
/// returns the record converted to KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub shared: u64,
    pub hugepage_used: u64,
}

impl MemInfo {
    /// Every field divided by 1024.
    #[must_use]
    pub const fn to_kib(self) -> Self {
        Self {
            total: self.total / BYTES_PER_KIB,
            used: self.used / BYTES_PER_KIB,
            free: self.free / BYTES_PER_KIB,
            shared: self.shared / BYTES_PER_KIB,
            hugepage_used: self.hugepage_used / BYTES_PER_KIB,
        }
    }
}

impl WireRecord for MemInfo {
    const NAME: &'static str = "mem_info";
    const SIZE: usize = 40;
}

/// Per-process memory counters, as in `/proc/<pid>/statm`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidStatm {
    pub size: i64,
    pub resident: i64,
    pub share: i64,
    pub trs: i64,
    pub drs: i64,
}

impl PidStatm {
    /// Every field divided by 1024.
    #[must_use]
    pub const fn to_kib(self) -> Self {
        Self {
            size: self.size / BYTES_PER_KIB_SIGNED,
            resident: self.resident / BYTES_PER_KIB_SIGNED,
            share: self.share / BYTES_PER_KIB_SIGNED,
            trs: self.trs / BYTES_PER_KIB_SIGNED,
            drs: self.drs / BYTES_PER_KIB_SIGNED,
        }
    }
}

impl WireRecord for PidStatm {
    const NAME: &'static str = "pid_statm";
    const SIZE: usize = 40;
}

/// Node load averages and process counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAvg {
    pub av_1: f64,
    pub av_5: f64,
    pub av_15: f64,
    pub runnable: i32,
    pub total_proc: i32,
}

impl WireRecord for LoadAvg {
    const NAME: &'static str = "load_avg";
    const SIZE: usize = 32;
}

/// `struct timeval`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeVal {
    pub sec: i64,
    pub usec: i64,
}

/// Resource usage of a VE process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RusageInfo {
    pub utime: TimeVal,
    pub elapsed: TimeVal,
    pub max_rss: i64,
    pub nvcsw: i64,
    pub nivcsw: i64,
    pub page_size: i64,
}

impl WireRecord for RusageInfo {
    const NAME: &'static str = "rusage";
    const SIZE: usize = 64;
}

/// A set of VE cores, stored as a 1024-bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CpuSet {
    mask: [u64; CPU_MASK_WORDS],
}

impl CpuSet {
    /// An empty set.
    pub const fn new() -> Self {
        Self {
            mask: [0; CPU_MASK_WORDS],
        }
    }

    /// Build a set from core indices.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if a core index is `>= MAX_CPUS`.
    pub fn from_cpus(cpus: impl IntoIterator<Item = usize>) -> Result<Self> {
        cpus.into_iter().try_fold(Self::new(), |mut set, cpu| {
            set.insert(cpu)?;
            Ok(set)
        })
    }

    /// Add `cpu` to the set.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if `cpu >= MAX_CPUS`.
    pub fn insert(&mut self, cpu: usize) -> Result<()> {
        let word = self
            .mask
            .get_mut(cpu / 64)
            .ok_or_else(|| Error::invalid_argument(format!("cpu {cpu} out of range")))?;
        *word |= bit(cpu);
        Ok(())
    }

    /// Whether `cpu` is in the set.
    pub fn contains(&self, cpu: usize) -> bool {
        self.mask
            .get(cpu / 64)
            .is_some_and(|word| word & bit(cpu) != 0)
    }

    /// Core indices in ascending order.
    pub fn cpus(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_CPUS).filter(|&cpu| self.contains(cpu))
    }

    /// Number of cores in the set.
    pub fn count(&self) -> usize {
        self.mask.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.iter().all(|&word| word == 0)
    }

    /// Raw mask words, least significant core first.
    pub const fn words(&self) -> &[u64; CPU_MASK_WORDS] {
        &self.mask
    }
}

/// Bit of `cpu` within its mask word.
const fn bit(cpu: usize) -> u64 {
    1u64.wrapping_shl((cpu % 64) as u32)
}

/// Affinity request and reply body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affinity {
    pub cpusetsize: u64,
    pub mask: CpuSet,
}

impl Affinity {
    /// Size in bytes of the mask carried by an affinity record.
    pub const MASK_BYTES: u64 = 128;

    pub const fn new(mask: CpuSet) -> Self {
        Self {
            cpusetsize: Self::MASK_BYTES,
            mask,
        }
    }
}

impl WireRecord for Affinity {
    const NAME: &'static str = "affinity";
    const SIZE: usize = 136;
}

/// Soft and hard limit of one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RLimit {
    pub soft: u64,
    pub hard: u64,
}

impl RLimit {
    /// Value meaning "no limit".
    pub const INFINITY: u64 = u64::MAX;
}

/// Resource limit request and reply body.
///
/// The daemon applies `new_limit` when `is_new_limit` is set and always
/// returns the previous limit in `old_limit`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrLimit {
    pub resource: i32,
    pub is_new_limit: bool,
    _pad: [u8; 3],
    pub new_limit: RLimit,
    pub old_limit: RLimit,
}

impl PrLimit {
    /// A query for the current limit of `resource`.
    pub const fn query(resource: i32) -> Self {
        Self {
            resource,
            is_new_limit: false,
            _pad: [0; 3],
            new_limit: RLimit { soft: 0, hard: 0 },
            old_limit: RLimit { soft: 0, hard: 0 },
        }
    }

    /// A request to replace the limit of `resource` with `limit`.
    pub const fn update(resource: i32, limit: RLimit) -> Self {
        Self {
            is_new_limit: true,
            new_limit: limit,
            ..Self::query(resource)
        }
    }
}

impl WireRecord for PrLimit {
    const NAME: &'static str = "prlimit";
    const SIZE: usize = 40;
}
