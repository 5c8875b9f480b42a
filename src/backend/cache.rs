use serde::Deserialize;
use std::collections::HashMap;

/// Attributes parted reports for one partition slot.
///
/// `fs == "free"` marks unallocated space; `kind` is the partition
/// table slot type (`primary`, `logical`, `pri/log`, `unusable`).
#[derive(Debug, Clone, Deserialize)]
pub struct PartedInfo {
    pub fs: String,
    pub path: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One partition record from the backend's cache.
///
/// Optional fields stand in for key presence in the backend's attribute
/// dictionaries: `id` is absent on whole-disk records, `method` is
/// absent until the partitioner has assigned the slot a use.
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionEntry {
    pub dev: String,
    pub parted: PartedInfo,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub filesystem: Option<String>,
    #[serde(default)]
    pub acting_filesystem: Option<String>,
    #[serde(default)]
    pub detected_filesystem: Option<String>,
    #[serde(default)]
    pub can_activate_format: bool,
    #[serde(default)]
    pub can_resize: bool,
    #[serde(default)]
    pub can_new: bool,
    #[serde(default)]
    pub resize_min_size: Option<u64>,
    #[serde(default)]
    pub resize_max_size: Option<u64>,
    #[serde(default)]
    pub resize_pref_size: Option<u64>,
    #[serde(default)]
    pub method_choices: Vec<MethodChoice>,
    #[serde(default)]
    pub mountpoint_choices: Vec<MountpointChoice>,
    #[serde(default)]
    pub mountpoint: Option<String>,
}

/// One whole-disk record from the backend's cache.
#[derive(Debug, Clone, Deserialize)]
pub struct DiskEntry {
    pub dev: String,
    pub device: String,
    #[serde(default)]
    pub label: Vec<String>,
}

/// A "use as" choice triple: partman script, method tag, description.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodChoice {
    pub script: String,
    pub method: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MountpointChoice {
    pub mountpoint: String,
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub enum CacheEntry {
    Disk(DiskEntry),
    Partition(PartitionEntry),
}

/// The backend's disk/partition attribute cache plus the ordering
/// sequence that interleaves disk and partition keys in on-disk order
/// (a partition's key follows its owning disk's key).
#[derive(Debug, Clone, Default)]
pub struct DeviceCache {
    pub disks: HashMap<String, DiskEntry>,
    pub partitions: HashMap<String, PartitionEntry>,
    pub order: Vec<String>,
}

impl DeviceCache {
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        if let Some(disk) = self.disks.get(key) {
            return Some(CacheEntry::Disk(disk.clone()));
        }
        self.partitions
            .get(key)
            .map(|part| CacheEntry::Partition(part.clone()))
    }
}
