use tracing::info;

use super::{
    CacheEntry, CreateRequest, DeviceCache, KNOWN_FILESYSTEMS, MethodChoice, MountpointChoice,
    PartAction, PartitionEdits, PartitionEntry, PartitionOps, StepGate,
};

/// In-memory stand-in for the partitioning backend.
///
/// Requests are applied directly to the cache (edits, deletes, undo)
/// or just logged (creates, which would need real geometry); after
/// every accepted request the cache is marked dirty so the host knows
/// to rebuild its views.
pub struct MockBackend {
    cache: DeviceCache,
    pristine: DeviceCache,
    dirty: bool,
}

impl MockBackend {
    pub fn new(cache: DeviceCache) -> Self {
        Self {
            pristine: cache.clone(),
            cache,
            dirty: false,
        }
    }

    pub fn cache(&self) -> &DeviceCache {
        &self.cache
    }

    /// True once per accepted mutation; the caller rebuilds its views.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl PartitionOps for MockBackend {
    fn available_actions(&self, _devpart: &str, entry: &CacheEntry) -> Vec<PartAction> {
        match entry {
            CacheEntry::Disk(_) => vec![PartAction::NewLabel],
            CacheEntry::Partition(part) => {
                if part.parted.fs == "free" {
                    if part.can_new {
                        vec![PartAction::New]
                    } else {
                        Vec::new()
                    }
                } else if part.id.is_some() {
                    vec![PartAction::Edit, PartAction::Delete]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn create_label(&mut self, devpart: &str) {
        info!("create partition table on {devpart}");
        let Some(disk) = self.cache.disks.get(devpart) else {
            return;
        };
        let dev = disk.dev.clone();
        self.cache.partitions.retain(|_, part| part.dev != dev);
        let disks = &self.cache.disks;
        let partitions = &self.cache.partitions;
        self.cache
            .order
            .retain(|key| disks.contains_key(key) || partitions.contains_key(key));
        self.dirty = true;
    }

    fn create_partition(&mut self, devpart: &str, request: CreateRequest) {
        // Real geometry (new slot ids, offsets) comes from partman; the
        // mock only records that the request was issued.
        info!(
            "create partition in {devpart}: {} MB, {:?}/{:?}, method {}, mountpoint {:?}",
            request.size_mb, request.kind, request.place, request.method, request.mountpoint
        );
        self.dirty = true;
    }

    fn edit_partition(&mut self, devpart: &str, edits: PartitionEdits) {
        info!("edit {devpart}: {edits:?}");
        let Some(part) = self.cache.partitions.get_mut(devpart) else {
            return;
        };
        if let Some(method) = &edits.method {
            part.method = Some(method.clone());
            if KNOWN_FILESYSTEMS.contains(&method.as_str()) {
                part.filesystem = Some(method.clone());
                part.acting_filesystem = Some(method.clone());
            }
        }
        if let Some(format) = edits.format {
            part.method = Some(if format { "format" } else { "keep" }.to_string());
        }
        if let Some(mountpoint) = &edits.mountpoint {
            part.mountpoint = if mountpoint.is_empty() {
                None
            } else {
                Some(mountpoint.clone())
            };
        }
        self.dirty = true;
    }

    fn delete_partition(&mut self, devpart: &str) {
        info!("delete {devpart}");
        if self.cache.partitions.remove(devpart).is_some() {
            self.cache.order.retain(|key| key != devpart);
            self.dirty = true;
        }
    }

    fn undo(&mut self) {
        info!("undo all partitioning changes");
        self.cache = self.pristine.clone();
        self.dirty = true;
    }

    fn use_as_choices(&self, _devpart: &str) -> Vec<MethodChoice> {
        standard_method_choices()
    }

    fn default_mountpoint_choices(&self, filesystem: Option<&str>) -> Vec<MountpointChoice> {
        let swap = filesystem.is_some_and(|fs| fs == "swap");
        if swap {
            return Vec::new();
        }
        ["/", "/boot", "/home", "/tmp", "/usr", "/var", "/srv", "/opt"]
            .iter()
            .map(|mountpoint| MountpointChoice {
                mountpoint: mountpoint.to_string(),
                code: mountpoint.trim_start_matches('/').to_string(),
                description: mountpoint.to_string(),
            })
            .collect()
    }

    fn current_method(&self, partition: &PartitionEntry) -> Option<String> {
        partition.method.clone()
    }

    fn current_mountpoint(&self, partition: &PartitionEntry) -> Option<String> {
        partition.mountpoint.clone()
    }

    fn format_enabled(&self, partition: &PartitionEntry) -> bool {
        partition.method.is_some() && partition.can_activate_format
    }
}

/// The partitioner's standard "use as" menu.
pub fn standard_method_choices() -> Vec<MethodChoice> {
    [
        ("25filesystem", "ext4", "Ext4 journaling file system"),
        ("25filesystem", "ext3", "Ext3 journaling file system"),
        ("25filesystem", "ext2", "Ext2 file system"),
        ("25filesystem", "btrfs", "btrfs journaling file system"),
        ("25filesystem", "jfs", "JFS journaling file system"),
        ("25filesystem", "xfs", "XFS journaling file system"),
        ("25filesystem", "fat16", "FAT16 file system"),
        ("25filesystem", "fat32", "FAT32 file system"),
        ("40swap", "swap", "swap area"),
        ("70dont_use", "dontuse", "do not use the partition"),
    ]
    .iter()
    .map(|(script, method, description)| MethodChoice {
        script: script.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    })
    .collect()
}

/// Step gate that just records the flags, for the demo binaries and
/// tests.
#[derive(Debug, Clone)]
pub struct DemoGate {
    change_allowed: bool,
    forward_allowed: bool,
}

impl DemoGate {
    pub fn new() -> Self {
        Self {
            change_allowed: true,
            forward_allowed: true,
        }
    }

    pub fn forward_allowed(&self) -> bool {
        self.forward_allowed
    }
}

impl Default for DemoGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StepGate for DemoGate {
    fn allowed_change_step(&self) -> bool {
        self.change_allowed
    }

    fn allow_change_step(&mut self, allowed: bool) {
        self.change_allowed = allowed;
    }

    fn allow_go_forward(&mut self, allowed: bool) {
        self.forward_allowed = allowed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;

    fn backend() -> MockBackend {
        MockBackend::new(LayoutConfig::sample().to_cache())
    }

    fn first_partition_key(backend: &MockBackend) -> String {
        backend
            .cache()
            .order
            .iter()
            .find(|key| backend.cache().partitions.contains_key(*key))
            .expect("sample cache has partitions")
            .clone()
    }

    #[test]
    fn edit_applies_method_and_filesystem() {
        let mut backend = backend();
        let key = first_partition_key(&backend);
        backend.edit_partition(
            &key,
            PartitionEdits {
                method: Some("ext3".to_string()),
                ..Default::default()
            },
        );
        let part = &backend.cache().partitions[&key];
        assert_eq!(part.method.as_deref(), Some("ext3"));
        assert_eq!(part.filesystem.as_deref(), Some("ext3"));
        assert!(backend.take_dirty());
        assert!(!backend.take_dirty());
    }

    #[test]
    fn undo_restores_the_pristine_cache() {
        let mut backend = backend();
        let key = first_partition_key(&backend);
        backend.delete_partition(&key);
        assert!(!backend.cache().partitions.contains_key(&key));
        backend.undo();
        assert!(backend.cache().partitions.contains_key(&key));
    }

    #[test]
    fn format_toggle_rewrites_the_method() {
        let mut backend = backend();
        let key = first_partition_key(&backend);
        backend.edit_partition(
            &key,
            PartitionEdits {
                format: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(
            backend.cache().partitions[&key].method.as_deref(),
            Some("format")
        );
    }
}
