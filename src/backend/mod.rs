mod cache;
pub mod mock;

pub use cache::{
    CacheEntry, DeviceCache, DiskEntry, MethodChoice, MountpointChoice, PartedInfo, PartitionEntry,
};

/// Filesystems for which a mountpoint (and the format checkbox) makes
/// sense.
pub const KNOWN_FILESYSTEMS: [&str; 10] = [
    "ext4", "ext3", "ext2", "btrfs", "jfs", "xfs", "fat16", "fat32", "ntfs", "uboot",
];

/// Actions the backend reports as available for a tree selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartAction {
    NewLabel,
    New,
    Edit,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Primary,
    Logical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionPlace {
    Beginning,
    End,
}

/// A new-partition request, sized in the backend's decimal megabytes.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub size_mb: String,
    pub kind: PartitionKind,
    pub place: PartitionPlace,
    pub method: String,
    pub mountpoint: String,
}

/// Changed-only fields of an edit request; `None` means "leave as is".
#[derive(Debug, Clone, Default)]
pub struct PartitionEdits {
    pub size_mb: Option<String>,
    pub method: Option<String>,
    pub mountpoint: Option<String>,
    pub format: Option<bool>,
}

impl PartitionEdits {
    pub fn is_empty(&self) -> bool {
        self.size_mb.is_none()
            && self.method.is_none()
            && self.mountpoint.is_none()
            && self.format.is_none()
    }
}

/// Permission gate owned by the host wizard.
///
/// Every mutating backend request is preceded by an
/// `allowed_change_step` check and an `allow_change_step(false)`; the
/// host re-enables the gate once the request has been processed.
/// `allow_go_forward` drives the wizard's next-button enablement.
pub trait StepGate {
    fn allowed_change_step(&self) -> bool;
    fn allow_change_step(&mut self, allowed: bool);
    fn allow_go_forward(&mut self, allowed: bool);
}

/// The partitioning backend's operation surface, injected wherever the
/// core needs it rather than reached through ambient state.
pub trait PartitionOps {
    fn available_actions(&self, devpart: &str, entry: &CacheEntry) -> Vec<PartAction>;
    fn create_label(&mut self, devpart: &str);
    fn create_partition(&mut self, devpart: &str, request: CreateRequest);
    fn edit_partition(&mut self, devpart: &str, edits: PartitionEdits);
    fn delete_partition(&mut self, devpart: &str);
    fn undo(&mut self);
    fn use_as_choices(&self, devpart: &str) -> Vec<MethodChoice>;
    fn default_mountpoint_choices(&self, filesystem: Option<&str>) -> Vec<MountpointChoice>;
    fn current_method(&self, partition: &PartitionEntry) -> Option<String>;
    fn current_mountpoint(&self, partition: &PartitionEntry) -> Option<String>;
    fn format_enabled(&self, partition: &PartitionEntry) -> bool;
}
