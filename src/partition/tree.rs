use crate::backend::{CacheEntry, PartitionEdits, PartitionOps, PartitionEntry, StepGate};

pub const COLUMN_COUNT: usize = 6;

const HEADERS: [&str; COLUMN_COUNT] = ["Device", "Type", "Mount point", "Format?", "Size", "Used"];

/// State of the format checkbox column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Hidden,
    Unchecked,
    Checked,
}

/// What a row *is*, derived from the wrapped backend entry. Column
/// derivation is a pure match over this; the original's conditional
/// key probing (`'id' in partition`, `'method' in partition`, …)
/// lives only in `classify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind<'a> {
    Disk {
        device: &'a str,
    },
    Free {
        size: u64,
        unusable: bool,
    },
    Unformatted {
        path: &'a str,
        detected: Option<&'a str>,
        size: u64,
        used_min: Option<u64>,
    },
    FormatPending {
        path: &'a str,
        acting: Option<&'a str>,
        size: u64,
        used_min: Option<u64>,
    },
    Formatted {
        path: &'a str,
        method: &'a str,
        acting: Option<&'a str>,
        size: u64,
        used_min: Option<u64>,
    },
}

/// One row of the manual-partitioning tree: the backend cache key, the
/// entry as of the last rebuild, and the index of the owning disk's
/// bar in the page's bar arena (used to toggle bar visibility on
/// selection).
#[derive(Debug, Clone)]
pub struct TreeRow {
    pub key: String,
    pub entry: CacheEntry,
    pub bar: Option<usize>,
}

impl TreeRow {
    pub fn partition(&self) -> Option<&PartitionEntry> {
        match &self.entry {
            CacheEntry::Partition(part) => Some(part),
            CacheEntry::Disk(_) => None,
        }
    }

    pub fn kind(&self) -> RowKind<'_> {
        match &self.entry {
            CacheEntry::Disk(disk) => RowKind::Disk {
                device: &disk.device,
            },
            CacheEntry::Partition(part) => classify(part),
        }
    }

    pub fn name_column(&self) -> String {
        match self.kind() {
            RowKind::Disk { device } => device.to_string(),
            RowKind::Free { unusable: true, .. } => "  unusable".to_string(),
            RowKind::Free { .. } => "  free space".to_string(),
            RowKind::Unformatted { path, .. }
            | RowKind::FormatPending { path, .. }
            | RowKind::Formatted { path, .. } => format!("  {path}"),
        }
    }

    pub fn type_column(&self) -> String {
        match self.kind() {
            RowKind::Disk { .. } | RowKind::Free { .. } => String::new(),
            RowKind::Unformatted { detected, .. } => detected.unwrap_or_default().to_string(),
            RowKind::FormatPending { acting, .. } => acting.unwrap_or("format").to_string(),
            RowKind::Formatted { method, acting, .. } => {
                if method == "keep" {
                    acting.unwrap_or(method).to_string()
                } else {
                    method.to_string()
                }
            }
        }
    }

    pub fn mountpoint_column(&self, ops: &dyn PartitionOps) -> String {
        self.partition()
            .and_then(|part| ops.current_mountpoint(part))
            .unwrap_or_default()
    }

    pub fn format_column(&self) -> CheckState {
        match self.kind() {
            RowKind::Disk { .. } => CheckState::Hidden,
            RowKind::FormatPending { .. } => CheckState::Checked,
            _ => CheckState::Unchecked,
        }
    }

    pub fn format_column_enabled(&self, ops: &dyn PartitionOps) -> bool {
        self.partition()
            .is_some_and(|part| ops.format_enabled(part))
    }

    pub fn size_column(&self) -> String {
        match self.kind() {
            RowKind::Disk { .. } => String::new(),
            RowKind::Free { size, .. }
            | RowKind::Unformatted { size, .. }
            | RowKind::FormatPending { size, .. }
            | RowKind::Formatted { size, .. } => format!("{} MB", size / 1_000_000),
        }
    }

    pub fn used_column(&self) -> String {
        match self.kind() {
            RowKind::Disk { .. } | RowKind::Free { .. } => String::new(),
            RowKind::Unformatted { used_min, .. }
            | RowKind::FormatPending { used_min, .. }
            | RowKind::Formatted { used_min, .. } => match used_min {
                Some(min) => format!("{} MB", min / 1_000_000),
                None => "unknown".to_string(),
            },
        }
    }
}

fn classify(part: &PartitionEntry) -> RowKind<'_> {
    if part.id.is_none() {
        // id-less entries behave like whole disks
        return RowKind::Disk {
            device: &part.parted.path,
        };
    }
    if part.parted.fs == "free" {
        return RowKind::Free {
            size: part.parted.size,
            unusable: part.parted.kind == "unusable",
        };
    }
    let acting = if part.filesystem.is_some() {
        part.acting_filesystem.as_deref()
    } else {
        None
    };
    let size = part.parted.size;
    let used_min = part.resize_min_size;
    match part.method.as_deref() {
        None => RowKind::Unformatted {
            path: &part.parted.path,
            detected: part.detected_filesystem.as_deref(),
            size,
            used_min,
        },
        Some("format") => RowKind::FormatPending {
            path: &part.parted.path,
            acting,
            size,
            used_min,
        },
        Some(method) => RowKind::Formatted {
            path: &part.parted.path,
            method,
            acting,
            size,
            used_min,
        },
    }
}

/// Flat read model for the manual-partitioning tree view: a sentinel
/// root holding the column headers, with one row per cache-order
/// entry. The model is a pure projection of the backend cache and is
/// rebuilt (never patched) whenever the cache changes shape; the
/// generation counter is the reset notification, observers re-read
/// when it moves.
#[derive(Debug, Clone, Default)]
pub struct PartitionTree {
    rows: Vec<TreeRow>,
    generation: u64,
}

impl PartitionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> [&'static str; COLUMN_COUNT] {
        HEADERS
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.generation += 1;
    }

    pub fn append(&mut self, key: String, entry: CacheEntry, bar: Option<usize>) {
        self.rows.push(TreeRow { key, entry, bar });
    }

    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&TreeRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The tree's only mutation path: toggle the format checkbox of a
    /// row. Refused silently (no request sent, `false` returned) when
    /// the row has no `id` or `method`, the backend's format predicate
    /// says no, or the step gate is closed.
    pub fn toggle_format(
        &self,
        index: usize,
        ops: &mut dyn PartitionOps,
        gate: &mut dyn StepGate,
    ) -> bool {
        let Some(row) = self.rows.get(index) else {
            return false;
        };
        let Some(part) = row.partition() else {
            return false;
        };
        if part.id.is_none() || part.method.is_none() {
            return false;
        }
        if !ops.format_enabled(part) {
            return false;
        }
        if !gate.allowed_change_step() {
            return false;
        }
        gate.allow_change_step(false);
        let format = part.method.as_deref() != Some("format");
        ops.edit_partition(
            &row.key,
            PartitionEdits {
                format: Some(format),
                ..Default::default()
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{DemoGate, MockBackend};
    use crate::backend::{DeviceCache, DiskEntry, PartedInfo, StepGate};

    fn parted(fs: &str, path: &str, size: u64, kind: &str) -> PartedInfo {
        PartedInfo {
            fs: fs.to_string(),
            path: path.to_string(),
            size,
            kind: kind.to_string(),
        }
    }

    fn partition_entry(fs: &str, path: &str, size: u64) -> PartitionEntry {
        PartitionEntry {
            dev: "=dev=sda".to_string(),
            parted: parted(fs, path, size, "primary"),
            id: Some("32256-8167703039".to_string()),
            method: None,
            filesystem: None,
            acting_filesystem: None,
            detected_filesystem: None,
            can_activate_format: false,
            can_resize: false,
            can_new: false,
            resize_min_size: None,
            resize_max_size: None,
            resize_pref_size: None,
            method_choices: Vec::new(),
            mountpoint_choices: Vec::new(),
            mountpoint: None,
        }
    }

    fn row(entry: PartitionEntry) -> TreeRow {
        TreeRow {
            key: "/var/lib/partman/devices/=dev=sda//32256-8167703039".to_string(),
            entry: CacheEntry::Partition(entry),
            bar: Some(0),
        }
    }

    fn ops() -> MockBackend {
        MockBackend::new(DeviceCache::default())
    }

    #[test]
    fn unformatted_partition_columns() {
        let row = row(partition_entry("ext4", "/dev/sda1", 8_167_670_784));
        let backend = ops();

        assert_eq!(row.name_column(), "  /dev/sda1");
        assert_eq!(row.size_column(), "8167 MB");
        assert_eq!(row.format_column(), CheckState::Unchecked);
        assert!(!row.format_column_enabled(&backend));
        assert_eq!(row.used_column(), "unknown");
        assert_eq!(row.type_column(), "");
        assert_eq!(row.mountpoint_column(&backend), "");
    }

    #[test]
    fn detected_filesystem_shows_as_the_type() {
        let mut entry = partition_entry("ext4", "/dev/sda1", 8_167_670_784);
        entry.detected_filesystem = Some("ext4".to_string());
        entry.resize_min_size = Some(2_758_852_608);
        let row = row(entry);

        assert_eq!(row.type_column(), "ext4");
        assert_eq!(row.used_column(), "2758 MB");
    }

    #[test]
    fn format_pending_shows_the_acting_filesystem() {
        let mut entry = partition_entry("ext4", "/dev/sda1", 8_167_670_784);
        entry.method = Some("format".to_string());
        entry.filesystem = Some("ext4".to_string());
        entry.acting_filesystem = Some("ext4".to_string());
        let row = row(entry);

        assert_eq!(row.type_column(), "ext4");
        assert_eq!(row.format_column(), CheckState::Checked);
    }

    #[test]
    fn kept_partition_without_filesystem_shows_the_method() {
        let mut entry = partition_entry("linux-swap", "/dev/sda5", 419_457_024);
        entry.method = Some("swap".to_string());
        let row = row(entry);

        assert_eq!(row.type_column(), "swap");
        assert_eq!(row.format_column(), CheckState::Unchecked);
    }

    #[test]
    fn free_space_rows() {
        let mut entry = partition_entry("free", "/dev/sdb-1", 5_074_965_504);
        entry.parted.kind = "primary".to_string();
        let row = row(entry);
        assert_eq!(row.name_column(), "  free space");
        assert_eq!(row.size_column(), "5074 MB");
        assert_eq!(row.used_column(), "");
        assert_eq!(row.type_column(), "");

        let mut entry = partition_entry("free", "/dev/sdb-1", 16_384);
        entry.parted.kind = "unusable".to_string();
        assert_eq!(super::classify(&entry), RowKind::Free {
            size: 16_384,
            unusable: true
        });
    }

    #[test]
    fn disk_rows_have_empty_data_columns() {
        let row = TreeRow {
            key: "/var/lib/partman/devices/=dev=sda//".to_string(),
            entry: CacheEntry::Disk(DiskEntry {
                dev: "=dev=sda".to_string(),
                device: "/dev/sda".to_string(),
                label: vec!["msdos".to_string()],
            }),
            bar: Some(0),
        };
        assert_eq!(row.name_column(), "/dev/sda");
        assert_eq!(row.type_column(), "");
        assert_eq!(row.size_column(), "");
        assert_eq!(row.used_column(), "");
        assert_eq!(row.format_column(), CheckState::Hidden);
    }

    #[test]
    fn clear_bumps_the_generation() {
        let mut tree = PartitionTree::new();
        let generation = tree.generation();
        tree.append(
            "key".to_string(),
            CacheEntry::Partition(partition_entry("ext4", "/dev/sda1", 1_000_000)),
            None,
        );
        tree.clear();
        assert!(tree.is_empty());
        assert!(tree.generation() > generation);
    }

    #[test]
    fn format_toggle_refuses_without_method_or_permission() {
        let mut backend = ops();
        let mut gate = DemoGate::new();

        let mut tree = PartitionTree::new();
        tree.append(
            "key".to_string(),
            CacheEntry::Partition(partition_entry("ext4", "/dev/sda1", 1_000_000)),
            None,
        );
        // no method: structurally ineligible
        assert!(!tree.toggle_format(0, &mut backend, &mut gate));

        let mut entry = partition_entry("ext4", "/dev/sda1", 1_000_000);
        entry.method = Some("format".to_string());
        entry.can_activate_format = true;
        let mut tree = PartitionTree::new();
        tree.append("key".to_string(), CacheEntry::Partition(entry), None);

        // closed gate: refused, gate untouched
        gate.allow_change_step(false);
        assert!(!tree.toggle_format(0, &mut backend, &mut gate));

        // open gate: request sent, gate closed while it is outstanding
        gate.allow_change_step(true);
        assert!(tree.toggle_format(0, &mut backend, &mut gate));
        assert!(!gate.allowed_change_step());
    }
}
