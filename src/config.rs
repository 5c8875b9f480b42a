use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::backend::mock::standard_method_choices;
use crate::backend::{DeviceCache, DiskEntry, MountpointChoice, PartedInfo, PartitionEntry};
use crate::osprober::OsProberIndex;
use crate::partition::auto::{
    AutoPartOptions, ChoiceLabels, DiskLayouts, LayoutPart, ResizeOption,
};
use crate::partition::format_size;

const DEFAULT_LAYOUT_PATH: &str = "/etc/meridian/installer-layout.toml";

/// Disk layouts for the standalone harness binaries, loaded from TOML.
/// Absent file means the built-in sample layout; this is demo plumbing,
/// the real installer gets its cache from the partitioning backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub release_name: String,
    /// os-prober results keyed by device path.
    pub os_names: HashMap<String, String>,
    pub bitlocker_detected: bool,
    pub disks: Vec<DiskSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiskSpec {
    pub device: String,
    #[serde(default)]
    pub label: Vec<String>,
    #[serde(default)]
    pub partitions: Vec<PartitionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartitionSpec {
    pub id: String,
    pub path: String,
    pub size: u64,
    pub fs: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub detected_filesystem: Option<String>,
    #[serde(default)]
    pub can_resize: bool,
    #[serde(default)]
    pub can_new: bool,
    #[serde(default)]
    pub can_activate_format: bool,
    #[serde(default)]
    pub resize_min_size: Option<u64>,
    #[serde(default)]
    pub resize_max_size: Option<u64>,
    #[serde(default)]
    pub mountpoint: Option<String>,
}

fn default_kind() -> String {
    "primary".to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::sample()
    }
}

impl LayoutConfig {
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(DEFAULT_LAYOUT_PATH)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("layout file not found at {path:?}, using the sample layout");
            return Ok(Self::sample());
        }
        let content = std::fs::read_to_string(path)?;
        let config: LayoutConfig = toml::from_str(&content)?;
        info!("loaded layout from {path:?}");
        Ok(config)
    }

    /// Three-disk sample: a Linux install with swap, an empty disk, and
    /// a Windows disk with trailing free space.
    pub fn sample() -> Self {
        Self {
            release_name: "Meridian".to_string(),
            os_names: HashMap::from([("/dev/sdc1".to_string(), "Windows 10".to_string())]),
            bitlocker_detected: false,
            disks: vec![
                DiskSpec {
                    device: "/dev/sda".to_string(),
                    label: vec!["msdos".to_string()],
                    partitions: vec![
                        PartitionSpec {
                            id: "32256-8167703039".to_string(),
                            path: "/dev/sda1".to_string(),
                            size: 8_167_670_784,
                            fs: "ext4".to_string(),
                            kind: "primary".to_string(),
                            method: None,
                            detected_filesystem: Some("ext4".to_string()),
                            can_resize: true,
                            can_new: false,
                            can_activate_format: false,
                            resize_min_size: Some(2_758_852_608),
                            resize_max_size: Some(8_167_670_784),
                            mountpoint: None,
                        },
                        PartitionSpec {
                            id: "8167735296-8587192319".to_string(),
                            path: "/dev/sda5".to_string(),
                            size: 419_457_024,
                            fs: "linux-swap".to_string(),
                            kind: "logical".to_string(),
                            method: Some("swap".to_string()),
                            detected_filesystem: Some("linux-swap".to_string()),
                            can_resize: false,
                            can_new: false,
                            can_activate_format: true,
                            resize_min_size: None,
                            resize_max_size: None,
                            mountpoint: None,
                        },
                    ],
                },
                DiskSpec {
                    device: "/dev/sdb".to_string(),
                    label: vec!["msdos".to_string()],
                    partitions: vec![
                        PartitionSpec {
                            id: "32256-5074997759".to_string(),
                            path: "/dev/sdb1".to_string(),
                            size: 5_074_965_504,
                            fs: "free".to_string(),
                            kind: "pri/log".to_string(),
                            method: None,
                            detected_filesystem: None,
                            can_resize: false,
                            can_new: true,
                            can_activate_format: false,
                            resize_min_size: None,
                            resize_max_size: None,
                            mountpoint: None,
                        },
                        PartitionSpec {
                            id: "5075030016-5362882559".to_string(),
                            path: "/dev/sdb5".to_string(),
                            size: 287_852_544,
                            fs: "ext3".to_string(),
                            kind: "logical".to_string(),
                            method: None,
                            detected_filesystem: Some("ext3".to_string()),
                            can_resize: false,
                            can_new: false,
                            can_activate_format: false,
                            resize_min_size: None,
                            resize_max_size: None,
                            mountpoint: None,
                        },
                    ],
                },
                DiskSpec {
                    device: "/dev/sdc".to_string(),
                    label: vec!["msdos".to_string()],
                    partitions: vec![
                        PartitionSpec {
                            id: "32256-5074997759".to_string(),
                            path: "/dev/sdc1".to_string(),
                            size: 5_074_965_504,
                            fs: "ntfs".to_string(),
                            kind: "primary".to_string(),
                            method: None,
                            detected_filesystem: Some("ntfs".to_string()),
                            can_resize: true,
                            can_new: false,
                            can_activate_format: false,
                            resize_min_size: Some(2_500_000_000),
                            resize_max_size: Some(4_800_000_000),
                            mountpoint: None,
                        },
                        PartitionSpec {
                            id: "5075030016-5362882559".to_string(),
                            path: "/dev/sdc5".to_string(),
                            size: 287_852_544,
                            fs: "free".to_string(),
                            kind: "pri/log".to_string(),
                            method: None,
                            detected_filesystem: None,
                            can_resize: false,
                            can_new: true,
                            can_activate_format: false,
                            resize_min_size: None,
                            resize_max_size: None,
                            mountpoint: None,
                        },
                    ],
                },
            ],
        }
    }

    pub fn os_prober_index(&self) -> OsProberIndex {
        let mut index = OsProberIndex::new();
        for (device, name) in &self.os_names {
            index.insert(device, name);
        }
        index
    }

    pub fn choice_labels(&self) -> ChoiceLabels {
        let release = &self.release_name;
        ChoiceLabels {
            resize: format!("Install {release} alongside the existing system"),
            use_device: format!("Erase disk and install {release}"),
            lvm: format!("Use LVM with the new {release} installation"),
            crypto: format!("Encrypt the new {release} installation for security"),
            manual: "Something else".to_string(),
        }
    }

    /// The backend's attribute cache for the manual-partitioning page,
    /// with partition keys following their disk's key in on-disk order.
    pub fn to_cache(&self) -> DeviceCache {
        let mut cache = DeviceCache::default();
        for disk in &self.disks {
            let dev = disk.device.replace('/', "=");
            let disk_key = format!("/var/lib/partman/devices/{dev}//");
            cache.order.push(disk_key.clone());
            cache.disks.insert(
                disk_key.clone(),
                DiskEntry {
                    dev: dev.clone(),
                    device: disk.device.clone(),
                    label: disk.label.clone(),
                },
            );
            for part in &disk.partitions {
                let key = format!("{disk_key}{}", part.id);
                cache.order.push(key.clone());
                cache.partitions.insert(key, self.partition_entry(&dev, part));
            }
        }
        cache
    }

    fn partition_entry(&self, dev: &str, part: &PartitionSpec) -> PartitionEntry {
        let known_fs = crate::backend::KNOWN_FILESYSTEMS.contains(&part.fs.as_str());
        let filesystem = part
            .method
            .as_ref()
            .filter(|method| crate::backend::KNOWN_FILESYSTEMS.contains(&method.as_str()))
            .cloned();
        let detected = part.detected_filesystem.clone().or_else(|| {
            (part.fs != "free" && part.fs != "auto").then(|| part.fs.clone())
        });
        PartitionEntry {
            dev: dev.to_string(),
            parted: PartedInfo {
                fs: part.fs.clone(),
                path: part.path.clone(),
                size: part.size,
                kind: part.kind.clone(),
            },
            id: Some(part.id.clone()),
            method: part.method.clone(),
            filesystem: filesystem.clone(),
            acting_filesystem: filesystem,
            detected_filesystem: detected,
            can_activate_format: part.can_activate_format,
            can_resize: part.can_resize,
            can_new: part.can_new,
            resize_min_size: part.resize_min_size,
            resize_max_size: part.resize_max_size,
            resize_pref_size: part.can_resize.then_some(part.size),
            method_choices: standard_method_choices(),
            mountpoint_choices: if known_fs {
                default_mountpoints()
            } else {
                Vec::new()
            },
            mountpoint: part.mountpoint.clone(),
        }
    }

    /// Current layouts for the autopartitioning page, keyed by short
    /// disk name.
    pub fn disk_layouts(&self) -> DiskLayouts {
        let mut layouts = DiskLayouts::new();
        for disk in &self.disks {
            let name = short_name(&disk.device).to_string();
            let parts = disk
                .partitions
                .iter()
                .map(|part| LayoutPart {
                    path: part.path.clone(),
                    size: part.size,
                    fs: part.fs.clone(),
                })
                .collect();
            layouts.insert(name, parts);
        }
        layouts
    }

    /// The whole-disk strategy offerings derived from this layout.
    pub fn auto_options(&self) -> AutoPartOptions {
        let labels = self.choice_labels();
        let use_device_disks = self
            .disks
            .iter()
            .map(|disk| {
                let total: u64 = disk.partitions.iter().map(|part| part.size).sum();
                (
                    format!("{} - {}", disk.device, format_size(total)),
                    disk.device.clone(),
                )
            })
            .collect();

        let mut resize = Vec::new();
        for disk in &self.disks {
            let dev = disk.device.replace('/', "=");
            let disk_key = format!("/var/lib/partman/devices/{dev}//");
            let candidate = disk.partitions.iter().find(|part| {
                part.can_resize && part.resize_min_size.is_some() && part.resize_max_size.is_some()
            });
            if let Some(part) = candidate {
                let min_size = part.resize_min_size.unwrap_or(part.size);
                let max_size = part.resize_max_size.unwrap_or(part.size);
                // leave the preview roughly in the middle of the range
                let pref_size = min_size + (max_size - min_size) / 2;
                resize.push((
                    short_name(&disk.device).to_string(),
                    ResizeOption {
                        option_id: format!("{disk_key}{}", part.id),
                        min_size,
                        max_size,
                        pref_size,
                        path: part.path.clone(),
                    },
                ));
            }
        }

        AutoPartOptions {
            resize,
            use_device_label: labels.use_device,
            use_device_disks,
            bitlocker: self.bitlocker_detected,
        }
    }
}

fn short_name(device: &str) -> &str {
    device.rsplit('/').next().unwrap_or(device)
}

fn default_mountpoints() -> Vec<MountpointChoice> {
    ["/", "/boot", "/home", "/tmp", "/usr", "/var", "/srv", "/opt"]
        .iter()
        .map(|mountpoint| MountpointChoice {
            mountpoint: mountpoint.to_string(),
            code: mountpoint.trim_start_matches('/').to_string(),
            description: mountpoint.to_string(),
        })
        .collect()
}
