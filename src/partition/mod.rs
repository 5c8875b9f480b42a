pub mod auto;
pub mod bar;
pub mod manual;
pub mod tree;

pub use auto::{AutoPartChoice, AutoPartOptions, AutoPartPage, ChoiceLabels};
pub use bar::{BarEvent, Partition, PartitionsBar};
pub use manual::ManualPartPage;
pub use tree::{PartitionTree, RowKind, TreeRow};

/// Human-readable size in the partitioning backend's decimal units
/// (1 MB = 1,000,000 bytes, not 2^20).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::format_size;

    #[test]
    fn sizes_use_decimal_units() {
        assert_eq!(format_size(999), "999 B");
        assert_eq!(format_size(1_000), "1.0 kB");
        assert_eq!(format_size(8_167_670_784), "8.2 GB");
        assert_eq!(format_size(52_000_000_000), "52.0 GB");
    }
}
