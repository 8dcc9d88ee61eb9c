//! Classification of sensor ancestry paths into hardware components.

use crate::sensor::HardwareComponent;

/// Maps a sensor's ancestry path to a hardware-component category.
///
/// The keyword tables are immutable instance data built at construction, so
/// multiple pipeline instances never share mutable state.
pub struct PathClassifier {
    rules: Vec<(HardwareComponent, Vec<&'static str>)>,
}

impl PathClassifier {
    /// Build a classifier with the default keyword tables.
    ///
    /// Rule order is load-bearing: an identifier can satisfy more than one
    /// keyword set ("MSI GeForce RTX" matches both the GPU and motherboard
    /// vendor tables), and the first match wins.
    pub fn new() -> Self {
        let rules = vec![
            (
                HardwareComponent::Gpu,
                vec![
                    "gpu", "nvidia", "geforce", "rtx", "gtx", "quadro", "radeon",
                    "vega", "navi", "arc a",
                ],
            ),
            (
                HardwareComponent::Cpu,
                vec![
                    "cpu", "ryzen", "threadripper", "epyc", "xeon", "core i",
                    "core ultra", "pentium", "celeron", "athlon",
                    // Hypervisors report e.g. "Virtual CPU @ 2.50GHz".
                    "virtual cpu",
                ],
            ),
            (
                HardwareComponent::Memory,
                vec!["memory", "ram", "dimm", "dram"],
            ),
            (
                HardwareComponent::Motherboard,
                vec![
                    "motherboard", "mainboard", "nuvoton", "ite ", "it87", "asus",
                    "asrock", "gigabyte", "msi", "chipset", "lpc",
                ],
            ),
            (
                HardwareComponent::Storage,
                vec![
                    "ssd", "nvme", "hdd", "samsung", "wdc", "western digital",
                    "seagate", "kingston", "crucial", "disk", "drive",
                ],
            ),
            (
                HardwareComponent::Network,
                vec![
                    "network", "ethernet", "wi-fi", "wifi", "wireless", "adapter",
                    "realtek", "killer", "nic",
                ],
            ),
        ];
        Self { rules }
    }

    /// Classify an ancestry path into a hardware component.
    ///
    /// Paths are normalized to lowercase segments. A leading `sensor` marker
    /// (flat backend framing) is skipped together with the machine-name
    /// segment that unconditionally follows it; a leading `computer` marker
    /// is consumed on its own. The first remaining segment is the hardware
    /// identifier.
    pub fn classify(&self, ancestry_path: &[String]) -> HardwareComponent {
        let segments: Vec<String> = ancestry_path
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut idx = 0;
        if segments.first().map(String::as_str) == Some("sensor") {
            // Machine-name segment varies per host; skip it regardless of
            // its content.
            idx = 2;
        } else if segments.first().map(String::as_str) == Some("computer") {
            idx = 1;
        }

        let Some(identifier) = segments.get(idx) else {
            return HardwareComponent::Other;
        };

        for (component, keywords) in &self.rules {
            if keywords.iter().any(|kw| identifier.contains(kw)) {
                return *component;
            }
        }

        HardwareComponent::Other
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new()
    }
}
