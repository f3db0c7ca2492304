//! Disk component with fixed SSD/HDD latency profiles.

use tracing::warn;

use crate::interpreter::value::ParamBundle;
use crate::outcome::{AccessResult, Duration, Outcomes};
use crate::runtime::error::ComponentResult;
use crate::runtime::registry::{NativeComponent, TypedComponent};

/// Registered type name.
pub const DISK: &str = "Disk";

/// Latency profile of a disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskProfile {
    /// Solid state drive
    Ssd,
    /// Spinning disk
    Hdd,
}

impl DiskProfile {
    /// Resolve a profile name. Unknown names fall back to SSD.
    pub fn from_name(name: &str) -> Self {
        match name {
            "HDD" => DiskProfile::Hdd,
            "SSD" => DiskProfile::Ssd,
            other => {
                warn!(profile = other, "unknown disk profile, using SSD");
                DiskProfile::Ssd
            }
        }
    }

    /// Canonical profile name.
    pub fn name(self) -> &'static str {
        match self {
            DiskProfile::Ssd => "SSD",
            DiskProfile::Hdd => "HDD",
        }
    }

    fn read_outcomes(self) -> Outcomes<AccessResult> {
        match self {
            DiskProfile::Ssd => Outcomes::new()
                .add(0.95, AccessResult::new(true, Duration::micros(100.0)))
                .add(0.04, AccessResult::new(true, Duration::micros(500.0)))
                .add(0.008, AccessResult::new(true, Duration::millis(2.0)))
                .add(0.001, AccessResult::new(false, Duration::millis(1.0)))
                .add(0.001, AccessResult::new(false, Duration::millis(5.0))),
            DiskProfile::Hdd => Outcomes::new()
                .add(0.85, AccessResult::new(true, Duration::millis(5.0)))
                .add(0.10, AccessResult::new(true, Duration::millis(15.0)))
                .add(0.04, AccessResult::new(true, Duration::millis(100.0)))
                .add(0.005, AccessResult::new(false, Duration::millis(10.0)))
                .add(0.005, AccessResult::new(false, Duration::millis(50.0))),
        }
    }

    fn write_outcomes(self) -> Outcomes<AccessResult> {
        match self {
            DiskProfile::Ssd => Outcomes::new()
                .add(0.96, AccessResult::new(true, Duration::micros(150.0)))
                .add(0.03, AccessResult::new(true, Duration::micros(800.0)))
                .add(0.008, AccessResult::new(true, Duration::millis(5.0)))
                .add(0.001, AccessResult::new(false, Duration::millis(1.0)))
                .add(0.001, AccessResult::new(false, Duration::millis(10.0))),
            DiskProfile::Hdd => Outcomes::new()
                .add(0.88, AccessResult::new(true, Duration::millis(8.0)))
                .add(0.08, AccessResult::new(true, Duration::millis(25.0)))
                .add(0.03, AccessResult::new(true, Duration::millis(150.0)))
                .add(0.005, AccessResult::new(false, Duration::millis(10.0)))
                .add(0.005, AccessResult::new(false, Duration::millis(50.0))),
        }
    }
}

/// A block device.
#[derive(Debug, Clone, PartialEq)]
pub struct Disk {
    profile: DiskProfile,
    read: Outcomes<AccessResult>,
    write: Outcomes<AccessResult>,
}

impl Disk {
    /// Disk with the named profile.
    pub fn new(profile_name: &str) -> Self {
        let profile = DiskProfile::from_name(profile_name);
        Self {
            profile,
            read: profile.read_outcomes(),
            write: profile.write_outcomes(),
        }
    }

    /// Build from constructor parameters (`ProfileName`, default `"SSD"`).
    pub fn from_params(params: &ParamBundle) -> ComponentResult<Self> {
        let profile = params.string("ProfileName")?;
        Ok(Self::new(profile.as_deref().unwrap_or("SSD")))
    }

    /// Active profile.
    pub fn profile(&self) -> DiskProfile {
        self.profile
    }

    /// Outcomes of a single read.
    pub fn read(&self) -> Outcomes<AccessResult> {
        self.read.clone()
    }

    /// Outcomes of a single write.
    pub fn write(&self) -> Outcomes<AccessResult> {
        self.write.clone()
    }

    /// A read followed by a write, with `processing` added to every
    /// successful combination.
    pub fn read_process_write(&self, processing: Duration) -> Outcomes<AccessResult> {
        self.read
            .and_then(&self.write, |read, write| read.and(*write))
            .map(|combined| {
                if combined.success {
                    AccessResult::new(true, combined.latency + processing)
                } else {
                    *combined
                }
            })
    }
}

impl Default for Disk {
    fn default() -> Self {
        Self::new("SSD")
    }
}

impl NativeComponent for Disk {}

/// Descriptor with the disk's dispatch table.
pub fn descriptor() -> TypedComponent<Disk> {
    TypedComponent::new(DISK, Disk::from_params)
        .params(&["ProfileName"])
        .method0("Read", |disk: &Disk| Ok(disk.read()))
        .method0("Write", |disk: &Disk| Ok(disk.write()))
        .method1("ReadProcessWrite", |disk: &Disk, processing: Duration| {
            Ok(disk.read_process_write(processing))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ast::Literal;

    #[test]
    fn unknown_profile_defaults_to_ssd() {
        assert_eq!(Disk::new("Floppy").profile(), DiskProfile::Ssd);
        assert_eq!(Disk::new("HDD").profile(), DiskProfile::Hdd);
        assert_eq!(Disk::new("Floppy"), Disk::default());
    }

    #[test]
    fn profile_weights_sum_to_one() {
        for profile in [DiskProfile::Ssd, DiskProfile::Hdd] {
            assert!((profile.read_outcomes().total_weight() - 1.0).abs() < 1e-9);
            assert!((profile.write_outcomes().total_weight() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn from_params_reads_profile_name() {
        let params = ParamBundle::new().with("ProfileName", Literal::String("HDD".into()));
        let disk = Disk::from_params(&params).unwrap();
        assert_eq!(disk.profile().name(), "HDD");
        assert_eq!(disk.read().buckets[0].value.latency, Duration::millis(5.0));
    }

    #[test]
    fn read_process_write_adds_processing_to_successes() {
        let disk = Disk::default();
        let combined = disk.read_process_write(Duration::millis(1.0));
        assert_eq!(combined.len(), 25);
        let first = &combined.buckets[0].value;
        assert!(first.success);
        let expected = 0.0001 + 0.00015 + 0.001;
        assert!((first.latency.as_secs() - expected).abs() < 1e-12);

        let failed = combined.iter().find(|b| !b.value.success).unwrap();
        assert!(failed.value.latency.as_secs() < 0.02);
    }
}
