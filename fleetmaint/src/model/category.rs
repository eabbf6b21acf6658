//! Job category classification.
//!
//! The fleet controller describes each tenant job with a raw job-type
//! string. [`JobCategory`] closes that open set into a tagged enum so
//! category checks are exhaustive at compile time, with derived
//! predicates as pure functions over the tag.
//!
//! The enum declaration order doubles as the throttling priority order:
//! when admission slots are tight, jobs in earlier categories are
//! admitted first.

/// Closed classification of controller job kinds.
///
/// `Unknown` captures any job-type string the coordinator does not
/// recognize; unknown jobs are never admitted (their concurrency cap is
/// pinned to zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobCategory {
    /// Unrecognized job-type string from the controller.
    Unknown,
    /// Platform-initiated repair work (reboots, reimaging).
    PlatformMaintenance,
    /// Platform software update.
    PlatformUpdate,
    /// Tenant-initiated repair work.
    TenantMaintenance,
    /// Tenant software update.
    TenantUpdate,
}

impl JobCategory {
    /// All categories in throttling priority order.
    pub const ALL: [JobCategory; 5] = [
        JobCategory::Unknown,
        JobCategory::PlatformMaintenance,
        JobCategory::PlatformUpdate,
        JobCategory::TenantMaintenance,
        JobCategory::TenantUpdate,
    ];

    /// Derives the category from the controller's raw job-type string.
    ///
    /// Matching is case-insensitive. Anything unrecognized maps to
    /// [`JobCategory::Unknown`].
    pub fn from_job_type(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "platformmaintenance" => JobCategory::PlatformMaintenance,
            "platformupdate" => JobCategory::PlatformUpdate,
            "tenantmaintenance" => JobCategory::TenantMaintenance,
            "tenantupdate" => JobCategory::TenantUpdate,
            _ => JobCategory::Unknown,
        }
    }

    /// Returns true for software-update job kinds.
    pub fn is_update_job_type(self) -> bool {
        matches!(self, JobCategory::PlatformUpdate | JobCategory::TenantUpdate)
    }

    /// Returns true for repair/maintenance job kinds.
    pub fn is_repair_job_type(self) -> bool {
        matches!(
            self,
            JobCategory::PlatformMaintenance | JobCategory::TenantMaintenance
        )
    }

    /// Returns true for tenant software updates.
    pub fn is_tenant_update_job_type(self) -> bool {
        matches!(self, JobCategory::TenantUpdate)
    }

    /// Returns true for platform software updates.
    pub fn is_platform_update_job_type(self) -> bool {
        matches!(self, JobCategory::PlatformUpdate)
    }

    /// Name used when building per-category configuration keys.
    pub fn config_name(self) -> &'static str {
        match self {
            JobCategory::Unknown => "Unknown",
            JobCategory::PlatformMaintenance => "PlatformMaintenance",
            JobCategory::PlatformUpdate => "PlatformUpdate",
            JobCategory::TenantMaintenance => "TenantMaintenance",
            JobCategory::TenantUpdate => "TenantUpdate",
        }
    }

    /// Position in [`JobCategory::ALL`], used to index per-category
    /// counter arrays.
    pub(crate) fn index(self) -> usize {
        match self {
            JobCategory::Unknown => 0,
            JobCategory::PlatformMaintenance => 1,
            JobCategory::PlatformUpdate => 2,
            JobCategory::TenantMaintenance => 3,
            JobCategory::TenantUpdate => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_job_type_known_values() {
        assert_eq!(
            JobCategory::from_job_type("PlatformMaintenance"),
            JobCategory::PlatformMaintenance
        );
        assert_eq!(
            JobCategory::from_job_type("tenantupdate"),
            JobCategory::TenantUpdate
        );
    }

    #[test]
    fn test_from_job_type_unknown_value() {
        assert_eq!(JobCategory::from_job_type("Defrag"), JobCategory::Unknown);
        assert_eq!(JobCategory::from_job_type(""), JobCategory::Unknown);
    }

    #[test]
    fn test_update_predicates() {
        assert!(JobCategory::PlatformUpdate.is_update_job_type());
        assert!(JobCategory::TenantUpdate.is_update_job_type());
        assert!(!JobCategory::PlatformMaintenance.is_update_job_type());
        assert!(JobCategory::TenantUpdate.is_tenant_update_job_type());
        assert!(!JobCategory::PlatformUpdate.is_tenant_update_job_type());
        assert!(JobCategory::PlatformUpdate.is_platform_update_job_type());
    }

    #[test]
    fn test_repair_predicate() {
        assert!(JobCategory::PlatformMaintenance.is_repair_job_type());
        assert!(JobCategory::TenantMaintenance.is_repair_job_type());
        assert!(!JobCategory::TenantUpdate.is_repair_job_type());
        assert!(!JobCategory::Unknown.is_repair_job_type());
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, category) in JobCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn test_ordering_follows_declaration() {
        assert!(JobCategory::PlatformMaintenance < JobCategory::TenantUpdate);
        assert!(JobCategory::Unknown < JobCategory::PlatformMaintenance);
    }
}
