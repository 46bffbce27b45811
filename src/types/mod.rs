// ABOUTME: Type-safe resource names and validated domain types.
// ABOUTME: Uses phantom types to prevent name confusion at compile time.

mod bundle_ref;
mod cname_prefix;
mod environment_name;
mod id;

pub use bundle_ref::{BundleRef, ParseBundleRefError};
pub use cname_prefix::{CnamePrefix, CnamePrefixError};
pub use environment_name::{EnvironmentName, EnvironmentNameError, MAX_LOGICAL_LEN};
pub use id::{ApplicationName, Id, PhysicalName, VersionLabel};
