//! Resource limits command.

use crate::LimitsArgs;
use anyhow::Result;
use imkit_io::limits::{format_bytes, system_memory};
use imkit_io::{ResourceLimits, ResourcePolicy};

/// Prints every limit in effect after initialization and CLI overrides.
pub fn run(args: LimitsArgs, verbose: bool) -> Result<()> {
    let snapshot = ResourceLimits::global().snapshot();

    if args.yaml {
        let policy = snapshot
            .entries()
            .filter(|(_, value)| *value != u64::MAX)
            .fold(ResourcePolicy::default(), |policy, (resource, value)| {
                policy.with(resource, value)
            });
        print!("{}", serde_yaml::to_string(&policy)?);
        return Ok(());
    }

    for (resource, value) in snapshot.entries() {
        let shown = if value == u64::MAX {
            "unlimited".to_string()
        } else if resource.is_bytes() {
            format_bytes(value)
        } else {
            value.to_string()
        };
        println!("{:<20} {}", resource.name(), shown);
    }
    if verbose {
        println!("{:<20} {}", "(system memory)", format_bytes(system_memory()));
    }
    Ok(())
}
