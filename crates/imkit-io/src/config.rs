//! Policy configuration.
//!
//! A policy is a small YAML document, normally `policy.yaml` inside the
//! configure directory:
//!
//! ```yaml
//! resources:
//!   memory_percent: 50
//!   width: 16000
//!   height: 16000
//!   list_length: 512
//! disabled_formats:
//!   - PS
//!   - EPS
//!   - PDF
//! ```
//!
//! Every resource key is optional. `memory_percent` is applied before the
//! explicit values, so an explicit `area` or `memory` wins over the share
//! computed from it.

use std::env;
use std::path::Path;

use imkit_core::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::limits::ResourceType;
use crate::{IoError, IoResult};

/// File name looked up inside a configure directory.
pub const POLICY_FILE: &str = "policy.yaml";

/// Environment variable holding a share of system memory, in percent.
pub const MEMORY_PERCENT_VAR: &str = "IMKIT_MEMORY_PERCENT";

/// Optional value for each resource limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcePolicy {
    /// Share of system memory, in percent. Also sets area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
    /// Area limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<u64>,
    /// Disk limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
    /// Height limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    /// Width limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    /// List length limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_length: Option<u64>,
    /// Max memory request limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory_request: Option<u64>,
    /// Memory limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Thread limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<u64>,
    /// Throttle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<u64>,
    /// Time limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

impl ResourcePolicy {
    fn slot_mut(&mut self, resource: ResourceType) -> &mut Option<u64> {
        match resource {
            ResourceType::Area => &mut self.area,
            ResourceType::Disk => &mut self.disk,
            ResourceType::Height => &mut self.height,
            ResourceType::Width => &mut self.width,
            ResourceType::ListLength => &mut self.list_length,
            ResourceType::MaxMemoryRequest => &mut self.max_memory_request,
            ResourceType::Memory => &mut self.memory,
            ResourceType::Thread => &mut self.thread,
            ResourceType::Throttle => &mut self.throttle,
            ResourceType::Time => &mut self.time,
        }
    }

    /// Sets one explicit value.
    pub fn with(mut self, resource: ResourceType, value: u64) -> Self {
        *self.slot_mut(resource) = Some(value);
        self
    }

    /// Sets the memory share.
    pub fn with_memory_percent(mut self, percent: f64) -> Self {
        self.memory_percent = Some(percent);
        self
    }

    /// Explicit value for `resource`, if any.
    pub fn get(&self, resource: ResourceType) -> Option<u64> {
        match resource {
            ResourceType::Area => self.area,
            ResourceType::Disk => self.disk,
            ResourceType::Height => self.height,
            ResourceType::Width => self.width,
            ResourceType::ListLength => self.list_length,
            ResourceType::MaxMemoryRequest => self.max_memory_request,
            ResourceType::Memory => self.memory,
            ResourceType::Thread => self.thread,
            ResourceType::Throttle => self.throttle,
            ResourceType::Time => self.time,
        }
    }

    /// Explicit values in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (ResourceType, u64)> + '_ {
        ResourceType::ALL
            .into_iter()
            .filter_map(|r| self.get(r).map(|v| (r, v)))
    }

    /// Whether nothing is set.
    pub fn is_empty(&self) -> bool {
        self.memory_percent.is_none() && self.entries().next().is_none()
    }

    /// Reads `IMKIT_*_LIMIT` and `IMKIT_MEMORY_PERCENT` from the process
    /// environment.
    pub fn from_env() -> IoResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads overrides through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup<F>(lookup: F) -> IoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();

        for resource in ResourceType::ALL {
            let var = resource.env_var();
            if let Some(raw) = lookup(var) {
                let value = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| IoError::invalid_argument(var, format!("'{raw}': {e}")))?;
                policy = policy.with(resource, value);
            }
        }

        if let Some(raw) = lookup(MEMORY_PERCENT_VAR) {
            let percent = raw
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .map_err(|e| IoError::invalid_argument(MEMORY_PERCENT_VAR, format!("'{raw}': {e}")))?;
            policy.memory_percent = Some(percent);
        }

        Ok(policy)
    }
}

/// Process configuration loaded from `policy.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    /// Resource limits to apply.
    pub resources: ResourcePolicy,
    /// Formats removed from the global registry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled_formats: Vec<String>,
}

impl Policy {
    /// Loads a policy file.
    pub fn from_file(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IoError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parses a policy document.
    pub fn from_yaml_str(yaml: &str) -> IoResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let policy: Policy = serde_yaml::from_str(yaml)?;
        policy.disabled()?;
        Ok(policy)
    }

    /// Serializes the policy.
    pub fn to_yaml(&self) -> IoResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Writes the policy to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> IoResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Replaces the resource section.
    pub fn with_resources(mut self, resources: ResourcePolicy) -> Self {
        self.resources = resources;
        self
    }

    /// Adds a disabled format.
    pub fn disable(mut self, format: ImageFormat) -> Self {
        self.disabled_formats.push(format.name().to_string());
        self
    }

    /// Disabled formats as identifiers.
    pub fn disabled(&self) -> IoResult<Vec<ImageFormat>> {
        self.disabled_formats
            .iter()
            .map(|name| name.parse::<ImageFormat>().map_err(IoError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
resources:
  memory_percent: 50
  width: 16000
  list_length: 512
disabled_formats:
  - PS
  - eps
"#;

    #[test]
    fn test_parse_sample() {
        let policy = Policy::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(policy.resources.memory_percent, Some(50.0));
        assert_eq!(policy.resources.get(ResourceType::Width), Some(16000));
        assert_eq!(policy.resources.get(ResourceType::Height), None);
        assert_eq!(
            policy.disabled().unwrap(),
            vec![ImageFormat::Ps, ImageFormat::Eps]
        );

        let entries: Vec<_> = policy.resources.entries().collect();
        assert_eq!(
            entries,
            vec![(ResourceType::Width, 16000), (ResourceType::ListLength, 512)]
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let policy = Policy::default()
            .disable(ImageFormat::Pdf)
            .with_resources(ResourcePolicy::default().with(ResourceType::Time, 30).with_memory_percent(25.0));
        let yaml = policy.to_yaml().unwrap();
        assert_eq!(Policy::from_yaml_str(&yaml).unwrap(), policy);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(Policy::from_yaml_str("").unwrap(), Policy::default());
        assert!(Policy::from_yaml_str("resources: {}\n").unwrap().resources.is_empty());
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(
            Policy::from_yaml_str("resources:\n  bogus: 1\n"),
            Err(IoError::Yaml(_))
        ));
        assert!(Policy::from_yaml_str("resources:\n  width: -1\n").is_err());
        assert!(Policy::from_yaml_str("disabled_formats: [NOPE]\n").is_err());
        assert!(matches!(
            Policy::from_yaml_str("unknown_key: 1\n"),
            Err(IoError::Yaml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Policy::from_file("/nonexistent/imkit/policy.yaml").unwrap_err();
        assert!(matches!(err, IoError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("IMKIT_WIDTH_LIMIT", "8000"),
            ("IMKIT_LIST_LENGTH_LIMIT", " 16 "),
            ("IMKIT_MEMORY_PERCENT", "40%"),
        ]
        .into_iter()
        .collect();
        let policy = ResourcePolicy::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(policy.get(ResourceType::Width), Some(8000));
        assert_eq!(policy.get(ResourceType::ListLength), Some(16));
        assert_eq!(policy.memory_percent, Some(40.0));

        let err = ResourcePolicy::from_lookup(|k| (k == "IMKIT_TIME_LIMIT").then(|| "soon".into()))
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidArgument { name: "IMKIT_TIME_LIMIT", .. }));
    }
}
