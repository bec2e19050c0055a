//! Provider-type default parameters

use anyhow::{Context, Result as AnyResult};
use flavor_common::{Error, ParamValue, Params, ProviderType, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Immutable table of default params per provider type
#[derive(Debug, Clone, Default)]
pub struct ProviderDefaults {
    table: HashMap<ProviderType, Params>,
}

impl ProviderDefaults {
    /// Empty table; every provider type is unsupported until added
    pub fn empty() -> Self {
        Self::default()
    }

    /// Defaults for the provider types shipped with the registry
    pub fn builtin() -> Self {
        Self::empty()
            .with(
                ProviderType::Mock,
                [
                    ("region", "us-east-1"),
                    ("zone", "any"),
                    ("size", "m1.medium"),
                    ("image", "ami-mock"),
                ],
            )
            .with(
                ProviderType::Ec2,
                [
                    ("region", "us-east-1"),
                    ("zone", "any"),
                    ("size", "m1.medium"),
                    ("image", "ami-a30b63ca"),
                ],
            )
            .with(
                ProviderType::Rackspace,
                [
                    ("region", "dfw"),
                    ("zone", "any"),
                    ("size", "4GB Standard Instance"),
                    ("image", "Ubuntu 12.04 LTS"),
                ],
            )
            .with(
                ProviderType::Digitalocean,
                [
                    ("region", "nyc1"),
                    ("zone", "any"),
                    ("size", "4GB"),
                    ("image", "Ubuntu 12.04 x64"),
                ],
            )
            .with(
                ProviderType::Vagrant,
                [
                    ("region", "local"),
                    ("zone", "any"),
                    ("size", "512"),
                    ("image", "deis-node"),
                ],
            )
    }

    /// Add or replace the defaults for one provider type
    pub fn with<K, V>(
        mut self,
        provider_type: ProviderType,
        defaults: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let params = defaults
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.table.insert(provider_type, params);
        self
    }

    /// Parse a defaults table from JSON: `{"<type>": {"<key>": <scalar>}}`
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(types) = value else {
            return Err(Error::Validation(
                "defaults must be an object keyed by provider type".to_string(),
            ));
        };

        let mut table = HashMap::new();
        for (tag, params) in types {
            let provider_type: ProviderType = tag.parse().map_err(Error::Validation)?;
            let params = flavor_common::params_from_json(params)?;
            table.insert(provider_type, params);
        }

        Ok(Self { table })
    }

    /// Load a defaults file
    pub fn from_json_file(path: &Path) -> AnyResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read defaults file: {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Invalid defaults file: {}", path.display()))
    }

    /// Overlay `other` on top of this table; its entries win per provider type
    pub fn merged_with(mut self, other: ProviderDefaults) -> Self {
        self.table.extend(other.table);
        self
    }

    pub fn get(&self, provider_type: &ProviderType) -> Option<&Params> {
        self.table.get(provider_type)
    }

    /// Fill every default key the caller left out.
    ///
    /// Fails with a validation error when the provider type has no entry.
    pub fn resolve(&self, provider_type: &ProviderType, supplied: Params) -> Result<Params> {
        let defaults = self.get(provider_type).ok_or_else(|| {
            Error::Validation(format!(
                "no default params for provider type: {}",
                provider_type
            ))
        })?;

        let mut resolved = defaults.clone();
        flavor_common::merge_params(&mut resolved, supplied);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        flavor_common::params_from_json(value).unwrap()
    }

    #[test]
    fn test_mock_defaults_fill_empty_params() {
        let defaults = ProviderDefaults::builtin();
        let resolved = defaults.resolve(&ProviderType::Mock, Params::new()).unwrap();

        assert_eq!(resolved["region"].as_str(), Some("us-east-1"));
        assert_eq!(resolved["zone"].as_str(), Some("any"));
        assert_eq!(resolved["size"].as_str(), Some("m1.medium"));
        assert!(!resolved["image"].to_string().is_empty());
    }

    #[test]
    fn test_supplied_params_take_precedence() {
        let defaults = ProviderDefaults::builtin();
        let resolved = defaults
            .resolve(
                &ProviderType::Mock,
                params(json!({"region": "us-west-2", "size": "t1.micro", "spot": true})),
            )
            .unwrap();

        assert_eq!(resolved["region"].as_str(), Some("us-west-2"));
        assert_eq!(resolved["zone"].as_str(), Some("any"));
        assert_eq!(resolved["size"].as_str(), Some("t1.micro"));
        assert_eq!(resolved["image"].as_str(), Some("ami-mock"));
        assert_eq!(resolved["spot"], ParamValue::Bool(true));
    }

    #[test]
    fn test_unknown_provider_type_is_rejected() {
        let defaults = ProviderDefaults::builtin();
        let err = defaults
            .resolve(&ProviderType::Other("openstack".to_string()), Params::new())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_from_json_overrides_builtin() {
        let file = ProviderDefaults::from_json_str(
            r#"{"ec2": {"region": "eu-west-1", "zone": "any", "size": "m3.large", "image": "ami-1"},
                "openstack": {"region": "RegionOne", "size": 2}}"#,
        )
        .unwrap();
        let defaults = ProviderDefaults::builtin().merged_with(file);

        let ec2 = defaults.get(&ProviderType::Ec2).unwrap();
        assert_eq!(ec2["region"].as_str(), Some("eu-west-1"));

        let openstack = defaults
            .get(&ProviderType::Other("openstack".to_string()))
            .unwrap();
        assert_eq!(openstack["size"], ParamValue::Integer(2));

        // Untouched built-ins survive
        assert!(defaults.get(&ProviderType::Mock).is_some());
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        assert!(ProviderDefaults::from_json_str("[]").is_err());
        assert!(ProviderDefaults::from_json_str(r#"{"ec2": {"tags": []}}"#).is_err());
        assert!(ProviderDefaults::from_json_str(r#"{"": {}}"#).is_err());
    }
}
