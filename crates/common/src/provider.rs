use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Infrastructure provider type tag.
///
/// The well-known cloud types get their own variants; any other non-empty
/// lowercase tag is carried as `Other` so the defaults table can be extended
/// without a code change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderType {
    Mock,
    Ec2,
    Rackspace,
    Digitalocean,
    Vagrant,
    Other(String),
}

impl ProviderType {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderType::Mock => "mock",
            ProviderType::Ec2 => "ec2",
            ProviderType::Rackspace => "rackspace",
            ProviderType::Digitalocean => "digitalocean",
            ProviderType::Vagrant => "vagrant",
            ProviderType::Other(tag) => tag,
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "" => Err("provider type must not be empty".to_string()),
            "mock" => Ok(ProviderType::Mock),
            "ec2" => Ok(ProviderType::Ec2),
            "rackspace" => Ok(ProviderType::Rackspace),
            "digitalocean" => Ok(ProviderType::Digitalocean),
            "vagrant" => Ok(ProviderType::Vagrant),
            _ if tag.chars().any(char::is_whitespace) => {
                Err(format!("invalid provider type: {}", s))
            }
            _ => Ok(ProviderType::Other(tag)),
        }
    }
}

impl TryFrom<String> for ProviderType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProviderType> for String {
    fn from(t: ProviderType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
