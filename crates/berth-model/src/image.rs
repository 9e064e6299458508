use serde::{Deserialize, Serialize};

/// Where a unit's container image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum ImageSource {
    /// Repository in the account's private registry, pinned by tag.
    Private {
        repository: String,
        tag: String,
    },
    /// Fully qualified public image reference (e.g. `"docker.io/library/redis:7"`).
    Public { reference: String },
}

impl ImageSource {
    pub fn private(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        ImageSource::Private {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    pub fn public(reference: impl Into<String>) -> Self {
        ImageSource::Public {
            reference: reference.into(),
        }
    }

    /// Short identifier used in logs: `"private"` or `"public"`.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Private { .. } => "private",
            ImageSource::Public { .. } => "public",
        }
    }

    /// Reference handed to the registry (`repository:tag` for private images).
    pub fn reference(&self) -> String {
        match self {
            ImageSource::Private { repository, tag } => format!("{repository}:{tag}"),
            ImageSource::Public { reference } => reference.clone(),
        }
    }

    /// Tag part of the reference, if one can be read off it.
    pub fn tag(&self) -> Option<&str> {
        match self {
            ImageSource::Private { tag, .. } => Some(tag.as_str()),
            ImageSource::Public { reference } => {
                let name = reference.rsplit('/').next().unwrap_or(reference);
                name.split_once(':').map(|(_, tag)| tag)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_reference_joins_repository_and_tag() {
        let img = ImageSource::private("earnipay/dashboard", "redis-staging-latest");
        assert_eq!(img.reference(), "earnipay/dashboard:redis-staging-latest");
        assert_eq!(img.tag(), Some("redis-staging-latest"));
        assert_eq!(img.kind(), "private");
    }

    #[test]
    fn public_tag_ignores_registry_port() {
        let img = ImageSource::public("registry.local:5000/redis:7");
        assert_eq!(img.tag(), Some("7"));
        assert_eq!(ImageSource::public("registry.local:5000/redis").tag(), None);
    }

    #[test]
    fn tagged_enum_from_toml() {
        let img: ImageSource =
            toml::from_str("source = \"private\"\nrepository = \"app\"\ntag = \"v1\"").unwrap();
        assert_eq!(img, ImageSource::private("app", "v1"));
    }
}
