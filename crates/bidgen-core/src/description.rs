//! Bidder description model
//!
//! A bidder description declares everything needed to scaffold an
//! OpenRTB bidder adapter: endpoint, sync settings, the bidder's
//! impression extension parameters and the field-level transformations
//! applied to outgoing requests.
//!
//! # Example
//!
//! ```yaml
//! bidderName: foo
//! properties:
//!   endpointUrl: "https://foo.example.com/openrtb2"
//! bidderParams:
//!   - name: placementId
//!     type: String
//! transformations:
//!   - target: imp.banner.w
//!     staticValue: 640
//!   - target: imp.tagid
//!     from: impExt.placementId
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};

/// A complete bidder description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidderDescription {
    /// Bidder name (lowercase, used for packages and class names)
    pub bidder_name: String,

    /// How the adapter splits outgoing requests
    #[serde(default)]
    pub strategy: RequestStrategy,

    /// Endpoint configuration
    pub properties: EndpointProperties,

    /// Bidder metadata
    #[serde(default)]
    pub meta_info: MetaInfo,

    /// User sync settings
    #[serde(default)]
    pub usersyncer: Usersyncer,

    /// Fields of the bidder's `imp[].ext.bidder` object
    #[serde(default)]
    pub bidder_params: Vec<BidderParam>,

    /// Field-level request transformations
    #[serde(default)]
    pub transformations: Vec<RawTransformation>,
}

/// Request creation strategy of the generated adapter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStrategy {
    /// All impressions in one outgoing request
    #[default]
    SingleRequest,
    /// One outgoing request per impression
    RequestPerImp,
}

impl RequestStrategy {
    /// Java enum constant name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleRequest => "SINGLE_REQUEST",
            Self::RequestPerImp => "REQUEST_PER_IMP",
        }
    }
}

/// Endpoint properties
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointProperties {
    /// Bidder endpoint URL
    pub endpoint_url: String,

    /// User sync URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usersyncer_url: Option<String>,
}

/// Bidder metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    /// Maintainer contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintainer_email: Option<String>,

    /// Media types supported for app traffic
    #[serde(default)]
    pub app_media_types: Vec<String>,

    /// Media types supported for site traffic
    #[serde(default)]
    pub site_media_types: Vec<String>,

    /// GDPR vendor id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<u32>,
}

/// User sync settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Usersyncer {
    /// Cookie family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_family_name: Option<String>,

    /// Extra sync URL parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_params: Option<String>,
}

/// One field of the bidder's impression extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidderParam {
    /// Field name
    pub name: String,

    /// Declared Java type
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// Declared type of a bidder param
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    /// `java.lang.String`
    String,
    /// `java.lang.Integer`
    Integer,
    /// `java.lang.Long`
    Long,
    /// `java.lang.Double`
    Double,
    /// `java.lang.Float`
    Float,
    /// `java.lang.Boolean`
    Boolean,
}

impl ParamType {
    /// Simple Java class name
    pub fn java_type(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
        }
    }

    /// Whether sample values of this type consume a number from the fixture counter
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::String | Self::Boolean)
    }
}

/// A transformation exactly as written in the description
///
/// `staticValue: null` is kept as `Some(Value::Null)` so that an explicit
/// null can be told apart from an absent value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransformation {
    /// Dotted target path
    pub target: String,

    /// Literal value to write
    #[serde(
        default,
        deserialize_with = "explicit_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub static_value: Option<serde_json::Value>,

    /// Dotted source path to copy from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl RawTransformation {
    /// Transformation writing a literal
    pub fn with_static(target: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            target: target.into(),
            static_value: Some(value),
            from: None,
        }
    }

    /// Transformation copying another field
    pub fn with_from(target: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            static_value: None,
            from: Some(from.into()),
        }
    }
}

fn explicit_value<'de, D>(deserializer: D) -> std::result::Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl BidderDescription {
    /// Load a description from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let parsed = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        };

        parsed.map_err(|e| match e {
            Error::ConfigParse(inner) => Error::DescriptionParse {
                path: path.display().to_string(),
                message: inner.to_string(),
            },
            Error::Json(inner) => Error::DescriptionParse {
                path: path.display().to_string(),
                message: inner.to_string(),
            },
            other => other,
        })
    }

    /// Parse and validate a YAML description
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let description: Self = serde_yaml::from_str(yaml)?;
        description.validate()?;
        Ok(description)
    }

    /// Parse and validate a JSON description
    pub fn from_json_str(json: &str) -> Result<Self> {
        let description: Self = serde_json::from_str(json)?;
        description.validate()?;
        Ok(description)
    }

    /// Check structural constraints not expressible in serde
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Error::InvalidDescription {
            bidder: self.bidder_name.clone(),
            message,
        };

        if self.bidder_name.is_empty() {
            return Err(invalid("bidderName must not be empty".to_string()));
        }
        if !self.bidder_name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid(format!(
                "bidderName '{}' must be alphanumeric",
                self.bidder_name
            )));
        }
        if self.properties.endpoint_url.trim().is_empty() {
            return Err(invalid("properties.endpointUrl must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for param in &self.bidder_params {
            if !seen.insert(param.name.as_str()) {
                return Err(invalid(format!("duplicate bidder param '{}'", param.name)));
            }
        }

        Ok(())
    }

    /// Look up a bidder param by name
    pub fn param(&self, name: &str) -> Option<&BidderParam> {
        self.bidder_params.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YAML: &str = r#"
bidderName: foo
properties:
  endpointUrl: "https://foo.example.com/rtb"
bidderParams:
  - name: placementId
    type: String
  - name: siteId
    type: Integer
transformations:
  - target: imp.banner.w
    staticValue: 640
  - target: imp.tagid
    from: impExt.placementId
  - target: imp.bidfloor
    staticValue: null
"#;

    #[test]
    fn test_parse_yaml_description() {
        let description = BidderDescription::from_yaml_str(YAML).unwrap();
        assert_eq!(description.bidder_name, "foo");
        assert_eq!(description.strategy, RequestStrategy::SingleRequest);
        assert_eq!(description.bidder_params.len(), 2);
        assert_eq!(description.bidder_params[1].param_type, ParamType::Integer);
        assert_eq!(description.transformations.len(), 3);
    }

    #[test]
    fn test_explicit_null_is_kept() {
        let description = BidderDescription::from_yaml_str(YAML).unwrap();
        assert_eq!(
            description.transformations[2].static_value,
            Some(serde_json::Value::Null)
        );
        assert_eq!(description.transformations[1].static_value, None);
        assert_eq!(
            description.transformations[1].from.as_deref(),
            Some("impExt.placementId")
        );
    }

    #[test]
    fn test_parse_json_description() {
        let json = json!({
            "bidderName": "bar",
            "strategy": "REQUEST_PER_IMP",
            "properties": {"endpointUrl": "https://bar.example.com"},
            "transformations": [{"target": "site.page", "staticValue": "x"}]
        })
        .to_string();

        let description = BidderDescription::from_json_str(&json).unwrap();
        assert_eq!(description.strategy, RequestStrategy::RequestPerImp);
        assert_eq!(description.strategy.as_str(), "REQUEST_PER_IMP");
        assert_eq!(
            description.transformations[0],
            RawTransformation::with_static("site.page", json!("x"))
        );
    }

    #[test]
    fn test_rejects_empty_bidder_name() {
        let yaml = r#"
bidderName: ""
properties:
  endpointUrl: "https://x"
"#;
        let err = BidderDescription::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_rejects_non_alphanumeric_bidder_name() {
        let yaml = r#"
bidderName: "foo-bar"
properties:
  endpointUrl: "https://x"
"#;
        assert!(BidderDescription::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_rejects_duplicate_params() {
        let yaml = r#"
bidderName: foo
properties:
  endpointUrl: "https://x"
bidderParams:
  - name: a
    type: String
  - name: a
    type: Integer
"#;
        let err = BidderDescription::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate bidder param 'a'"));
    }

    #[test]
    fn test_missing_endpoint_fails() {
        let yaml = "bidderName: foo\n";
        assert!(matches!(
            BidderDescription::from_yaml_str(yaml),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_maps_parse_errors_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = BidderDescription::load(&path).unwrap_err();
        match err {
            Error::DescriptionParse { path: p, .. } => assert!(p.ends_with("broken.json")),
            other => panic!("Expected DescriptionParse, got {other:?}"),
        }
    }

    #[test]
    fn test_param_type_helpers() {
        assert_eq!(ParamType::Long.java_type(), "Long");
        assert!(ParamType::Double.is_numeric());
        assert!(!ParamType::Boolean.is_numeric());
        assert!(!ParamType::String.is_numeric());
    }

    #[test]
    fn test_param_lookup() {
        let description = BidderDescription::from_yaml_str(YAML).unwrap();
        assert_eq!(
            description.param("siteId").map(|p| p.param_type),
            Some(ParamType::Integer)
        );
        assert!(description.param("missing").is_none());
    }
}
