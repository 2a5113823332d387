//! Serde model of an API description document.
//!
//! A document declares scalars, enums, unions, shapes and operations by
//! name. Type expressions are strings: a declared or built-in type name,
//! `void`/`never`/`unknown`, a quoted string literal (`'"Succeeded"'`), or
//! `ResourceLocation<Shape>`.
//!
//! ```yaml
//! enums:
//!   - name: OperationState
//!     members: [Running, Succeeded, Failed, Canceled]
//! shapes:
//!   - name: WidgetStatus
//!     properties:
//!       status: OperationState
//!       result: Widget
//! operations:
//!   - name: createWidget
//!     verb: put
//!     path: /widgets/{name}
//!     responses:
//!       - status: 201
//!         type: Widget
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::annotations::TerminalState;
use crate::error::{LrometaError, Result};
use crate::graph::{HttpVerb, ResourceOperationKind, StatusCode};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scalars: Vec<ScalarDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unions: Vec<UnionDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<ShapeDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<OperationDecl>,
}

//=== Types ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScalarDecl {
    pub name: String,
    /// Must be built in or declared earlier in the list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Enum or union listing the values the scalar is known to take
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_values: Option<String>,
    /// Shape this scalar is a resource location of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_location: Option<String>,
}

/// Terminal-state marker on an enum member or union variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalDecl {
    Succeeded,
    Failed,
    Canceled,
}

impl From<TerminalDecl> for TerminalState {
    fn from(decl: TerminalDecl) -> Self {
        match decl {
            TerminalDecl::Succeeded => TerminalState::Succeeded,
            TerminalDecl::Failed => TerminalState::Failed,
            TerminalDecl::Canceled => TerminalState::Canceled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<MemberDecl>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lro_status: bool,
}

/// An enum member: a bare name or a name with a value and marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberDecl {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal: Option<TerminalDecl>,
    },
}

impl MemberDecl {
    pub fn name(&self) -> &str {
        match self {
            MemberDecl::Name(name) => name,
            MemberDecl::Detailed { name, .. } => name,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            MemberDecl::Name(_) => None,
            MemberDecl::Detailed { value, .. } => value.as_deref(),
        }
    }

    pub fn terminal(&self) -> Option<TerminalDecl> {
        match self {
            MemberDecl::Name(_) => None,
            MemberDecl::Detailed { terminal, .. } => *terminal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UnionDecl {
    pub name: String,
    pub variants: Vec<VariantDecl>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lro_status: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VariantDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShapeDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, PropertyDecl>,
}

//=== Properties ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationDecl {
    #[default]
    Payload,
    Body,
    Header,
    Path,
    Query,
}

/// A property: a bare type expression or a full declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyDecl {
    Type(String),
    Detailed(Box<PropertyDetail>),
}

impl PropertyDecl {
    pub fn detail(&self) -> PropertyDetail {
        match self {
            PropertyDecl::Type(ty) => PropertyDetail::of_type(ty),
            PropertyDecl::Detailed(detail) => (**detail).clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyDetail {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub location: LocationDecl,
    /// Header field name, defaults to the property name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_location: Option<PollingLocationDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_location: Option<FinalLocationDecl>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lro_status: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lro_result: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub lro_error_result: bool,
    /// Target parameter this property feeds when calling a linked
    /// operation; empty means the parameter of the same name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_parameter: Option<String>,
}

impl PropertyDetail {
    pub fn of_type(ty: &str) -> Self {
        Self {
            ty: ty.to_string(),
            location: LocationDecl::Payload,
            header: None,
            key: false,
            polling_location: None,
            final_location: None,
            lro_status: false,
            lro_result: false,
            lro_error_result: false,
            polling_parameter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollingLocationDecl {
    Flag(bool),
    StatusMonitor(StatusMonitorOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusMonitorOptions {
    pub polling_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FinalLocationDecl {
    Flag(bool),
    /// Explicit type of the resource the link points to
    Target { result: String },
}

//=== Operations ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OperationDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub verb: HttpVerb,
    pub path: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, PropertyDecl>,
    pub responses: Vec<ResponseDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceDecl>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub action: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_operation: Option<LinkDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_operation: Option<LinkDecl>,
    /// Explicit final-state override, e.g. `operation-location`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_state_via: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseDecl {
    pub status: StatusCode,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceDecl {
    pub kind: ResourceOperationKind,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
}

/// Explicit link to a polling or final operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LinkDecl {
    pub operation: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, ParameterDecl>,
}

/// Source of one linked-operation parameter; exactly one field must be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParameterDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_property: Option<String>,
}

//=== Parsing ===

impl ApiDocument {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a document; `.json` files are parsed as JSON, anything else as YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let document = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_yaml_str(&content)?
        };
        log::debug!(
            "Loaded document {}: {} shapes, {} operations",
            path.display(),
            document.shapes.len(),
            document.operations.len()
        );
        Ok(document)
    }

    /// SHA-256 of the canonical JSON form, hex encoded
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    pub fn validate(&self) -> Result<()> {
        for operation in &self.operations {
            if operation.responses.is_empty() {
                return Err(LrometaError::InvalidDocument(format!(
                    "operation '{}' declares no responses",
                    operation.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
enums:
  - name: OperationState
    members:
      - Running
      - name: Done
        terminal: succeeded
      - Failed
shapes:
  - name: Widget
    properties:
      name: string
      etag:
        type: string
        location: header
        header: ETag
operations:
  - name: createWidget
    verb: put
    path: /widgets/{name}
    responses:
      - status: 201
        type: Widget
      - status: default
        type: Error
        error: true
    finalStateVia: original-uri
"#;

    #[test]
    fn test_parse_yaml_document() {
        let document = ApiDocument::from_yaml_str(DOCUMENT).unwrap();
        let states = &document.enums[0];
        assert_eq!(states.members.len(), 3);
        assert_eq!(states.members[0].name(), "Running");
        assert_eq!(states.members[1].terminal(), Some(TerminalDecl::Succeeded));

        let widget = &document.shapes[0];
        assert_eq!(widget.properties["name"], PropertyDecl::Type("string".into()));
        let etag = widget.properties["etag"].detail();
        assert_eq!(etag.location, LocationDecl::Header);
        assert_eq!(etag.header.as_deref(), Some("ETag"));

        let op = &document.operations[0];
        assert_eq!(op.verb, HttpVerb::Put);
        assert_eq!(op.responses[1].status, StatusCode::Default);
        assert!(op.responses[1].error);
        assert_eq!(op.final_state_via.as_deref(), Some("original-uri"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = ApiDocument::from_yaml_str("shapes:\n  - name: A\n    colour: red\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let first = ApiDocument::from_yaml_str(DOCUMENT).unwrap();
        let mut second = first.clone();
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
        assert_eq!(first.fingerprint().unwrap().len(), 64);

        second.namespace = Some("Contoso".into());
        assert_ne!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[test]
    fn test_json_and_yaml_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("api.yaml");
        fs::write(&yaml, DOCUMENT).unwrap();
        let from_yaml = ApiDocument::from_path(&yaml).unwrap();

        let json = dir.path().join("api.json");
        fs::write(&json, serde_json::to_string(&from_yaml).unwrap()).unwrap();
        let from_json = ApiDocument::from_path(&json).unwrap();
        assert_eq!(from_yaml, from_json);
    }

    #[test]
    fn test_validate_requires_responses() {
        let mut document = ApiDocument::from_yaml_str(DOCUMENT).unwrap();
        assert!(document.validate().is_ok());
        document.operations[0].responses.clear();
        assert!(matches!(
            document.validate(),
            Err(LrometaError::InvalidDocument(_))
        ));
    }
}
