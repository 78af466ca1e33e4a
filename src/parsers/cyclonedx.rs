//! CycloneDX SBOM codec.
//!
//! Handles CycloneDX 1.4, 1.5, and 1.6 in JSON encoding, both directions.
//! XML is recognized during detection but rejected as an unsupported
//! encoding. The metadata.component becomes the document root, and the
//! dependency graph becomes DEPENDS_ON relationships.

use crate::model::{
    Checksum, Document, DocumentMetadata, ExternalRef, NodeRef, Package, Relationship,
    RelationshipType, SbomFormat, SourceLabel, Tool,
};
use crate::parsers::traits::{
    scan_json_string_field, FormatConfidence, FormatDetection, ParseError, SbomCodec,
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Codec for the CycloneDX family
#[derive(Debug, Default)]
pub struct CycloneDxCodec;

impl CycloneDxCodec {
    /// Create a new CycloneDX codec
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parse_json(&self, content: &str, source: SourceLabel) -> Result<Document, ParseError> {
        let bom: CdxBom = serde_json::from_str(content)?;
        self.convert(bom, source)
    }

    fn convert(&self, bom: CdxBom, source: SourceLabel) -> Result<Document, ParseError> {
        if !bom.bom_format.is_empty() && bom.bom_format != "CycloneDX" {
            return Err(ParseError::InvalidStructure(format!(
                "bomFormat is '{}', expected 'CycloneDX'",
                bom.bom_format
            )));
        }
        if bom.spec_version.is_empty() {
            return Err(ParseError::MissingField("specVersion".to_string()));
        }
        if !bom.spec_version.starts_with("1.") {
            return Err(ParseError::UnsupportedVersion {
                family: "CycloneDX".to_string(),
                version: bom.spec_version.clone(),
                supported: SbomFormat::CycloneDx.supported_versions().to_string(),
            });
        }

        let mut metadata = DocumentMetadata::new(SbomFormat::CycloneDx, bom.spec_version.clone());
        metadata.namespace = bom.serial_number.clone();

        let mut root_id = None;
        let mut document = Document::new(metadata, source);

        if let Some(meta) = bom.metadata {
            document.metadata.created = meta
                .timestamp
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|dt| dt.with_timezone(&Utc));
            document.metadata.tools = convert_tools(meta.tools);

            if let Some(component) = meta.component {
                let package = convert_component(component)?;
                if document.metadata.name.is_none() {
                    document.metadata.name = Some(package.name.clone());
                }
                root_id = Some(package.local_id.clone());
                document.add_package(package);
            }
        }

        for component in bom.components {
            document.add_package(convert_component(component)?);
        }

        for dependency in bom.dependencies {
            for target in dependency.depends_on {
                document.add_relationship(Relationship::between(
                    dependency.dependency_ref.clone(),
                    RelationshipType::DependsOn,
                    target,
                ));
            }
        }

        if let Some(root) = root_id {
            document.add_relationship(Relationship::describes(root));
        }

        Ok(document)
    }
}

fn convert_tools(tools: Option<CdxTools>) -> Vec<Tool> {
    match tools {
        None => Vec::new(),
        Some(CdxTools::List(list)) => list
            .into_iter()
            .filter(|t| t.name.is_some())
            .map(|t| Tool {
                name: t.name.unwrap_or_default(),
                version: t.version,
            })
            .collect(),
        Some(CdxTools::Object(object)) => object
            .components
            .into_iter()
            .chain(object.services)
            .map(|t| Tool {
                name: t.name,
                version: t.version,
            })
            .collect(),
    }
}

fn convert_component(component: CdxComponent) -> Result<Package, ParseError> {
    // bom-ref is optional in the schema; fall back to purl, then to a
    // name@version composite, so every node can be addressed by an edge.
    let local_id = component
        .bom_ref
        .clone()
        .or_else(|| component.purl.clone())
        .unwrap_or_else(|| match &component.version {
            Some(version) => format!("{}@{}", component.name, version),
            None => component.name.clone(),
        });
    if local_id.is_empty() {
        return Err(ParseError::MissingField(
            "component bom-ref, purl, or name".to_string(),
        ));
    }

    let mut package = Package::new(local_id, component.name);
    package.version = component.version;
    package.purl = component.purl;
    package.package_type = non_empty(component.component_type);
    package.supplier = component.supplier.and_then(|s| s.name);

    for license in component.licenses {
        let value = match license {
            CdxLicenseChoice::Expression { expression } => Some(expression),
            CdxLicenseChoice::Named { license } => license.id.or(license.name),
        };
        if package.license_declared.is_none() {
            package.license_declared = value;
        }
    }

    for hash in component.hashes {
        package.checksums.push(Checksum::new(hash.alg, hash.content));
    }

    for reference in component.external_references {
        package.external_refs.push(ExternalRef::new(
            None,
            reference.ref_type,
            reference.url,
        ));
    }

    for property in component.properties {
        package.set_marker(property.name, property.value);
    }

    Ok(package)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl SbomCodec for CycloneDxCodec {
    fn format(&self) -> SbomFormat {
        SbomFormat::CycloneDx
    }

    fn parse_str(&self, content: &str, source: SourceLabel) -> Result<Document, ParseError> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') {
            self.parse_json(content, source)
        } else if trimmed.starts_with('<') && content.contains("cyclonedx.org/schema/bom") {
            Err(ParseError::UnsupportedEncoding {
                family: "CycloneDX".to_string(),
                encoding: "XML".to_string(),
            })
        } else {
            Err(ParseError::UnknownFormat(
                "expected CycloneDX JSON content".to_string(),
            ))
        }
    }

    fn serialize(&self, document: &Document) -> Result<String, ParseError> {
        let spec_version = if document.metadata.format == SbomFormat::CycloneDx
            && !document.metadata.spec_version.is_empty()
        {
            document.metadata.spec_version.clone()
        } else {
            "1.5".to_string()
        };

        let root_id = document.describes_target().map(str::to_string);

        let mut root_component = None;
        let mut components = Vec::new();
        for package in document.packages.values() {
            let wire = component_to_wire(package);
            if root_id.as_deref() == Some(package.local_id.as_str()) {
                root_component = Some(wire);
            } else {
                components.push(wire);
            }
        }

        // The wire format only carries a flat dependency graph; other
        // relationship types flatten into it rather than being dropped.
        let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for relationship in &document.relationships {
            if relationship.rel_type == RelationshipType::Describes {
                continue;
            }
            let (NodeRef::Package(from), NodeRef::Package(to)) =
                (&relationship.from, &relationship.to)
            else {
                tracing::debug!(
                    relationship = %relationship.rel_type,
                    "skipping document-level relationship in CycloneDX output"
                );
                continue;
            };
            if relationship.rel_type != RelationshipType::DependsOn {
                tracing::debug!(
                    relationship = %relationship.rel_type,
                    from = %from,
                    "folding relationship into the CycloneDX dependency graph"
                );
            }
            grouped.entry(from.clone()).or_default().push(to.clone());
        }
        let dependencies = grouped
            .into_iter()
            .map(|(dependency_ref, depends_on)| CdxDependency {
                dependency_ref,
                depends_on,
            })
            .collect();

        let timestamp = document
            .metadata
            .created
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        // 1.4 predates the tools object shape
        let tools = if document.metadata.tools.is_empty() {
            None
        } else if spec_version == "1.4" {
            Some(CdxTools::List(
                document
                    .metadata
                    .tools
                    .iter()
                    .map(|t| CdxTool {
                        vendor: None,
                        name: Some(t.name.clone()),
                        version: t.version.clone(),
                    })
                    .collect(),
            ))
        } else {
            Some(CdxTools::Object(CdxToolsObject {
                components: document
                    .metadata
                    .tools
                    .iter()
                    .map(|t| CdxToolComponent {
                        component_type: "application".to_string(),
                        name: t.name.clone(),
                        version: t.version.clone(),
                    })
                    .collect(),
                services: Vec::new(),
            }))
        };

        let serial_number = document
            .metadata
            .namespace
            .clone()
            .filter(|n| n.starts_with("urn:uuid:"));

        let wire = CdxBom {
            bom_format: "CycloneDX".to_string(),
            spec_version,
            serial_number,
            version: Some(1),
            metadata: Some(CdxMetadata {
                timestamp: Some(timestamp),
                tools,
                component: root_component,
            }),
            components,
            dependencies,
        };

        serde_json::to_string_pretty(&wire).map_err(Into::into)
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim_start();

        if trimmed.starts_with('{') {
            let has_bom_format = content.contains("\"bomFormat\"");
            let has_spec_version = content.contains("\"specVersion\"");
            let has_schema = content.contains("cyclonedx.org/schema");
            let version = scan_json_string_field(content, "specVersion");

            if has_bom_format && has_spec_version {
                let mut detection =
                    FormatDetection::with_confidence(FormatConfidence::CERTAIN).variant("JSON");
                if let Some(v) = version {
                    detection = detection.version(&v);
                }
                return detection;
            } else if has_bom_format || has_schema {
                let mut detection =
                    FormatDetection::with_confidence(FormatConfidence::HIGH).variant("JSON");
                if let Some(v) = version {
                    detection = detection.version(&v);
                }
                return detection;
            } else if has_spec_version && content.contains("\"components\"") {
                return FormatDetection::with_confidence(FormatConfidence::MEDIUM)
                    .variant("JSON")
                    .warning("Missing bomFormat field - might not be CycloneDX");
            }
            return FormatDetection::no_match();
        }

        if trimmed.starts_with('<') && content.contains("cyclonedx.org/schema/bom") {
            return FormatDetection::with_confidence(FormatConfidence::HIGH).variant("XML");
        }

        FormatDetection::no_match()
    }
}

fn component_to_wire(package: &Package) -> CdxComponent {
    CdxComponent {
        component_type: package
            .package_type
            .clone()
            .unwrap_or_else(|| "library".to_string()),
        bom_ref: Some(package.local_id.clone()),
        name: package.name.clone(),
        version: package.version.clone(),
        purl: package.purl.clone(),
        supplier: package
            .supplier
            .clone()
            .map(|name| CdxSupplier { name: Some(name) }),
        licenses: package
            .license_declared
            .clone()
            .or_else(|| package.license_concluded.clone())
            .map(|expression| vec![CdxLicenseChoice::Expression { expression }])
            .unwrap_or_default(),
        hashes: package
            .checksums
            .iter()
            .map(|c| CdxHash {
                alg: c.algorithm.clone(),
                content: c.value.clone(),
            })
            .collect(),
        external_references: package
            .external_refs
            .iter()
            .map(|r| CdxExternalReference {
                ref_type: r.ref_type.clone(),
                url: r.locator.clone(),
            })
            .collect(),
        properties: package
            .annotations
            .iter()
            .map(|(name, value)| CdxProperty {
                name: name.clone(),
                value: value.clone(),
            })
            .collect(),
    }
}

// CycloneDX JSON wire structures

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxBom {
    bom_format: String,
    spec_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<CdxMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<CdxComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<CdxDependency>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<CdxTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<CdxComponent>,
}

/// The tools field changed shape in 1.5: a plain array before, an object
/// with components and services after.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CdxTools {
    List(Vec<CdxTool>),
    Object(CdxToolsObject),
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxToolsObject {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<CdxToolComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    services: Vec<CdxToolComponent>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxToolComponent {
    #[serde(rename = "type")]
    component_type: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxComponent {
    #[serde(rename = "type")]
    component_type: String,
    #[serde(rename = "bom-ref", skip_serializing_if = "Option::is_none")]
    bom_ref: Option<String>,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    purl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplier: Option<CdxSupplier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    licenses: Vec<CdxLicenseChoice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hashes: Vec<CdxHash>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    external_references: Vec<CdxExternalReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    properties: Vec<CdxProperty>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxSupplier {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CdxLicenseChoice {
    Expression { expression: String },
    Named { license: CdxLicense },
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CdxLicense {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CdxHash {
    alg: String,
    content: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxExternalReference {
    #[serde(rename = "type")]
    ref_type: String,
    url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CdxProperty {
    name: String,
    value: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CdxDependency {
    #[serde(rename = "ref")]
    dependency_ref: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
}
