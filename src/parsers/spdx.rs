//! SPDX SBOM codec.
//!
//! Handles SPDX 2.2 and 2.3 in JSON encoding, both directions. Tag-value
//! and RDF/XML are recognized during detection but rejected as unsupported
//! encodings; SPDX 3.x is rejected as an unsupported version.

use crate::model::{
    Checksum, Document, DocumentMetadata, ExternalRef, NodeRef, Package, Relationship,
    RelationshipType, SbomFormat, SourceLabel, Tool, MARKER_ANNOTATOR,
};
use crate::parsers::traits::{
    scan_json_string_field, FormatConfidence, FormatDetection, ParseError, SbomCodec,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Codec for the SPDX family
#[derive(Debug, Default)]
pub struct SpdxCodec;

impl SpdxCodec {
    /// Create a new SPDX codec
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parse_json(&self, content: &str, source: SourceLabel) -> Result<Document, ParseError> {
        let spdx: SpdxDocument = serde_json::from_str(content)?;
        self.convert(spdx, source)
    }

    fn convert(&self, spdx: SpdxDocument, source: SourceLabel) -> Result<Document, ParseError> {
        let version = spdx
            .spdx_version
            .strip_prefix("SPDX-")
            .unwrap_or(&spdx.spdx_version)
            .to_string();
        if !version.starts_with("2.") {
            return Err(ParseError::UnsupportedVersion {
                family: "SPDX".to_string(),
                version: spdx.spdx_version.clone(),
                supported: SbomFormat::Spdx.supported_versions().to_string(),
            });
        }

        let mut metadata = DocumentMetadata::new(SbomFormat::Spdx, version);
        metadata.name = non_empty(spdx.name);
        metadata.namespace = spdx.document_namespace;
        metadata.data_license = non_empty(spdx.data_license);
        if let Some(creation_info) = &spdx.creation_info {
            metadata.created = creation_info
                .created
                .as_deref()
                .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
                .map(|dt| dt.with_timezone(&Utc));
            metadata.tools = creation_info
                .creators
                .iter()
                .filter_map(|c| Tool::from_spdx_creator(c))
                .collect();
        }

        let doc_id = if spdx.spdx_id.is_empty() {
            "SPDXRef-DOCUMENT".to_string()
        } else {
            spdx.spdx_id.clone()
        };

        let mut document = Document::new(metadata, source);

        for pkg in spdx.packages.unwrap_or_default() {
            document.add_package(convert_package(pkg)?);
        }

        for rel in spdx.relationships.unwrap_or_default() {
            document.add_relationship(Relationship::new(
                node_ref(rel.spdx_element_id, &doc_id),
                RelationshipType::from_spdx(&rel.relationship_type),
                node_ref(rel.related_spdx_element, &doc_id),
            ));
        }

        // Older generators point at the root through documentDescribes
        // instead of a DESCRIBES relationship; normalize to an edge.
        if document.describes_target().is_none() {
            for described in spdx.document_describes.unwrap_or_default() {
                document.add_relationship(Relationship::describes(described));
            }
        }

        Ok(document)
    }
}

/// Map a wire identifier to a node reference, folding the document's own
/// identifier into the pseudo-node.
fn node_ref(id: String, doc_id: &str) -> NodeRef {
    if id == doc_id || id == "SPDXRef-DOCUMENT" {
        NodeRef::Document
    } else {
        NodeRef::Package(id)
    }
}

fn convert_package(pkg: SpdxPackage) -> Result<Package, ParseError> {
    if pkg.spdx_id.is_empty() {
        return Err(ParseError::MissingField(format!(
            "SPDXID on package '{}'",
            pkg.name
        )));
    }

    let mut package = Package::new(pkg.spdx_id, pkg.name);
    package.version = pkg.version_info;
    package.download_location = pkg.download_location;
    package.supplier = pkg.supplier;
    package.license_concluded = meaningful_license(pkg.license_concluded);
    package.license_declared = meaningful_license(pkg.license_declared);

    for checksum in pkg.checksums {
        package
            .checksums
            .push(Checksum::new(checksum.algorithm, checksum.checksum_value));
    }

    for ext in pkg.external_refs {
        let reference = ExternalRef::new(
            non_empty(ext.reference_category),
            ext.reference_type,
            ext.reference_locator,
        );
        // The first purl reference becomes the package's purl field; the
        // serializer re-emits it, so nothing is lost.
        if package.purl.is_none() && reference.is_purl() && reference.locator.starts_with("pkg:") {
            package.purl = Some(reference.locator);
        } else {
            package.external_refs.push(reference);
        }
    }

    for annotation in pkg.annotations {
        if annotation.annotator != MARKER_ANNOTATOR {
            continue;
        }
        match serde_json::from_str::<MarkerComment>(&annotation.comment) {
            Ok(marker) => package.set_marker(marker.name, marker.value),
            Err(_) => {
                tracing::debug!(comment = %annotation.comment, "ignoring annotation with non-JSON comment");
            }
        }
    }

    Ok(package)
}

/// Drop the SPDX "no data" license sentinels; everything else is carried.
fn meaningful_license(license: Option<String>) -> Option<String> {
    license.filter(|l| l != "NOASSERTION" && l != "NONE")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl SbomCodec for SpdxCodec {
    fn format(&self) -> SbomFormat {
        SbomFormat::Spdx
    }

    fn parse_str(&self, content: &str, source: SourceLabel) -> Result<Document, ParseError> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') {
            self.parse_json(content, source)
        } else if trimmed.starts_with("SPDXVersion:") || content.contains("\nSPDXVersion:") {
            Err(ParseError::UnsupportedEncoding {
                family: "SPDX".to_string(),
                encoding: "tag-value".to_string(),
            })
        } else if trimmed.starts_with('<')
            && (content.contains("spdx.org/rdf/terms") || content.contains("SpdxDocument"))
        {
            Err(ParseError::UnsupportedEncoding {
                family: "SPDX".to_string(),
                encoding: "RDF/XML".to_string(),
            })
        } else {
            Err(ParseError::UnknownFormat(
                "expected SPDX JSON content".to_string(),
            ))
        }
    }

    fn serialize(&self, document: &Document) -> Result<String, ParseError> {
        let created = document.metadata.created.unwrap_or_else(Utc::now);
        let created_str = created.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let mut creators: Vec<String> = document
            .metadata
            .tools
            .iter()
            .map(Tool::to_spdx_creator)
            .collect();
        if creators.is_empty() {
            creators.push(format!(
                "Tool: {}-{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ));
        }

        let spec_version = if document.metadata.format == SbomFormat::Spdx
            && !document.metadata.spec_version.is_empty()
        {
            document.metadata.spec_version.clone()
        } else {
            "2.3".to_string()
        };

        let packages: Result<Vec<SpdxPackage>, ParseError> = document
            .packages
            .values()
            .map(|p| package_to_wire(p, &created_str))
            .collect();

        let relationships = document
            .relationships
            .iter()
            .map(|r| SpdxRelationship {
                spdx_element_id: wire_node(&r.from),
                relationship_type: r.rel_type.as_spdx().to_string(),
                related_spdx_element: wire_node(&r.to),
            })
            .collect();

        let wire = SpdxDocument {
            spdx_version: format!("SPDX-{spec_version}"),
            spdx_id: "SPDXRef-DOCUMENT".to_string(),
            name: document.metadata.name.clone().unwrap_or_default(),
            data_license: document
                .metadata
                .data_license
                .clone()
                .unwrap_or_else(|| "CC0-1.0".to_string()),
            document_namespace: document.metadata.namespace.clone(),
            creation_info: Some(SpdxCreationInfo {
                created: Some(created_str),
                creators,
            }),
            document_describes: None,
            packages: Some(packages?),
            relationships: Some(relationships),
        };

        serde_json::to_string_pretty(&wire).map_err(Into::into)
    }

    fn detect(&self, content: &str) -> FormatDetection {
        let trimmed = content.trim_start();

        if trimmed.starts_with('{') {
            let has_spdx_version = content.contains("\"spdxVersion\"");
            let has_spdx_id = content.contains("\"SPDXID\"");
            let has_data_license = content.contains("\"dataLicense\"");
            let version = scan_json_string_field(content, "spdxVersion")
                .map(|v| v.strip_prefix("SPDX-").map(str::to_string).unwrap_or(v));

            if has_spdx_version && has_spdx_id {
                let mut detection =
                    FormatDetection::with_confidence(FormatConfidence::CERTAIN).variant("JSON");
                if let Some(v) = version {
                    detection = detection.version(&v);
                }
                return detection;
            } else if has_spdx_version || (has_spdx_id && has_data_license) {
                let mut detection =
                    FormatDetection::with_confidence(FormatConfidence::HIGH).variant("JSON");
                if let Some(v) = version {
                    detection = detection.version(&v);
                }
                return detection;
            } else if content.contains("\"packages\"") && has_data_license {
                return FormatDetection::with_confidence(FormatConfidence::MEDIUM)
                    .variant("JSON")
                    .warning("Missing spdxVersion field");
            }
            return FormatDetection::no_match();
        }

        if trimmed.starts_with("SPDXVersion:") || content.contains("\nSPDXVersion:") {
            let version = content.lines().find_map(|line| {
                line.strip_prefix("SPDXVersion:").map(|rest| {
                    let v = rest.trim();
                    v.strip_prefix("SPDX-").unwrap_or(v).to_string()
                })
            });
            let mut detection =
                FormatDetection::with_confidence(FormatConfidence::HIGH).variant("tag-value");
            if let Some(v) = version {
                detection = detection.version(&v);
            }
            return detection;
        }

        if trimmed.starts_with('<')
            && (content.contains("spdx.org/rdf/terms") || content.contains("SpdxDocument"))
        {
            return FormatDetection::with_confidence(FormatConfidence::HIGH).variant("RDF/XML");
        }

        FormatDetection::no_match()
    }
}

fn wire_node(node: &NodeRef) -> String {
    match node {
        NodeRef::Document => "SPDXRef-DOCUMENT".to_string(),
        NodeRef::Package(id) => id.clone(),
    }
}

fn package_to_wire(package: &Package, created: &str) -> Result<SpdxPackage, ParseError> {
    let mut external_refs = Vec::new();
    if let Some(purl) = &package.purl {
        external_refs.push(SpdxExternalRef {
            reference_category: "PACKAGE-MANAGER".to_string(),
            reference_type: "purl".to_string(),
            reference_locator: purl.clone(),
        });
    }
    for reference in &package.external_refs {
        external_refs.push(SpdxExternalRef {
            reference_category: reference
                .category
                .clone()
                .unwrap_or_else(|| "OTHER".to_string()),
            reference_type: reference.ref_type.clone(),
            reference_locator: reference.locator.clone(),
        });
    }

    let mut annotations = Vec::new();
    for (name, value) in &package.annotations {
        let comment = serde_json::to_string(&MarkerComment {
            name: name.clone(),
            value: value.clone(),
        })?;
        annotations.push(SpdxAnnotation {
            annotator: MARKER_ANNOTATOR.to_string(),
            comment,
            annotation_date: created.to_string(),
            annotation_type: "OTHER".to_string(),
        });
    }

    Ok(SpdxPackage {
        spdx_id: package.local_id.clone(),
        name: package.name.clone(),
        version_info: package.version.clone(),
        download_location: Some(
            package
                .download_location
                .clone()
                .unwrap_or_else(|| "NOASSERTION".to_string()),
        ),
        supplier: package.supplier.clone(),
        license_concluded: package.license_concluded.clone(),
        license_declared: package.license_declared.clone(),
        checksums: package
            .checksums
            .iter()
            .map(|c| SpdxChecksum {
                algorithm: c.algorithm.clone(),
                checksum_value: c.value.clone(),
            })
            .collect(),
        external_refs,
        annotations,
    })
}

// SPDX JSON wire structures

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpdxDocument {
    spdx_version: String,
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    name: String,
    data_license: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creation_info: Option<SpdxCreationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_describes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<Vec<SpdxPackage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relationships: Option<Vec<SpdxRelationship>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpdxCreationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    creators: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpdxPackage {
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license_concluded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license_declared: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    checksums: Vec<SpdxChecksum>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    external_refs: Vec<SpdxExternalRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<SpdxAnnotation>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpdxChecksum {
    algorithm: String,
    checksum_value: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpdxExternalRef {
    reference_category: String,
    reference_type: String,
    reference_locator: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpdxRelationship {
    spdx_element_id: String,
    relationship_type: String,
    related_spdx_element: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SpdxAnnotation {
    annotator: String,
    comment: String,
    annotation_date: String,
    annotation_type: String,
}

/// The compact JSON payload of a marker annotation comment
#[derive(Debug, Serialize, Deserialize)]
struct MarkerComment {
    name: String,
    value: String,
}
