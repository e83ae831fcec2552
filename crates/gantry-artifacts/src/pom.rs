//! Metadata descriptor (POM) rendering

use gantry_core::{Coordinates, PublicationMetadata};

/// Render the POM for a publication
pub fn render_pom(coordinates: &Coordinates, metadata: &PublicationMetadata) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<project xmlns=\"http://maven.apache.org/POM/4.0.0\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
         xsi:schemaLocation=\"http://maven.apache.org/POM/4.0.0 \
         https://maven.apache.org/xsd/maven-4.0.0.xsd\">\n",
    );
    element(&mut xml, 1, "modelVersion", "4.0.0");
    element(&mut xml, 1, "groupId", &coordinates.group);
    element(&mut xml, 1, "artifactId", &coordinates.artifact_id);
    element(&mut xml, 1, "version", &coordinates.version);
    element(&mut xml, 1, "packaging", &metadata.packaging);
    element(&mut xml, 1, "name", &metadata.name);
    optional(&mut xml, 1, "description", metadata.description.as_deref());
    optional(&mut xml, 1, "url", metadata.url.as_deref());

    if !metadata.licenses.is_empty() {
        open(&mut xml, 1, "licenses");
        for license in &metadata.licenses {
            open(&mut xml, 2, "license");
            element(&mut xml, 3, "name", &license.name);
            optional(&mut xml, 3, "url", license.url.as_deref());
            close(&mut xml, 2, "license");
        }
        close(&mut xml, 1, "licenses");
    }

    if !metadata.developers.is_empty() {
        open(&mut xml, 1, "developers");
        for developer in &metadata.developers {
            open(&mut xml, 2, "developer");
            element(&mut xml, 3, "name", &developer.name);
            optional(&mut xml, 3, "email", developer.email.as_deref());
            optional(&mut xml, 3, "url", developer.url.as_deref());
            close(&mut xml, 2, "developer");
        }
        close(&mut xml, 1, "developers");
    }

    if let Some(scm) = &metadata.scm {
        open(&mut xml, 1, "scm");
        optional(&mut xml, 2, "connection", scm.connection.as_deref());
        optional(
            &mut xml,
            2,
            "developerConnection",
            scm.developer_connection.as_deref(),
        );
        optional(&mut xml, 2, "url", scm.url.as_deref());
        close(&mut xml, 1, "scm");
    }

    xml.push_str("</project>\n");
    xml
}

fn indent(xml: &mut String, depth: usize) {
    for _ in 0..depth {
        xml.push_str("  ");
    }
}

fn open(xml: &mut String, depth: usize, tag: &str) {
    indent(xml, depth);
    xml.push_str(&format!("<{}>\n", tag));
}

fn close(xml: &mut String, depth: usize, tag: &str) {
    indent(xml, depth);
    xml.push_str(&format!("</{}>\n", tag));
}

fn element(xml: &mut String, depth: usize, tag: &str, value: &str) {
    indent(xml, depth);
    xml.push_str(&format!("<{tag}>{}</{tag}>\n", escape(value)));
}

fn optional(xml: &mut String, depth: usize, tag: &str, value: Option<&str>) {
    if let Some(value) = value {
        element(xml, depth, tag, value);
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::config::{DeveloperConfig, LicenseConfig, ScmConfig};

    fn metadata() -> PublicationMetadata {
        PublicationMetadata {
            name: "Native".to_string(),
            description: Some("Hooks & more".to_string()),
            url: Some("https://example.com/native".to_string()),
            packaging: "zip".to_string(),
            licenses: vec![LicenseConfig {
                name: "GNU Lesser General Public License v3.0".to_string(),
                url: Some("https://www.gnu.org/licenses/lgpl-3.0.txt".to_string()),
            }],
            developers: vec![DeveloperConfig {
                name: "Example".to_string(),
                url: Some("https://example.com".to_string()),
                email: None,
            }],
            scm: Some(ScmConfig {
                connection: Some("scm:git:https://example.com/native.git".to_string()),
                developer_connection: None,
                url: Some("https://example.com/native".to_string()),
            }),
        }
    }

    #[test]
    fn test_render_pom() {
        let coords = Coordinates::new("org.example", "native-standalone", "4.2");
        let pom = render_pom(&coords, &metadata());

        assert!(pom.contains("<groupId>org.example</groupId>"));
        assert!(pom.contains("<artifactId>native-standalone</artifactId>"));
        assert!(pom.contains("<version>4.2</version>"));
        assert!(pom.contains("<packaging>zip</packaging>"));
        assert!(pom.contains("<description>Hooks &amp; more</description>"));
        assert!(pom.contains("<name>GNU Lesser General Public License v3.0</name>"));
        assert!(pom.contains("<connection>scm:git:https://example.com/native.git</connection>"));
        assert!(!pom.contains("developerConnection"));
        assert!(pom.trim_end().ends_with("</project>"));
    }

    #[test]
    fn test_optional_sections_omitted() {
        let mut meta = metadata();
        meta.licenses.clear();
        meta.developers.clear();
        meta.scm = None;
        meta.description = None;

        let pom = render_pom(&Coordinates::new("g", "a", "1"), &meta);
        assert!(!pom.contains("<licenses>"));
        assert!(!pom.contains("<developers>"));
        assert!(!pom.contains("<scm>"));
        assert!(!pom.contains("<description>"));
    }
}
