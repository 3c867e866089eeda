use roxmltree::{Attribute, Document, Node, ParsingOptions};

use super::{DocumentError, ElementKind, SvgElement, VectorDocument, SVG_NS};

const DEFAULT_CANVAS_SIZE: &str = "100";
const XML_PREFIX: &str = "xml";

impl VectorDocument {
    pub fn parse_str(text: &str) -> Result<Self, DocumentError> {
        // Tracers emit a DOCTYPE header.
        let xml_opt = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let xml = Document::parse_with_options(text, xml_opt).map_err(DocumentError::Parse)?;
        Ok(Self::from_xml_root(xml.root_element()))
    }

    fn from_xml_root(root: Node) -> Self {
        let width = root
            .attribute("width")
            .unwrap_or(DEFAULT_CANVAS_SIZE)
            .to_string();
        let height = root
            .attribute("height")
            .unwrap_or(DEFAULT_CANVAS_SIZE)
            .to_string();
        let view_box = root
            .attribute("viewBox")
            .map(str::to_string)
            .unwrap_or_else(|| format!("0 0 {width} {height}"));
        let mut doc = Self::new(width, height, view_box);

        // Paths come first, then the remaining shapes in document order.
        for node in root.descendants() {
            if element_kind(node) == Some(ElementKind::Path) {
                doc.elements.push(
                    SvgElement::new(ElementKind::Path)
                        .with_attribute("d", node.attribute("d").unwrap_or_default()),
                );
            }
        }
        for node in root.descendants() {
            match element_kind(node) {
                None | Some(ElementKind::Path) => {}
                Some(ElementKind::Rect) if node == root => {}
                Some(kind) => {
                    let element = copy_element(kind, node, &mut doc.namespaces);
                    doc.elements.push(element);
                }
            }
        }
        doc
    }
}

fn element_kind(node: Node) -> Option<ElementKind> {
    if !node.is_element() {
        return None;
    }
    let tag = node.tag_name();
    match tag.namespace() {
        None | Some(SVG_NS) => ElementKind::from_local_name(tag.name()),
        Some(_) => None,
    }
}

fn copy_element(
    kind: ElementKind,
    node: Node,
    namespaces: &mut Vec<(String, String)>,
) -> SvgElement {
    let mut element = SvgElement::new(kind);
    for attr in node.attributes() {
        element.attributes.push((
            qualified_attribute_name(node, &attr, namespaces),
            attr.value().to_string(),
        ));
    }
    element
}

// Records every prefix it emits so the writer can bind it on the root.
fn qualified_attribute_name(
    node: Node,
    attr: &Attribute,
    namespaces: &mut Vec<(String, String)>,
) -> String {
    let Some((ns, prefix)) = attr
        .namespace()
        .and_then(|ns| node.lookup_prefix(ns).map(|prefix| (ns, prefix)))
    else {
        return attr.name().to_string();
    };
    // `xml` is bound implicitly and must not be redeclared.
    if prefix != XML_PREFIX && !namespaces.iter().any(|(known, _)| known == prefix) {
        namespaces.push((prefix.to_string(), ns.to_string()));
    }
    format!("{prefix}:{}", attr.name())
}
