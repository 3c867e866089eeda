use xmlwriter::{Indent, Options, XmlWriter};

use super::{VectorDocument, SVG_NS};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

pub fn write_document(doc: &VectorDocument) -> String {
    let mut xml = XmlWriter::new(Options {
        use_single_quote: false,
        indent: Indent::Spaces(4),
        attributes_indent: Indent::None,
    });

    xml.start_element("svg");
    xml.write_attribute("xmlns", SVG_NS);
    for (prefix, uri) in &doc.namespaces {
        xml.write_attribute(format!("xmlns:{prefix}").as_str(), uri.as_str());
    }
    xml.write_attribute("width", doc.width.as_str());
    xml.write_attribute("height", doc.height.as_str());
    xml.write_attribute("viewBox", doc.view_box.as_str());

    for element in &doc.elements {
        xml.start_element(element.kind.as_str());
        for (name, value) in &element.attributes {
            xml.write_attribute(name.as_str(), value.as_str());
        }
        xml.end_element();
    }

    let mut out = String::from(XML_DECLARATION);
    out.push_str(xml.end_document().as_str());
    out.push('\n');
    out
}
