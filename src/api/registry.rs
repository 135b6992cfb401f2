//! Purpose: Resolve a logical service class to its live instances via the registry feed.
//! Exports: `RegistryResolver`, `ServiceDescriptor`, `parse_registry`.
//! Role: Fetches the XML feed through the dispatcher and maps it to typed descriptors.
//! Invariants: Descriptors follow document order; nothing is cached between calls.
//! Invariants: Malformed XML or a missing ip/host/port fails the whole call (no partial results).
//! Invariants: A missing `metadata/name` yields `name: None`, never an error.
#![allow(clippy::result_large_err)]

use super::dispatch::{Dispatcher, Outcome};
use crate::core::error::{ApiResult, Error, ErrorKind};
use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    pub service_class: String,
    pub name: Option<String>,
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub port: String,
}

#[derive(Clone, Debug)]
pub struct RegistryResolver {
    dispatcher: Dispatcher,
}

impl RegistryResolver {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn resolve_services(&self, service_class: &str) -> ApiResult<Vec<ServiceDescriptor>> {
        let path = registry_path(&self.dispatcher.config().registry_base, service_class);
        let document = match self.dispatcher.get_json(&path)? {
            Outcome::Text(text) => text,
            Outcome::Json(_) => {
                return Err(Error::new(ErrorKind::Parse)
                    .with_message(format!("registry feed for {service_class} is json, expected xml")));
            }
        };
        let services = parse_registry(service_class, &document)?;
        tracing::debug!(service_class, instances = services.len(), "resolved services");
        Ok(services)
    }
}

fn registry_path(base: &str, service_class: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), service_class)
}

pub fn parse_registry(service_class: &str, xml: &str) -> ApiResult<Vec<ServiceDescriptor>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(xml, options).map_err(|err| {
        Error::new(ErrorKind::Parse)
            .with_message(format!("registry feed for {service_class} is not well-formed xml"))
            .with_source(err)
    })?;

    document
        .root_element()
        .descendants()
        .skip(1)
        .filter(|node| has_tag(node, "instance"))
        .enumerate()
        .map(|(index, instance)| parse_instance(service_class, index, instance))
        .collect()
}

fn parse_instance(
    service_class: &str,
    index: usize,
    instance: Node<'_, '_>,
) -> ApiResult<ServiceDescriptor> {
    let required = |tag: &str| {
        first_descendant(instance, tag)
            .map(text_content)
            .ok_or_else(|| {
                Error::new(ErrorKind::Parse).with_message(format!(
                    "registry instance {index} of {service_class} is missing <{tag}>"
                ))
            })
    };

    let ip = required("ipAddr")?;
    let host = required("hostName")?;
    let port = required("port")?;
    let name = first_descendant(instance, "metadata")
        .and_then(|metadata| first_descendant(metadata, "name"))
        .map(text_content);

    Ok(ServiceDescriptor {
        service_class: service_class.to_string(),
        name,
        ip,
        host: Some(host),
        port,
    })
}

fn has_tag(node: &Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

fn first_descendant<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|child| has_tag(child, tag))
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ServiceDescriptor, parse_registry, registry_path};
    use crate::core::error::ErrorKind;

    #[test]
    fn empty_feed_yields_no_instances() {
        let services = parse_registry("x", "<application><name>X</name></application>").expect("parse");
        assert!(services.is_empty());
    }

    #[test]
    fn single_instance_maps_all_fields() {
        let xml = "<instances><instance><ipAddr>10.0.0.5</ipAddr><hostName>svc1</hostName>\
                   <port>9001</port><metadata><name>primary</name></metadata></instance></instances>";
        let services = parse_registry("fileservice", xml).expect("parse");
        assert_eq!(
            services,
            vec![ServiceDescriptor {
                service_class: "fileservice".to_string(),
                name: Some("primary".to_string()),
                ip: "10.0.0.5".to_string(),
                host: Some("svc1".to_string()),
                port: "9001".to_string(),
            }]
        );
    }

    #[test]
    fn instances_keep_document_order() {
        let xml = r#"<application>
              <instance><ipAddr>10.0.0.1</ipAddr><hostName>a</hostName><port enabled="true">1</port></instance>
              <instance><ipAddr>10.0.0.2</ipAddr><hostName>b</hostName><port enabled="true">2</port></instance>
            </application>"#;
        let services = parse_registry("x", xml).expect("parse");
        let hosts: Vec<_> = services.iter().map(|s| s.host.as_deref()).collect();
        assert_eq!(hosts, vec![Some("a"), Some("b")]);
        assert_eq!(services[1].port, "2");
    }

    #[test]
    fn missing_metadata_name_is_none() {
        let xml = "<a><instance><ipAddr>1</ipAddr><hostName>h</hostName><port>2</port>\
                   <metadata><zone>eu</zone></metadata></instance>\
                   <instance><ipAddr>3</ipAddr><hostName>i</hostName><port>4</port></instance></a>";
        let services = parse_registry("x", xml).expect("parse");
        assert_eq!(services.len(), 2);
        assert!(services.iter().all(|s| s.name.is_none()));
    }

    #[test]
    fn doctype_declaration_is_accepted() {
        let xml = "<?xml version=\"1.0\"?>\n<!DOCTYPE applications>\n<applications><application>\
                   <instance><ipAddr>10.0.0.9</ipAddr><hostName>d</hostName><port>7</port></instance>\
                   </application></applications>";
        let services = parse_registry("x", xml).expect("parse");
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].ip, "10.0.0.9");
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let err = parse_registry("x", "<instances><instance>").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn missing_required_field_is_parse_error() {
        let xml = "<a><instance><ipAddr>1</ipAddr><hostName>h</hostName><port>2</port></instance>\
                   <instance><ipAddr>3</ipAddr><port>4</port></instance></a>";
        let err = parse_registry("x", xml).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.message().unwrap_or_default().contains("hostName"));
    }

    #[test]
    fn descriptor_serializes_camel_case() {
        let descriptor = ServiceDescriptor {
            service_class: "x".to_string(),
            name: None,
            ip: "1".to_string(),
            host: None,
            port: "2".to_string(),
        };
        let value = serde_json::to_value(&descriptor).expect("json");
        assert_eq!(value["serviceClass"], "x");
        assert!(value["name"].is_null());
        assert!(value.get("host").is_none());
    }

    #[test]
    fn registry_path_joins_without_double_slash() {
        assert_eq!(registry_path("/eureka/apps/", "svc"), "/eureka/apps/svc");
        assert_eq!(registry_path("/eureka/apps", "svc"), "/eureka/apps/svc");
    }
}
