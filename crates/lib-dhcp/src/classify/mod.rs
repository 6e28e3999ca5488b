use std::collections::BTreeSet;
use std::fmt::Display;

mod expr;
mod parser;

pub use expr::*;
pub use parser::*;

use crate::defs::OptionDefRegistry;
use crate::types::option::code::DHO_VENDOR_CLASS_IDENTIFIER;
use crate::types::Message;
use crate::{DOCSIS3_CLASS_EROUTER, DOCSIS3_CLASS_MODEM, VENDOR_CLASS_PREFIX};

/// The set of class tags attached to a packet during classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientClasses {
    classes: BTreeSet<String>,
}

impl ClientClasses {
    pub fn insert(&mut self, class: impl Into<String>) {
        self.classes.insert(class.into());
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
}

impl Display for ClientClasses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self.classes.iter().cloned().collect::<Vec<_>>().join(" ");
        write!(f, "{joined}")
    }
}

/// One configured client class: a name and its compiled test expression.
#[derive(Debug, Clone)]
pub struct ClientClassDef {
    name: String,
    matcher: Expr,
}

impl ClientClassDef {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Evaluates every configured class against inbound packets and injects
/// vendor-derived classes from option 60. Pure: identical packet bytes and
/// configuration always yield the identical class set.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    classes: Vec<ClientClassDef>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(
        &mut self,
        name: impl Into<String>,
        test: &str,
        registry: &OptionDefRegistry,
    ) -> Result<(), ClassParseError> {
        let matcher = parse_expression(test, registry)?;
        self.classes.push(ClientClassDef {
            name: name.into(),
            matcher,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Attach every matching class plus the vendor-derived class.
    pub fn classify(&self, message: &mut Message) {
        for class in &self.classes {
            if class.matcher.matches(message) {
                message.classes.insert(class.name.clone());
            }
        }
        classify_by_vendor(message);
    }
}

/// Derive a `VENDOR_CLASS_*` tag from the vendor class identifier option,
/// normalizing the two well-known cable modem identifiers.
fn classify_by_vendor(message: &mut Message) {
    let Some(vendor_class) = message
        .get_option(DHO_VENDOR_CLASS_IDENTIFIER)
        .and_then(|o| o.as_str())
    else {
        return;
    };

    if vendor_class.contains(DOCSIS3_CLASS_MODEM) {
        message
            .classes
            .insert(format!("{VENDOR_CLASS_PREFIX}{DOCSIS3_CLASS_MODEM}"));
    } else if vendor_class.contains(DOCSIS3_CLASS_EROUTER) {
        message
            .classes
            .insert(format!("{VENDOR_CLASS_PREFIX}{DOCSIS3_CLASS_EROUTER}"));
    } else {
        message
            .classes
            .insert(format!("{VENDOR_CLASS_PREFIX}{vendor_class}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::option::code::*;
    use crate::types::option::DhcpOption;
    use crate::types::MessageType;

    fn registry() -> OptionDefRegistry {
        OptionDefRegistry::with_std_defs()
    }

    fn packet() -> Message {
        let mut message = Message::new(MessageType::Discover, 0x1234_5678);
        message.options.insert(DhcpOption::ipv4(
            DHO_DHCP_REQUESTED_ADDRESS,
            "2.2.2.2".parse().unwrap(),
        ));
        message
    }

    fn matches(test: &str) -> bool {
        let expr = parse_expression(test, &registry()).unwrap();
        expr.matches(&packet())
    }

    #[test]
    fn option_value_matcher() {
        assert!(!matches(r#"option dhcp-requested-address == "1.1.1.1""#));
        assert!(matches(r#"option dhcp-requested-address != "1.1.1.1""#));
        assert!(matches(r#"option dhcp-requested-address == "2.2.2.2""#));
        assert!(matches(r#"option[50] == "2.2.2.2""#));
    }

    #[test]
    fn option_exists_matcher() {
        assert!(!matches(r#"!exists option dhcp-requested-address"#));
        assert!(matches(r#"exists option dhcp-requested-address"#));
        assert!(matches(r#"!exists option host-name"#));
    }

    #[test]
    fn substring_matcher() {
        assert!(!matches(r#"substring(option[50],0,4) != "2.2.""#));
        assert!(matches(r#"substring(option dhcp-requested-address,0, 4) == "2.2.""#));
        assert!(!matches(r#"substring(option dhcp-requested-address,0, 4) == "1.2.""#));
    }

    #[test]
    fn and_or_matcher() {
        assert!(!matches(
            r#"substring(option dhcp-requested-address, 0, 4) != "2.2." && option dhcp-requested-address == "2.2.2.2""#
        ));
        assert!(matches(
            r#"substring(option dhcp-requested-address, 0, 4) != "2.2." || option dhcp-requested-address == "2.2.2.2""#
        ));
        assert!(matches(
            r#"substring(option[50], 0, 4) == "2.2." && option dhcp-requested-address == "2.2.2.2" && exists option dhcp-requested-address"#
        ));
    }

    #[test]
    fn parentheses_override_precedence() {
        // Without brackets: (false && false) || true
        assert!(matches(
            r#"substring(option dhcp-requested-address, 0, 4) != "2.2." && option dhcp-requested-address != "2.2.2.2" || exists option dhcp-requested-address"#
        ));
        // With brackets: false && (false || true)
        assert!(!matches(
            r#"substring(option dhcp-requested-address, 0, 4) != "2.2." && (option dhcp-requested-address != "2.2.2.2" || exists option[50])"#
        ));
    }

    #[test]
    fn absent_option_comparisons_never_match() {
        assert!(!matches(r#"option host-name == "foo""#));
        assert!(!matches(r#"option host-name != "foo""#));
    }

    #[test]
    fn parse_errors() {
        let registry = registry();
        assert!(matches!(
            parse_expression(r#"option host-name == "unterminated"#, &registry),
            Err(ClassParseError::StringLiteralFormat { .. })
        ));
        assert!(matches!(
            parse_expression("option nonexistent-name == \"x\"", &registry),
            Err(ClassParseError::UnknownOption(_))
        ));
        assert!(matches!(
            parse_expression("option[300] == \"x\"", &registry),
            Err(ClassParseError::BadOptionCode(_))
        ));
        assert!(matches!(
            parse_expression("option host-name ==", &registry),
            Err(ClassParseError::Parse { .. })
        ));
    }

    #[test]
    fn classifier_attaches_matching_classes() {
        let registry = registry();
        let mut classifier = Classifier::new();
        classifier
            .add_class("wants-2-2-2-2", r#"option[50] == "2.2.2.2""#, &registry)
            .unwrap();
        classifier
            .add_class("wants-other", r#"option[50] == "9.9.9.9""#, &registry)
            .unwrap();

        let mut message = packet();
        classifier.classify(&mut message);

        assert!(message.classes.contains("wants-2-2-2-2"));
        assert!(!message.classes.contains("wants-other"));
    }

    #[test]
    fn vendor_classes_are_normalized() {
        let classifier = Classifier::new();

        let mut message = packet();
        message.options.insert(DhcpOption::string(
            DHO_VENDOR_CLASS_IDENTIFIER,
            "docsis3.0:ECM:EMTA",
        ));
        classifier.classify(&mut message);
        assert!(message.classes.contains("VENDOR_CLASS_docsis3.0"));

        let mut message = packet();
        message.options.insert(DhcpOption::string(
            DHO_VENDOR_CLASS_IDENTIFIER,
            "some-pxe-client",
        ));
        classifier.classify(&mut message);
        assert!(message.classes.contains("VENDOR_CLASS_some-pxe-client"));
    }
}
