//! Model loading from XML documents and line-oriented rule files.
//!
//! XML layout:
//!
//! ```xml
//! <model xmlns:var="urn:rules:var">
//!   <rule>pageName = 'Main' => color = 'green'</rule>
//!   <rule priority="fallback">*true* => color = 'yellow'</rule>
//!   <rule>
//!     <qualifier>user.role = 'admin'</qualifier>
//!     <key>bannerColor</key>
//!     <var:value>adminColor</var:value>
//!   </rule>
//!   <multirule priority="high">
//!     <q>page = 'A'</q>
//!     <q>page = 'B'</q>
//!     <action>showMenu = YES</action>
//!   </multirule>
//! </model>
//! ```
//!
//! The `var:` prefix must be declared; any namespace URI works.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use roxmltree::{Document, Node};
use tracing::{debug, error, info, warn};

use crate::core::action::Action;
use crate::core::model::Model;
use crate::core::qualifier::{BooleanQualifier, CompoundQualifier, Qualifier};
use crate::core::rule::{Rule, priority};
use crate::core::value::split_key_path;
use crate::parser::rule::{parse_action, parse_priority, parse_qualifier_text, parse_rule};

/// Options shared by all loaders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail the whole load when a single rule cannot be parsed.
    pub fail_on_parse_error: bool,
}

/// Load one model file; `.xml` files use the XML loader, anything else is a
/// rule file with one rule per line.
pub fn load_model_from_path(path: &Path, options: LoadOptions) -> Result<Model> {
    debug!(path = %path.display(), "loading model");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read model {}", path.display()))?;
    let is_xml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
    let model = if is_xml {
        load_model_from_xml(&contents, options)
    } else {
        load_model_from_text(&contents, options)
    };
    let model = model.with_context(|| format!("load model {}", path.display()))?;
    info!(path = %path.display(), rules = model.len(), "loaded model");
    Ok(model)
}

/// Load several model files into one model, preserving file and rule order.
pub fn load_models(paths: &[PathBuf], options: LoadOptions) -> Result<Model> {
    let mut model = Model::default();
    for path in paths {
        let loaded = load_model_from_path(path, options)?;
        model.add_rules(loaded.rules().iter().cloned());
    }
    Ok(model)
}

/// One rule per line. Blank lines and `#` / `//` comments are skipped.
pub fn load_model_from_text(text: &str, options: LoadOptions) -> Result<Model> {
    let mut model = Model::default();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        match parse_rule(line) {
            Some(rule) => model.add_rule(rule),
            None if options.fail_on_parse_error => {
                bail!("line {}: could not parse rule '{}'", idx + 1, line)
            }
            None => error!(line = idx + 1, rule = %line, "skipping unparseable rule"),
        }
    }
    Ok(model)
}

/// Load `<rule>` and `<multirule>` elements anywhere below the root.
pub fn load_model_from_xml(xml: &str, options: LoadOptions) -> Result<Model> {
    let doc = Document::parse(xml).context("parse model xml")?;
    let root = doc.root_element();
    let mut model = Model::default();

    for node in root.descendants().filter(|n| is_plain_element(n, &["rule"])) {
        match load_rule_element(node) {
            Some(rule) => model.add_rule(rule),
            None if options.fail_on_parse_error => {
                bail!("could not load rule element at {}", doc.text_pos_at(node.range().start))
            }
            None => error!(
                position = %doc.text_pos_at(node.range().start),
                "got no rule for element"
            ),
        }
    }
    for node in root
        .descendants()
        .filter(|n| is_plain_element(n, &["multirule"]))
    {
        model.add_rules(load_multirule_element(node));
    }
    Ok(model)
}

/// A `<rule>` element, either flat text or structured children.
pub fn load_rule_element(node: Node<'_, '_>) -> Option<Rule> {
    let explicit_priority = load_priority(node);
    let qualifier_nodes = children_named(node, &["qualifier", "q"]);
    let action = load_action(node);
    let has_key = !children_named(node, &["key", "k"]).is_empty();

    if qualifier_nodes.is_empty() && action.is_none() && !has_key {
        let text = own_text(node);
        let text = text.trim();
        if text.is_empty() {
            error!("found rule element without recognisable content");
            return None;
        }
        let mut rule = parse_rule(text)?;
        if let Some(value) = explicit_priority {
            rule.set_priority(value);
        }
        return Some(rule);
    }

    let qualifier = load_qualifier(&qualifier_nodes)?;
    let Some(action) = action.or_else(|| load_split_action(node)) else {
        warn!("structured rule has no action");
        return None;
    };
    debug!(action = %action, "loaded structured rule");
    Some(Rule::new(
        qualifier,
        action,
        explicit_priority.unwrap_or(priority::NORMAL),
    ))
}

/// A `<multirule>`: one rule per qualifier, all sharing action and priority.
pub fn load_multirule_element(node: Node<'_, '_>) -> Vec<Rule> {
    let rule_priority = load_priority(node).unwrap_or(priority::NORMAL);
    let Some(action) = load_action(node).or_else(|| load_split_action(node)) else {
        warn!("multirule has no action");
        return Vec::new();
    };
    let qualifier_nodes = children_named(node, &["qualifier", "q"]);
    if qualifier_nodes.is_empty() {
        warn!("multirule has no qualifiers");
        return Vec::new();
    }
    qualifier_nodes
        .into_iter()
        .filter_map(|q| {
            let text = text_content(q);
            match parse_qualifier_text(&text) {
                Ok(qualifier) => Some(Rule::new(qualifier, action.clone(), rule_priority)),
                Err(err) => {
                    error!(qualifier = %text.trim(), error = %err, "could not parse multirule qualifier");
                    None
                }
            }
        })
        .collect()
}

/// Several qualifiers are AND-ed; none means `*true*`.
fn load_qualifier(nodes: &[Node<'_, '_>]) -> Option<Arc<dyn Qualifier>> {
    let mut qualifiers = Vec::with_capacity(nodes.len());
    for node in nodes {
        let text = text_content(*node);
        match parse_qualifier_text(&text) {
            Ok(qualifier) => qualifiers.push(qualifier),
            Err(err) => {
                error!(qualifier = %text.trim(), error = %err, "could not parse rule qualifier");
                return None;
            }
        }
    }
    let qualifier: Arc<dyn Qualifier> = match qualifiers.len() {
        0 => Arc::new(BooleanQualifier::TRUE),
        1 => qualifiers.pop()?,
        _ => Arc::new(CompoundQualifier::and(qualifiers)),
    };
    Some(qualifier)
}

/// `<action>`/`<a>` children; several combine into a compound action.
fn load_action(node: Node<'_, '_>) -> Option<Action> {
    let nodes = children_named(node, &["action", "a"]);
    if nodes.is_empty() {
        return None;
    }
    let mut actions = Vec::with_capacity(nodes.len());
    for child in nodes {
        let class_name = child.attribute("class");
        actions.push(parse_action(&text_content(child), class_name)?);
    }
    if children_named(node, &["key", "k"]).first().is_some() {
        warn!("rule has both 'key' and 'action' elements, using 'action'");
    }
    Some(Action::compound(actions))
}

/// `<key>` plus `<value>` (constant) or `<var:value>` (keypath).
fn load_split_action(node: Node<'_, '_>) -> Option<Action> {
    let key = joined_text(&children_named(node, &["key", "k"]), ".")?;
    if let Some(value) = joined_text(&children_named(node, &["value", "v"]), "") {
        return Some(Action::assignment(key, value));
    }
    let var_nodes: Vec<Node<'_, '_>> = node
        .descendants()
        .filter(|n| n.id() != node.id() && is_var_element(n, &["value", "v"]))
        .collect();
    if let Some(path) = joined_text(&var_nodes, ".") {
        if split_key_path(&path).is_err() {
            error!(key = %key, path = %path, "invalid key path in var:value");
            return None;
        }
        return Some(Action::key_assignment(key, path));
    }
    warn!(key = %key, "did not find value element in rule");
    None
}

/// `priority` attribute, else a `<priority>`/`<p>` child.
fn load_priority(node: Node<'_, '_>) -> Option<i32> {
    if let Some(value) = node.attribute("priority").filter(|v| !v.trim().is_empty()) {
        return Some(parse_priority(value));
    }
    let nodes = children_named(node, &["priority", "p"]);
    if nodes.len() > 1 {
        error!("multiple priorities given for rule, using the first");
    }
    nodes
        .first()
        .map(|child| parse_priority(&text_content(*child)))
}

fn is_plain_element(node: &Node<'_, '_>, names: &[&str]) -> bool {
    node.is_element() && names.contains(&node.tag_name().name()) && element_prefix(node).is_none()
}

fn is_var_element(node: &Node<'_, '_>, names: &[&str]) -> bool {
    node.is_element()
        && names.contains(&node.tag_name().name())
        && element_prefix(node).as_deref() == Some("var")
}

fn element_prefix(node: &Node<'_, '_>) -> Option<String> {
    let namespace = node.tag_name().namespace()?;
    node.lookup_prefix(namespace).map(str::to_string)
}

/// Unprefixed descendant elements named any of `names`.
fn children_named<'a, 'input>(node: Node<'a, 'input>, names: &[&str]) -> Vec<Node<'a, 'input>> {
    node.descendants()
        .filter(|n| n.id() != node.id() && is_plain_element(n, names))
        .collect()
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Text directly inside `node`, skipping child elements such as `<priority>`.
fn own_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Trimmed, non-empty texts joined with `separator` (`.` builds a keypath).
fn joined_text(nodes: &[Node<'_, '_>], separator: &str) -> Option<String> {
    let parts: Vec<String> = nodes
        .iter()
        .map(|node| text_content(*node).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(separator))
}
