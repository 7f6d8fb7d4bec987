//! Normalization of doc-tool JSON into module trees.
//!
//! The tool emits a nested item list per file. `module`/`moduleType` items
//! become modules unless they carry a resolved re-export target, in which
//! case they become aliases; `typeAlias` items always do.

use serde_json::Value;

/// One module's extracted surface
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDoc {
    pub name: String,
    pub qualified_name: String,
    pub types: Vec<TypeDoc>,
    pub values: Vec<ValueDoc>,
    pub aliases: Vec<AliasDoc>,
    pub children: Vec<ModuleDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDoc {
    pub name: String,
    pub kind: Option<String>,
    pub signature: Option<String>,
    pub detail: Value,
}

/// A value binding; `param_count` counts `=>` separators in the signature
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDoc {
    pub name: String,
    pub signature: Option<String>,
    pub param_count: i64,
    pub detail: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    Module,
    Type,
}

impl AliasKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AliasKind::Module => "module",
            AliasKind::Type => "type",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliasDoc {
    pub name: String,
    pub kind: AliasKind,
    pub target_qualified_name: String,
    pub docstrings: Value,
}

/// Parse doc-tool output into root module trees
///
/// # Behavior
/// Accepts either a JSON array of module items or a single object carrying
/// `name` and `items` (treated as one module). Anything else yields no
/// modules.
pub fn parse_module_docs(doc_json: &Value) -> Vec<ModuleDoc> {
    match doc_json {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| parse_module(item, None))
            .collect(),
        Value::Object(map) if map.contains_key("name") && map.contains_key("items") => {
            build_module(doc_json, None).into_iter().collect()
        }
        _ => Vec::new(),
    }
}

fn parse_module(item: &Value, parent_qualified: Option<&str>) -> Option<ModuleDoc> {
    match item.get("kind").and_then(Value::as_str) {
        Some("module") | Some("moduleType") => build_module(item, parent_qualified),
        _ => None,
    }
}

fn build_module(item: &Value, parent_qualified: Option<&str>) -> Option<ModuleDoc> {
    let name = item.get("name").and_then(Value::as_str)?.to_string();
    let qualified_name = match parent_qualified {
        Some(parent) => format!("{}.{}", parent, name),
        None => name.clone(),
    };

    let mut module = ModuleDoc {
        name,
        qualified_name,
        types: Vec::new(),
        values: Vec::new(),
        aliases: Vec::new(),
        children: Vec::new(),
    };

    let children = match item.get("items").and_then(Value::as_array) {
        Some(children) => children,
        None => return Some(module),
    };

    for child in children {
        let child_name = match child.get("name").and_then(Value::as_str) {
            Some(n) => n.to_string(),
            None => continue,
        };
        match child.get("kind").and_then(Value::as_str) {
            Some("type") => {
                let detail = detail_of(child);
                module.types.push(TypeDoc {
                    name: child_name,
                    kind: detail
                        .get("kind")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    signature: child
                        .get("signature")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    detail,
                });
            }
            Some("value") => {
                let signature = child.get("signature").and_then(Value::as_str).unwrap_or("");
                module.values.push(ValueDoc {
                    name: child_name,
                    param_count: signature.matches("=>").count() as i64,
                    signature: if signature.is_empty() {
                        None
                    } else {
                        Some(signature.to_string())
                    },
                    detail: detail_of(child),
                });
            }
            Some("module") | Some("moduleType") => {
                // A resolved `item` payload marks a re-export, not a scope
                // of its own.
                let target = child
                    .get("item")
                    .and_then(Value::as_object)
                    .filter(|payload| !payload.is_empty());
                if let Some(payload) = target {
                    let target_name = payload
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or(&child_name)
                        .to_string();
                    module.aliases.push(AliasDoc {
                        name: child_name,
                        kind: AliasKind::Module,
                        target_qualified_name: target_name,
                        docstrings: docstrings_of(child),
                    });
                } else if let Some(nested) = parse_module(child, Some(&module.qualified_name)) {
                    module.children.push(nested);
                }
            }
            Some("typeAlias") => {
                let target = child
                    .get("signature")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(&child_name)
                    .to_string();
                module.aliases.push(AliasDoc {
                    name: child_name,
                    kind: AliasKind::Type,
                    target_qualified_name: target,
                    docstrings: docstrings_of(child),
                });
            }
            _ => {}
        }
    }

    Some(module)
}

fn detail_of(child: &Value) -> Value {
    match child.get("detail") {
        Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
        Some(detail) => detail.clone(),
    }
}

fn docstrings_of(child: &Value) -> Value {
    match child.get("docstrings") {
        Some(Value::Null) | None => Value::Array(Vec::new()),
        Some(docs) => docs.clone(),
    }
}
