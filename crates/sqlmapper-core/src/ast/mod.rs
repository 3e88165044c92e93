//! The SQL-node AST (spec.md §3/§4.1): `SqlNode` is a sum type, each variant
//! implementing `apply(context)` which evaluates the node against a
//! [`DynamicContext`] and reports whether it produced any content.

pub mod context;
pub mod expr;

use enum_dispatch::enum_dispatch;
use fancy_regex::Regex;

pub use context::DynamicContext;

use crate::token_parser;
use crate::value::Value;

#[enum_dispatch(SqlNodeApply)]
#[derive(Debug, Clone)]
pub enum SqlNode {
    Static(StaticNode),
    Text(TextNode),
    If(IfNode),
    Choose(ChooseNode),
    Trim(TrimNode),
    Foreach(ForeachNode),
    VarDecl(VarDeclNode),
    Mixed(MixedNode),
}

#[enum_dispatch]
pub trait SqlNodeApply {
    /// Evaluates this node against `ctx`, appending to its SQL buffer.
    /// Returns whether it produced any non-whitespace content.
    fn apply(&self, ctx: &mut DynamicContext) -> bool;
}

/// Literal text with no `${}` substitution.
#[derive(Debug, Clone)]
pub struct StaticNode {
    pub text: String,
}

impl SqlNodeApply for StaticNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        ctx.append_sql(&self.text);
        !self.text.trim().is_empty()
    }
}

/// Text carrying `${}` substitutions (spec.md: "substitution is textual,
/// not parameterized").
#[derive(Debug, Clone)]
pub struct TextNode {
    pub text: String,
    pub injection_filter: Option<String>,
}

impl SqlNodeApply for TextNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        let filter = self
            .injection_filter
            .as_deref()
            .and_then(|pattern| Regex::new(pattern).ok());
        // `${}` resolution only ever reads bindings, so clone them up front
        // rather than borrow `ctx` across the token-parser closure.
        let bindings = ctx.bindings().clone();
        let resolved = token_parser::parse(&self.text, "${", "}", &mut |expr: &str| {
            let value = expr::eval_path(expr, &bindings);
            let rendered = value.render();
            match &filter {
                Some(re) if !re.is_match(&rendered).unwrap_or(false) => {
                    log::warn!("rejected ${{}} substitution for {expr:?}: failed injection filter");
                    String::new()
                }
                _ => rendered,
            }
        });
        ctx.append_sql(&resolved);
        !resolved.trim().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct IfNode {
    pub test: String,
    pub body: Box<SqlNode>,
}

impl SqlNodeApply for IfNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        if expr::eval_bool(&self.test, ctx.bindings()) {
            self.body.apply(ctx)
        } else {
            false
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChooseNode {
    pub whens: Vec<(String, SqlNode)>,
    pub otherwise: Option<Box<SqlNode>>,
}

impl SqlNodeApply for ChooseNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        for (test, body) in &self.whens {
            if expr::eval_bool(test, ctx.bindings()) {
                return body.apply(ctx);
            }
        }
        match &self.otherwise {
            Some(body) => body.apply(ctx),
            None => false,
        }
    }
}

/// `<trim>`, and the `<where>`/`<set>` shorthands built from it (spec.md
/// §3/§4.1).
#[derive(Debug, Clone)]
pub struct TrimNode {
    pub body: Box<SqlNode>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub prefix_overrides: Vec<String>,
    pub suffix_overrides: Vec<String>,
}

impl TrimNode {
    pub fn where_trim(body: SqlNode) -> Self {
        Self {
            body: Box::new(body),
            prefix: Some("WHERE".to_string()),
            suffix: None,
            prefix_overrides: ["AND ", "OR ", "AND\n", "OR\n", "AND\t", "OR\t"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            suffix_overrides: Vec::new(),
        }
    }

    pub fn set_trim(body: SqlNode) -> Self {
        Self {
            body: Box::new(body),
            prefix: Some("SET".to_string()),
            suffix: None,
            prefix_overrides: Vec::new(),
            suffix_overrides: vec![",".to_string()],
        }
    }
}

impl SqlNodeApply for TrimNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        let body_text = ctx.capture(|ctx| {
            self.body.apply(ctx);
        });
        let trimmed = apply_trim_policy(
            &body_text,
            &self.prefix_overrides,
            &self.suffix_overrides,
        );
        if trimmed.is_empty() {
            return false;
        }
        let mut out = String::new();
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(&trimmed);
        if let Some(suffix) = &self.suffix {
            out.push(' ');
            out.push_str(suffix);
        }
        ctx.append_sql(&out);
        true
    }
}

/// Case-insensitive prefix/suffix override stripping, applied once each
/// (spec.md §4.1): "strip the *first* matching override prefix"/"suffix".
fn apply_trim_policy(body_text: &str, prefix_overrides: &[String], suffix_overrides: &[String]) -> String {
    let mut trimmed = body_text.trim().to_string();
    if trimmed.is_empty() {
        return trimmed;
    }
    if !prefix_overrides.is_empty() {
        let upper = trimmed.to_uppercase();
        for ov in prefix_overrides {
            if upper.starts_with(&ov.to_uppercase()) {
                trimmed = trimmed[ov.len()..].to_string();
                break;
            }
        }
    }
    if !suffix_overrides.is_empty() {
        let upper = trimmed.to_uppercase();
        for ov in suffix_overrides {
            if upper.ends_with(&ov.to_uppercase()) {
                let cut = trimmed.len() - ov.len();
                trimmed.truncate(cut);
                break;
            }
        }
    }
    trimmed.trim().to_string()
}

#[derive(Debug, Clone)]
pub struct ForeachNode {
    pub collection: String,
    pub item: Option<String>,
    pub index: Option<String>,
    pub open: Option<String>,
    pub close: Option<String>,
    pub separator: Option<String>,
    pub body: Box<SqlNode>,
}

impl SqlNodeApply for ForeachNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        let collection = expr::eval_path(&self.collection, ctx.bindings());
        let Some(items) = collection.iter_collection() else {
            return false;
        };
        if items.is_empty() {
            return false;
        }

        let item_name = self.item.as_deref().unwrap_or("item");
        let index_name = self.index.as_deref().unwrap_or("index");

        let mut pieces = Vec::with_capacity(items.len());
        for (index_value, item_value) in items {
            let n = ctx.next_unique_number();
            ctx.bind(item_name, item_value);
            ctx.bind(index_name, index_value);
            let rendered = ctx.capture(|ctx| {
                self.body.apply(ctx);
            });
            pieces.push(rewrite_foreach_placeholders(
                &rendered, item_name, index_name, n,
            ));
        }
        ctx.unbind(item_name);
        ctx.unbind(index_name);

        let mut out = String::new();
        if let Some(open) = &self.open {
            out.push_str(open);
        }
        let separator = self.separator.as_deref().unwrap_or("");
        out.push_str(&pieces.join(separator));
        if let Some(close) = &self.close {
            out.push_str(close);
        }
        ctx.append_sql(&out);
        true
    }
}

/// Rewrites bare `#{item}`/`#{index}` tokens (and dotted `#{item.prop}`
/// forms) inside one loop iteration's rendered body to the unique
/// `#{__frch_item_N}` / `#{__frch_index_N}` form (spec.md §3/§4.1), so the
/// SQL-source builder can mint one `ParameterMapping` per iteration.
fn rewrite_foreach_placeholders(rendered: &str, item: &str, index: &str, n: u32) -> String {
    let item_repl = format!("__frch_{item}_{n}");
    let index_repl = format!("__frch_{index}_{n}");
    token_parser::parse(rendered, "#{", "}", &mut |content: &str| {
        let (path, rest) = match content.find(',') {
            Some(at) => (content[..at].trim(), &content[at..]),
            None => (content.trim(), ""),
        };
        let new_path = if path == item {
            item_repl.clone()
        } else if let Some(suffix) = path.strip_prefix(&format!("{item}.")) {
            format!("{item_repl}.{suffix}")
        } else if path == index {
            index_repl.clone()
        } else if let Some(suffix) = path.strip_prefix(&format!("{index}.")) {
            format!("{index_repl}.{suffix}")
        } else {
            path.to_string()
        };
        format!("#{{{new_path}{rest}}}")
    })
}

/// `<bind name="..." value="..."/>`: binds a derived value into the
/// context without emitting SQL text.
#[derive(Debug, Clone)]
pub struct VarDeclNode {
    pub name: String,
    pub expr: String,
}

impl SqlNodeApply for VarDeclNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        let value = expr::eval_path(&self.expr, ctx.bindings());
        ctx.bind(&self.name, value);
        false
    }
}

#[derive(Debug, Clone, Default)]
pub struct MixedNode {
    pub children: Vec<SqlNode>,
}

impl SqlNodeApply for MixedNode {
    fn apply(&self, ctx: &mut DynamicContext) -> bool {
        let mut produced = false;
        for child in &self.children {
            produced |= child.apply(ctx);
        }
        produced
    }
}

/// Whether `node` (or any descendant) is dynamic, i.e. its output can vary
/// per invocation. A tree containing only [`StaticNode`]/[`MixedNode`] of
/// statics can be compiled once at load time (spec.md §3/§4.1 "raw/dynamic
/// dichotomy").
pub fn is_dynamic(node: &SqlNode) -> bool {
    match node {
        SqlNode::Static(_) => false,
        SqlNode::Mixed(m) => m.children.iter().any(is_dynamic),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmapper_helpers::IndexMap;

    fn run(node: &SqlNode, parameter: Value) -> String {
        let mut ctx = DynamicContext::new(parameter, None);
        node.apply(&mut ctx);
        ctx.into_sql()
    }

    fn map(entries: &[(&str, Value)]) -> Value {
        let mut m = IndexMap::default();
        for (k, v) in entries {
            m.insert((*k).to_string(), v.clone());
        }
        Value::Map(m)
    }

    #[test]
    fn where_with_all_if_false_is_empty() {
        let node = SqlNode::Trim(TrimNode::where_trim(SqlNode::Mixed(MixedNode {
            children: vec![SqlNode::If(IfNode {
                test: "flag == true".into(),
                body: Box::new(SqlNode::Static(StaticNode {
                    text: "AND x = 1".into(),
                })),
            })],
        })));
        let sql = run(&node, map(&[("flag", Value::Bool(false))]));
        assert_eq!(sql, "");
    }

    #[test]
    fn where_strips_leading_and_once() {
        let node = SqlNode::Trim(TrimNode::where_trim(SqlNode::Static(StaticNode {
            text: "AND id = 1".into(),
        })));
        let sql = run(&node, Value::Null);
        assert_eq!(sql, "WHERE id = 1");
    }

    #[test]
    fn set_strips_trailing_comma() {
        let node = SqlNode::Trim(TrimNode::set_trim(SqlNode::Static(StaticNode {
            text: "name = 'a',".into(),
        })));
        let sql = run(&node, Value::Null);
        assert_eq!(sql, "SET name = 'a'");
    }

    #[test]
    fn foreach_over_list_rewrites_placeholders() {
        let node = SqlNode::Foreach(ForeachNode {
            collection: "list".into(),
            item: Some("x".into()),
            index: None,
            open: None,
            close: None,
            separator: Some(",".into()),
            body: Box::new(SqlNode::Static(StaticNode {
                text: "#{x}".into(),
            })),
        });
        let mut ctx = DynamicContext::new(
            map(&[(
                "list",
                Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            )]),
            None,
        );
        node.apply(&mut ctx);
        assert_eq!(ctx.sql(), "#{__frch_x_0},#{__frch_x_1},#{__frch_x_2}");
    }

    #[test]
    fn choose_picks_first_matching_when() {
        let node = SqlNode::Choose(ChooseNode {
            whens: vec![
                (
                    "a == 1".into(),
                    SqlNode::Static(StaticNode { text: "A".into() }),
                ),
                (
                    "a == 2".into(),
                    SqlNode::Static(StaticNode { text: "B".into() }),
                ),
            ],
            otherwise: Some(Box::new(SqlNode::Static(StaticNode {
                text: "C".into(),
            }))),
        });
        assert_eq!(run(&node, map(&[("a", Value::Int(2))])), "B");
        assert_eq!(run(&node, map(&[("a", Value::Int(9))])), "C");
    }

    #[test]
    fn text_node_substitutes_dollar_tokens() {
        let node = SqlNode::Text(TextNode {
            text: "ORDER BY ${col}".into(),
            injection_filter: None,
        });
        assert_eq!(
            run(&node, map(&[("col", Value::from("name"))])),
            "ORDER BY name"
        );
    }

    #[test]
    fn injection_filter_rejects_substitution() {
        let node = SqlNode::Text(TextNode {
            text: "ORDER BY ${col}".into(),
            injection_filter: Some("^[a-zA-Z_]+$".into()),
        });
        assert_eq!(
            run(&node, map(&[("col", Value::from("name; DROP TABLE t"))])),
            "ORDER BY "
        );
    }
}
