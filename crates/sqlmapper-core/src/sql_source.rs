//! `SqlSource` (spec.md §3/§4.1): turns AST-evaluated SQL text into a
//! `?`-form executable statement plus its ordered [`ParameterMapping`]s.

use std::sync::Arc;

use crate::ast::{self, DynamicContext, SqlNode, SqlNodeApply as _};
use crate::parameter::{self, ParameterMapping};
use crate::token_parser;
use crate::value::Value;

/// The `?`-form SQL plus its parameter bindings — spec.md's "BoundSql".
#[derive(Debug, Clone)]
pub struct BoundSql {
    pub sql: String,
    pub parameter_mappings: Vec<ParameterMapping>,
}

#[derive(Debug, Clone)]
struct StaticTemplate {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

/// A compiled SQL template: built once at load time when the underlying
/// AST has no dynamic nodes ("Raw"), or re-evaluated against the parameter
/// object on every invocation ("Dynamic") — spec.md §3/§4.1's
/// raw/dynamic dichotomy.
#[derive(Debug, Clone)]
pub enum SqlSource {
    Static(StaticTemplate),
    Dynamic(Arc<SqlNode>),
}

impl SqlSource {
    /// Compiles `ast` into an `SqlSource`, evaluating it eagerly when it
    /// contains no dynamic node.
    pub fn from_ast(ast: SqlNode) -> Self {
        if ast::is_dynamic(&ast) {
            SqlSource::Dynamic(Arc::new(ast))
        } else {
            let mut ctx = DynamicContext::new(Value::Null, None);
            ast.apply(&mut ctx);
            SqlSource::Static(build_static_template(&ctx.into_sql()))
        }
    }

    /// A pre-built `?`-form SQL string with no AST behind it at all —
    /// useful for tests and for statements with no dynamic tags at all in
    /// their source text.
    pub fn from_text(sql_text: &str) -> Self {
        SqlSource::Static(build_static_template(sql_text))
    }

    pub fn get_bound_sql(&self, parameter: &Value, database_id: Option<&str>) -> BoundSql {
        match self {
            SqlSource::Static(template) => BoundSql {
                sql: template.sql.clone(),
                parameter_mappings: template.parameter_mappings.clone(),
            },
            SqlSource::Dynamic(ast) => {
                let mut ctx = DynamicContext::new(parameter.clone(), database_id);
                ast.apply(&mut ctx);
                build_static_template(&ctx.into_sql())
            }
        }
    }
}

fn build_static_template(text: &str) -> StaticTemplate {
    let mut mappings = Vec::new();
    let sql = token_parser::parse(text, "#{", "}", &mut |content: &str| {
        mappings.push(parameter::parse_placeholder(content));
        "?".to_string()
    });
    StaticTemplate {
        sql,
        parameter_mappings: mappings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{IfNode, MixedNode, StaticNode};

    #[test]
    fn static_text_rewrites_placeholders_at_load_time() {
        let source = SqlSource::from_text("select * from t where id = #{id}");
        let bound = source.get_bound_sql(&Value::Null, None);
        assert_eq!(bound.sql, "select * from t where id = ?");
        assert_eq!(bound.parameter_mappings.len(), 1);
        assert_eq!(bound.parameter_mappings[0].property, "id");
    }

    #[test]
    fn dynamic_ast_is_re_evaluated_per_call() {
        let ast = SqlNode::Mixed(MixedNode {
            children: vec![SqlNode::If(IfNode {
                test: "flag == true".into(),
                body: Box::new(SqlNode::Static(StaticNode {
                    text: "and id = #{id}".into(),
                })),
            })],
        });
        let source = SqlSource::from_ast(ast);
        assert!(matches!(source, SqlSource::Dynamic(_)));

        let mut params = sqlmapper_helpers::IndexMap::default();
        params.insert("flag".to_string(), Value::Bool(true));
        params.insert("id".to_string(), Value::Int(1));
        let bound = source.get_bound_sql(&Value::Map(params.clone()), None);
        assert_eq!(bound.sql, "and id = ?");

        params.insert("flag".to_string(), Value::Bool(false));
        let bound = source.get_bound_sql(&Value::Map(params), None);
        assert_eq!(bound.sql, "");
    }

    #[test]
    fn non_dynamic_ast_compiles_to_static_at_load_time() {
        let ast = SqlNode::Static(StaticNode {
            text: "select 1".into(),
        });
        let source = SqlSource::from_ast(ast);
        assert!(matches!(source, SqlSource::Static(_)));
    }
}
