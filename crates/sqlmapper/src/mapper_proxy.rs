//! Mapper-interface dispatch (spec.md §5 "Mapper interface (proxy)"):
//! resolves a method call's arguments into the single parameter object a
//! `MappedStatement` binds against, then reshapes the returned rows to the
//! method's declared return type. Rust has no runtime proxying over trait
//! methods, so there is no dynamic `InvocationHandler` equivalent here —
//! `MapperMethod` is built once per declared method (typically by generated
//! glue pairing a mapper trait with its statement ids) and invoked
//! explicitly.

use sqlmapper_core::{Result, Value};
use sqlmapper_helpers::IndexMap;

use crate::mapped_statement::StatementKind;
use crate::session::SqlSession;

/// Collapses a method's argument list into the single parameter object a
/// statement binds against (spec.md §5 "ParamNameResolver"). Unannotated
/// arguments fall back to positional names `param1`, `param2`, ...
pub struct ParamNameResolver {
    names: Vec<String>,
}

impl ParamNameResolver {
    /// `declared` gives each argument's explicit name (from `@Param` or the
    /// equivalent), in declaration order; `None` means unannotated.
    pub fn new(declared: Vec<Option<String>>) -> Self {
        let names = declared
            .into_iter()
            .enumerate()
            .map(|(i, name)| name.unwrap_or_else(|| format!("param{}", i + 1)))
            .collect();
        Self { names }
    }

    /// A lone unannotated argument is passed through as the bare parameter
    /// object. Otherwise every argument is keyed both by its resolved name
    /// and its positional `paramN` alias, so `#{name}` and `#{param1}` both
    /// resolve regardless of which the caller used.
    pub fn resolve(&self, args: Vec<Value>) -> Value {
        if args.len() == 1 && self.names.first().map(String::as_str) == Some("param1") {
            return args.into_iter().next().expect("checked len == 1");
        }
        let mut map = IndexMap::default();
        for (index, value) in args.into_iter().enumerate() {
            let positional = format!("param{}", index + 1);
            if let Some(name) = self.names.get(index) {
                if *name != positional {
                    map.insert(name.clone(), value.clone());
                }
            }
            map.insert(positional, value);
        }
        Value::Map(map)
    }
}

/// The statement a mapper method dispatches to.
pub struct SqlCommand {
    pub statement_id: String,
    pub kind: StatementKind,
}

/// How a mapper method's return type reshapes the rows a `SELECT` produces
/// (spec.md §5 "return-type reshaping"). `Cursor` is a supplemented variant
/// (SPEC_FULL.md §3): a mapper method declared to return a cursor should
/// call `SqlSession::select_cursor` directly to get the real lazily-pulled
/// `ResultCursor` iterator, since that type can't be boxed into the `Value`
/// every other shape here returns. `MapperMethod::execute`'s generic,
/// uniformly-`Value`-returning dispatch table still folds `Cursor` into
/// `Many` for that reason — it materializes the same rows a cursor would
/// stream, just eagerly.
#[derive(Debug, Clone)]
pub enum ReturnShape {
    Void,
    One,
    Many,
    MapKeyed(String),
    Cursor,
}

pub struct MethodSignature {
    pub return_shape: ReturnShape,
}

pub struct MapperMethod {
    command: SqlCommand,
    signature: MethodSignature,
    param_resolver: ParamNameResolver,
}

impl MapperMethod {
    pub fn new(command: SqlCommand, signature: MethodSignature, param_resolver: ParamNameResolver) -> Self {
        Self {
            command,
            signature,
            param_resolver,
        }
    }

    pub fn execute(&self, session: &SqlSession, args: Vec<Value>) -> Result<Value> {
        let mut parameter = self.param_resolver.resolve(args);
        match self.command.kind {
            StatementKind::Insert => Ok(Value::Int(session.insert(&self.command.statement_id, &mut parameter)? as i64)),
            StatementKind::Update => Ok(Value::Int(session.update(&self.command.statement_id, &mut parameter)? as i64)),
            StatementKind::Delete => Ok(Value::Int(session.delete(&self.command.statement_id, &mut parameter)? as i64)),
            StatementKind::Select => self.execute_select(session, parameter),
            StatementKind::Flush => {
                let results = session.flush_statements()?;
                let counts = results.into_iter().map(|r| Value::Int(r.update_counts.iter().sum())).collect();
                Ok(Value::List(counts))
            }
        }
    }

    fn execute_select(&self, session: &SqlSession, parameter: Value) -> Result<Value> {
        match &self.signature.return_shape {
            ReturnShape::Void => {
                session.select_list(&self.command.statement_id, parameter)?;
                Ok(Value::Null)
            }
            ReturnShape::One => session.select_one(&self.command.statement_id, parameter),
            ReturnShape::Many | ReturnShape::Cursor => {
                let rows = session.select_list(&self.command.statement_id, parameter)?;
                Ok(Value::List(rows))
            }
            ReturnShape::MapKeyed(key_property) => session.select_map(&self.command.statement_id, parameter, key_property),
        }
    }
}
