//! [`ParameterMapping`] (spec.md §3): the descriptor behind one `#{...}`
//! placeholder.

use std::sync::Arc;

use crate::type_handler::TypeHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    In,
    Out,
    InOut,
}

impl Default for ParamMode {
    fn default() -> Self {
        ParamMode::In
    }
}

/// The host/JDBC type pairing used to pick a [`TypeHandler`] when none is
/// named explicitly on the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JdbcType {
    Integer,
    BigInt,
    Real,
    Double,
    Varchar,
    Boolean,
    Timestamp,
    Binary,
    Other(String),
}

#[derive(Clone)]
pub struct ParameterMapping {
    /// Dot-notation property path into the parameter object.
    pub property: String,
    pub jdbc_type: Option<JdbcType>,
    pub mode: ParamMode,
    pub type_handler: Option<Arc<dyn TypeHandler>>,
    pub numeric_scale: Option<u32>,
    /// OUT-cursor result map id, only meaningful with `mode == Out`.
    pub result_map_id: Option<String>,
}

impl std::fmt::Debug for ParameterMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterMapping")
            .field("property", &self.property)
            .field("jdbc_type", &self.jdbc_type)
            .field("mode", &self.mode)
            .field("numeric_scale", &self.numeric_scale)
            .field("result_map_id", &self.result_map_id)
            .finish()
    }
}

impl ParameterMapping {
    pub fn simple(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            jdbc_type: None,
            mode: ParamMode::In,
            type_handler: None,
            numeric_scale: None,
            result_map_id: None,
        }
    }
}

/// Parses the `property[,opt=val]*` content of a `#{...}` token (spec.md
/// §4.1's SQL-source builder). Unknown options are ignored rather than
/// rejected, matching the forgiving posture of the embedded dialects this
/// stands in for.
pub fn parse_placeholder(content: &str) -> ParameterMapping {
    let mut parts = content.split(',');
    let property = parts.next().unwrap_or_default().trim().to_string();
    let mut mapping = ParameterMapping::simple(property);

    for opt in parts {
        let opt = opt.trim();
        let Some((key, value)) = opt.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "mode" => {
                mapping.mode = match value {
                    "OUT" => ParamMode::Out,
                    "INOUT" => ParamMode::InOut,
                    _ => ParamMode::In,
                };
            }
            "jdbcType" => mapping.jdbc_type = Some(parse_jdbc_type(value)),
            "numericScale" => mapping.numeric_scale = value.parse().ok(),
            "resultMap" => mapping.result_map_id = Some(value.to_string()),
            _ => {}
        }
    }
    mapping
}

fn parse_jdbc_type(value: &str) -> JdbcType {
    match value.to_ascii_uppercase().as_str() {
        "INTEGER" | "INT" => JdbcType::Integer,
        "BIGINT" => JdbcType::BigInt,
        "REAL" | "FLOAT" => JdbcType::Real,
        "DOUBLE" => JdbcType::Double,
        "VARCHAR" | "CHAR" => JdbcType::Varchar,
        "BOOLEAN" | "BIT" => JdbcType::Boolean,
        "TIMESTAMP" | "DATE" => JdbcType::Timestamp,
        "BINARY" | "VARBINARY" | "BLOB" => JdbcType::Binary,
        other => JdbcType::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_property() {
        let m = parse_placeholder("id");
        assert_eq!(m.property, "id");
        assert_eq!(m.mode, ParamMode::In);
    }

    #[test]
    fn parses_options() {
        let m = parse_placeholder("id, jdbcType=INTEGER, mode=OUT, numericScale=2");
        assert_eq!(m.property, "id");
        assert_eq!(m.jdbc_type, Some(JdbcType::Integer));
        assert_eq!(m.mode, ParamMode::Out);
        assert_eq!(m.numeric_scale, Some(2));
    }
}
