//! `MetaObject` capability (spec.md §9 "Runtime reflection on beans"):
//! encapsulates bean/property access behind `{hasGetter, hasSetter,
//! getterType, setterType, get, set, addAll}` so the rest of the crate never
//! performs host-language reflection directly. Since this crate has no
//! runtime reflection to fall back on, every "bean" is represented as a
//! [`Value::Map`], and `MetaObject` just knows how to walk a dot-notation
//! property path over it.

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Map,
    List,
}

impl ValueKind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Map(_) => ValueKind::Map,
            Value::List(_) => ValueKind::List,
        }
    }
}

/// A borrowing view over a [`Value`] that exposes property-path access.
pub struct MetaObject<'a> {
    root: &'a Value,
}

impl<'a> MetaObject<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    pub fn has_getter(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn getter_type(&self, path: &str) -> Option<ValueKind> {
        self.get(path).map(ValueKind::of)
    }

    /// Resolves a dot-notation path (e.g. `"address.city"`) against the
    /// root value. Indexing into a `List` is written `items[0]`.
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        let mut current = self.root;
        for segment in path.split('.') {
            current = resolve_segment(current, segment)?;
        }
        Some(current)
    }
}

fn resolve_segment<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    let (name, index) = split_index(segment);
    let named = match value {
        Value::Map(map) => map.get(name)?,
        _ if name.is_empty() => value,
        _ => return None,
    };
    match index {
        Some(i) => match named {
            Value::List(items) => items.get(i),
            _ => None,
        },
        None => Some(named),
    }
}

fn split_index(segment: &str) -> (&str, Option<usize>) {
    if let Some(open) = segment.find('[') {
        if let Some(close) = segment.find(']') {
            let name = &segment[..open];
            let idx = segment[open + 1..close].parse::<usize>().ok();
            return (name, idx);
        }
    }
    (segment, None)
}

/// A mutable counterpart used by generated-key write-back and result
/// materialization, where we build up a property bag rather than read one.
pub struct MetaObjectMut<'a> {
    root: &'a mut Value,
}

impl<'a> MetaObjectMut<'a> {
    pub fn new(root: &'a mut Value) -> Self {
        Self { root }
    }

    pub fn has_setter(&self, _path: &str) -> bool {
        true
    }

    /// Sets a dot-notation path, creating intermediate maps as needed.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut current = self.root_as_map();
        let segments: Vec<&str> = path.split('.').collect();
        for segment in &segments[..segments.len() - 1] {
            current = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Map(Default::default()))
                .as_map_mut();
        }
        current.insert(segments[segments.len() - 1].to_string(), value);
    }

    fn root_as_map(&mut self) -> &mut sqlmapper_helpers::IndexMap<String, Value> {
        self.root.as_map_mut()
    }

    /// Extends a `List`-typed root with rows produced for a `<collection>`
    /// nested result map, creating the list if it is currently `Null`.
    pub fn add_all(&mut self, path: &str, items: impl IntoIterator<Item = Value>) {
        let mut current = self.root_as_map();
        let segments: Vec<&str> = path.split('.').collect();
        for segment in &segments[..segments.len() - 1] {
            current = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Map(Default::default()))
                .as_map_mut();
        }
        let slot = current
            .entry(segments[segments.len() - 1].to_string())
            .or_insert_with(|| Value::List(Vec::new()));
        if let Value::List(list) = slot {
            list.extend(items);
        }
    }
}

impl Value {
    fn as_map_mut(&mut self) -> &mut sqlmapper_helpers::IndexMap<String, Value> {
        if !matches!(self, Value::Map(_)) {
            *self = Value::Map(Default::default());
        }
        match self {
            Value::Map(map) => map,
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmapper_helpers::IndexMap;

    fn bean() -> Value {
        let mut address = IndexMap::default();
        address.insert("city".to_string(), Value::from("Springfield"));
        let mut root = IndexMap::default();
        root.insert("id".to_string(), Value::Int(1));
        root.insert("address".to_string(), Value::Map(address));
        root.insert(
            "tags".to_string(),
            Value::List(vec![Value::from("a"), Value::from("b")]),
        );
        Value::Map(root)
    }

    #[test]
    fn nested_path_get() {
        let value = bean();
        let meta = MetaObject::new(&value);
        assert_eq!(meta.get("address.city").unwrap().as_str(), Some("Springfield"));
        assert!(meta.has_getter("id"));
        assert!(!meta.has_getter("missing"));
    }

    #[test]
    fn list_index_get() {
        let value = bean();
        let meta = MetaObject::new(&value);
        assert_eq!(meta.get("tags[1]").unwrap().as_str(), Some("b"));
    }

    #[test]
    fn set_creates_intermediate_maps() {
        let mut value = Value::Map(Default::default());
        let mut meta = MetaObjectMut::new(&mut value);
        meta.set("keys.id", Value::Int(42));
        let meta = MetaObject::new(&value);
        assert_eq!(meta.get("keys.id").unwrap().as_i64(), Some(42));
    }

    #[test]
    fn add_all_extends_list() {
        let mut value = Value::Map(Default::default());
        let mut meta = MetaObjectMut::new(&mut value);
        meta.add_all("comments", vec![Value::from("x")]);
        meta.add_all("comments", vec![Value::from("y")]);
        let meta = MetaObject::new(&value);
        match meta.get("comments").unwrap() {
            Value::List(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected list"),
        }
    }
}
