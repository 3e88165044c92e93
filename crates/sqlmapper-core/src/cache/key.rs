//! [`CacheKey`]: an order-sensitive digest over the pieces that identify one
//! cached query invocation — statement id, bounds, offset/limit, the bound
//! parameter values and (when relevant) the environment id (spec.md §3).

use crate::value::Value;

const MULTIPLIER: i64 = 37;
const SEED: i64 = 17;

#[derive(Debug, Clone)]
pub struct CacheKey {
    hash_code: i64,
    checksum: i64,
    count: i32,
    updates: Vec<Value>,
}

impl CacheKey {
    pub fn new() -> Self {
        Self {
            hash_code: SEED,
            checksum: 0,
            count: 0,
            updates: Vec::new(),
        }
    }

    /// Folds one more identity piece into the key, in order. Order matters:
    /// `update(a); update(b)` is a different key from `update(b); update(a)`.
    pub fn update(&mut self, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        let mut base_hash = value_hash(&value);
        self.count += 1;
        self.checksum = self.checksum.wrapping_add(base_hash);
        base_hash = base_hash.wrapping_mul(self.count as i64);
        self.hash_code = self.hash_code.wrapping_mul(MULTIPLIER).wrapping_add(base_hash);
        self.updates.push(value);
        self
    }

    pub fn updates(&self) -> &[Value] {
        &self.updates
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash_code == other.hash_code
            && self.checksum == other.checksum
            && self.count == other.count
            && self.updates == other.updates
    }
}

impl Eq for CacheKey {}

impl std::hash::Hash for CacheKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash_code.hash(state);
    }
}

/// A Java-`Object.hashCode`-style combinator, extended to `Value::List` so
/// that two keys built from structurally equal arrays hash identically
/// regardless of how those arrays were constructed (spec.md testable
/// property: "arrays ... compared element-wise").
fn value_hash(value: &Value) -> i64 {
    match value {
        Value::Null => 1,
        Value::Bool(b) => {
            if *b {
                1231
            } else {
                1237
            }
        }
        Value::Int(i) => *i,
        Value::Float(f) => f.to_bits() as i64,
        Value::Str(s) => s.chars().fold(0i64, |h, c| h.wrapping_mul(31).wrapping_add(c as i64)),
        Value::Bytes(b) => b.iter().fold(0i64, |h, byte| h.wrapping_mul(31).wrapping_add(*byte as i64)),
        Value::List(items) => items
            .iter()
            .fold(1i64, |h, item| h.wrapping_mul(31).wrapping_add(value_hash(item))),
        Value::Map(map) => map.iter().fold(0i64, |h, (k, v)| {
            h.wrapping_add(value_hash(&Value::Str(k.clone())) ^ value_hash(v))
        }),
    }
}
