//! JSON patch (RFC 6902 subset: add, remove, replace) used for partial
//! updates of threads and resolution statuses.

use crate::error::{FeedError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } | PatchOp::Remove { path } | PatchOp::Replace { path, .. } => {
                path
            }
        }
    }
}

fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Operations turning `from` into `to`.
pub fn diff(from: &Value, to: &Value) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_at("", from, to, &mut ops);
    ops
}

fn diff_at(path: &str, from: &Value, to: &Value, ops: &mut Vec<PatchOp>) {
    if from == to {
        return;
    }
    match (from, to) {
        (Value::Object(a), Value::Object(b)) => {
            for (k, av) in a {
                let p = format!("{path}/{}", escape(k));
                match b.get(k) {
                    Some(bv) => diff_at(&p, av, bv, ops),
                    None => ops.push(PatchOp::Remove { path: p }),
                }
            }
            for (k, bv) in b {
                if !a.contains_key(k) {
                    ops.push(PatchOp::Add {
                        path: format!("{path}/{}", escape(k)),
                        value: bv.clone(),
                    });
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let common = a.len().min(b.len());
            for i in 0..common {
                diff_at(&format!("{path}/{i}"), &a[i], &b[i], ops);
            }
            // Trailing removals run back to front so indexes stay valid.
            for i in (common..a.len()).rev() {
                ops.push(PatchOp::Remove {
                    path: format!("{path}/{i}"),
                });
            }
            for (i, v) in b.iter().enumerate().skip(common) {
                ops.push(PatchOp::Add {
                    path: format!("{path}/{i}"),
                    value: v.clone(),
                });
            }
        }
        _ => ops.push(PatchOp::Replace {
            path: path.to_string(),
            value: to.clone(),
        }),
    }
}

fn bad(op: &PatchOp, why: &str) -> FeedError {
    FeedError::Validation(format!("cannot apply patch at '{}': {why}", op.path()))
}

/// Apply `ops` in order. On error `doc` may be partially patched, so callers
/// patch a copy.
pub fn apply(doc: &mut Value, ops: &[PatchOp]) -> Result<()> {
    for op in ops {
        apply_one(doc, op)?;
    }
    Ok(())
}

fn apply_one(doc: &mut Value, op: &PatchOp) -> Result<()> {
    let path = op.path();
    if path.is_empty() {
        return match op {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                *doc = value.clone();
                Ok(())
            }
            PatchOp::Remove { .. } => Err(bad(op, "cannot remove the root")),
        };
    }
    let Some(rest) = path.strip_prefix('/') else {
        return Err(bad(op, "pointer must start with '/'"));
    };
    let tokens: Vec<String> = rest.split('/').map(unescape).collect();
    let (last, parents) = tokens
        .split_last()
        .ok_or_else(|| bad(op, "empty pointer"))?;

    let mut target = doc;
    for t in parents {
        target = match target {
            Value::Object(map) => map.get_mut(t.as_str()),
            Value::Array(items) => t.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| bad(op, "parent does not exist"))?;
    }

    match (target, op) {
        (Value::Object(map), PatchOp::Add { value, .. }) => {
            map.insert(last.clone(), value.clone());
        }
        (Value::Object(map), PatchOp::Replace { value, .. }) => {
            let slot = map
                .get_mut(last.as_str())
                .ok_or_else(|| bad(op, "member does not exist"))?;
            *slot = value.clone();
        }
        (Value::Object(map), PatchOp::Remove { .. }) => {
            map.remove(last.as_str())
                .ok_or_else(|| bad(op, "member does not exist"))?;
        }
        (Value::Array(items), PatchOp::Add { value, .. }) => {
            let idx = if last == "-" {
                items.len()
            } else {
                last.parse::<usize>().map_err(|_| bad(op, "bad index"))?
            };
            if idx > items.len() {
                return Err(bad(op, "index out of bounds"));
            }
            items.insert(idx, value.clone());
        }
        (Value::Array(items), PatchOp::Replace { value, .. }) => {
            let idx = last.parse::<usize>().map_err(|_| bad(op, "bad index"))?;
            let slot = items
                .get_mut(idx)
                .ok_or_else(|| bad(op, "index out of bounds"))?;
            *slot = value.clone();
        }
        (Value::Array(items), PatchOp::Remove { .. }) => {
            let idx = last.parse::<usize>().map_err(|_| bad(op, "bad index"))?;
            if idx >= items.len() {
                return Err(bad(op, "index out of bounds"));
            }
            items.remove(idx);
        }
        _ => return Err(bad(op, "parent is not a container")),
    }
    Ok(())
}
