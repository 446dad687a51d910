use crate::engine::types::Context;

/// Interpolate `${ctx.key}` and `${ctx.nested.key}` patterns in a string.
pub fn interpolate_ctx(template: &str, ctx: &Context) -> String {
    let mut result = template.to_string();
    let mut start = 0;

    loop {
        let open = match result[start..].find("${ctx.") {
            Some(pos) => start + pos,
            None => break,
        };

        let close = match result[open..].find('}') {
            Some(pos) => open + pos,
            None => break,
        };

        let path = &result[open + 6..close]; // skip "${ctx."
        let value = resolve_path(path, ctx);

        result.replace_range(open..=close, &value);
        start = open + value.len();
    }

    result
}

/// Recursively interpolate all string values within a JSON value.
pub fn interpolate_json_value(value: &serde_json::Value, ctx: &Context) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(interpolate_ctx(s, ctx)),
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(|v| interpolate_json_value(v, ctx)).collect())
        }
        serde_json::Value::Object(map) => {
            let new_map: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), interpolate_json_value(v, ctx)))
                .collect();
            serde_json::Value::Object(new_map)
        }
        other => other.clone(),
    }
}

/// Resolve a dotted path (e.g., "user.email") from context.
fn resolve_path(path: &str, ctx: &Context) -> String {
    let parts: Vec<&str> = path.split('.').collect();

    if parts.is_empty() {
        return String::new();
    }

    let first = match ctx.get(parts[0]) {
        Some(v) => v,
        None => return String::new(),
    };

    let mut current = first;
    for part in &parts[1..] {
        current = match current.get(part) {
            Some(v) => v,
            None => return String::new(),
        };
    }

    match current {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
