// 配置深度合并
// 对象逐键递归合并；基本类型、数组或基础值不是对象时整体替换

use serde_json::Value;

/// 将 `overlay` 深度合并到 `base` 上
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) if base_value.is_object() && overlay_value.is_object() => {
                        deep_merge(base_value, overlay_value);
                    }
                    _ => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// 按点分路径设置一个覆盖值
///
/// 路径最多拆成两段（`section.leaf`），目标字段必须已存在于 `target` 中，
/// 否则返回 false 且不做任何修改。
pub fn apply_override(target: &mut Value, key: &str, value: &Value) -> bool {
    let mut segments = key.splitn(2, '.');
    let Some(head) = segments.next().filter(|segment| !segment.is_empty()) else {
        return false;
    };

    let Some(slot) = target.get_mut(head) else {
        return false;
    };

    let slot = match segments.next() {
        None => slot,
        Some(leaf) => {
            if !slot.is_object() {
                return false;
            }
            match slot.get_mut(leaf) {
                Some(leaf_slot) => leaf_slot,
                None => return false,
            }
        }
    };

    deep_merge(slot, value);
    true
}
