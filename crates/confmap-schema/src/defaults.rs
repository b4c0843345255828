//! Default value derivation.
//!
//! Evaluated once per schema node while building and cached in
//! [`SchemaNode::default_value`](crate::schema::SchemaNode::default_value).
//! The materializer instantiates new document nodes from that cached value,
//! so there is exactly one derivation.
//!
//! Precedence:
//! 1. an explicit default declared on the property or its type,
//! 2. objects: every required property with its own default, others omitted,
//! 3. arrays: empty,
//! 4. scalars: the zero value of the declared type, or `null` when nullable.

use serde_json::{Map as JsonMap, Value as JsonValue, json};

use crate::build::Shape;
use crate::schema::{DeclaredType, SchemaDocument, TypeKind};

pub(crate) fn derive_default(
    schema: &SchemaDocument,
    declared: &DeclaredType,
    explicit: Option<&JsonValue>,
    shape: &Shape,
) -> JsonValue {
    if let Some(value) = explicit {
        return value.clone();
    }
    match shape {
        Shape::Object(properties) => {
            let object: JsonMap<String, JsonValue> = properties
                .iter()
                .map(|(name, id)| (name, schema.node(*id)))
                .filter(|(_, child)| child.is_required)
                .map(|(name, child)| (name.clone(), child.default_value.clone()))
                .collect();
            JsonValue::Object(object)
        }
        Shape::Array(_) => JsonValue::Array(Vec::new()),
        Shape::Map(_) => JsonValue::Object(JsonMap::new()),
        Shape::Enum { members, .. } if !declared.nullable => members
            .first()
            .map(|member| JsonValue::String(member.clone()))
            .unwrap_or_else(|| JsonValue::String(String::new())),
        Shape::Enum { .. } | Shape::Scalar => zero_value(declared),
        Shape::Placeholder => JsonValue::Null,
    }
}

/// The natural zero value of a scalar type.
pub fn zero_value(declared: &DeclaredType) -> JsonValue {
    if declared.nullable {
        return JsonValue::Null;
    }
    match declared.kind {
        TypeKind::Boolean => json!(false),
        TypeKind::Integer | TypeKind::Number => json!(0),
        TypeKind::String | TypeKind::Enum(_) => json!(""),
        TypeKind::Map | TypeKind::Composite(_) => json!({}),
        TypeKind::Sequence => json!([]),
        TypeKind::Any => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        let zero = |kind, nullable| zero_value(&DeclaredType::new(kind, nullable));
        assert_eq!(zero(TypeKind::Boolean, false), json!(false));
        assert_eq!(zero(TypeKind::Integer, false), json!(0));
        assert_eq!(zero(TypeKind::Number, false), json!(0));
        assert_eq!(zero(TypeKind::String, false), json!(""));
        assert_eq!(zero(TypeKind::String, true), JsonValue::Null);
        assert_eq!(zero(TypeKind::Integer, true), JsonValue::Null);
        assert_eq!(zero(TypeKind::Any, false), JsonValue::Null);
    }

    #[test]
    fn test_explicit_default_wins() {
        let schema = SchemaDocument::default();
        let declared = DeclaredType::new(TypeKind::Sequence, false);
        let explicit = json!([1, 2]);
        assert_eq!(
            derive_default(
                &schema,
                &declared,
                Some(&explicit),
                &Shape::Array(crate::schema::SchemaNodeId(0))
            ),
            explicit
        );
    }

    #[test]
    fn test_enum_defaults_to_first_member() {
        let schema = SchemaDocument::default();
        let shape = Shape::Enum {
            members: vec!["Info".to_string(), "Debug".to_string()],
            flags: false,
        };
        let declared = DeclaredType::new(TypeKind::Enum("level".into()), false);
        assert_eq!(derive_default(&schema, &declared, None, &shape), json!("Info"));
        let nullable = DeclaredType::new(TypeKind::Enum("level".into()), true);
        assert_eq!(
            derive_default(&schema, &nullable, None, &shape),
            JsonValue::Null
        );
    }
}
