use crate::{
    bb::{ByteBuffer, ByteBufferMut},
    error::{DecodeError, EncodeError},
    schema::{Constant, FieldDef, FieldType, MessageDef, Rule, ScalarType, Schema, TypeId, WireType},
};

/// A dynamic field value.
///
/// Values can represent anything a schema field can declare and are converted
/// to and from bytes by [Instance::encode] and [Instance::decode]. An enum
/// value is stored as its underlying number so that unrecognized variants
/// survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(i32),
    Array(Vec<Value>),
    Message(Instance),
}

impl Value {
    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// A convenience method to extract the value out of an [Int32](#variant.Int32)
    /// or [Enum](#variant.Enum). Returns `0` for other value kinds.
    pub fn as_i32(&self) -> i32 {
        match *self {
            Value::Int32(value) | Value::Enum(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Uint32](#variant.Uint32).
    /// Returns `0` for other value kinds.
    pub fn as_u32(&self) -> u32 {
        match *self {
            Value::Uint32(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of an [Int64](#variant.Int64).
    /// Returns `0` for other value kinds.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::Int64(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Float](#variant.Float).
    /// Returns `0.0` for other value kinds.
    pub fn as_f32(&self) -> f32 {
        match *self {
            Value::Float(value) => value,
            _ => 0.0,
        }
    }

    /// A convenience method to extract the value out of a [Double](#variant.Double).
    /// Returns `0.0` for other value kinds.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Double(value) => value,
            _ => 0.0,
        }
    }

    /// A convenience method to extract the value out of a [String](#variant.String).
    /// Returns `""` for other value kinds.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::String(ref value) => value.as_str(),
            _ => "",
        }
    }

    /// A convenience method to get the values out of an [Array](#variant.Array).
    /// Returns an empty slice for other value kinds.
    pub fn as_array(&self) -> &[Value] {
        match *self {
            Value::Array(ref values) => values.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to get the instance out of a [Message](#variant.Message).
    /// Returns `None` for other value kinds.
    pub fn as_message(&self) -> Option<&Instance> {
        match *self {
            Value::Message(ref instance) => Some(instance),
            _ => None,
        }
    }

    /// A convenience method to append to an [Array](#variant.Array). Does
    /// nothing for other value kinds.
    pub fn push(&mut self, value: Value) {
        if let Value::Array(ref mut values) = *self {
            values.push(value);
        }
    }
}

/// A mutable message instance bound to one message node of a [Schema].
///
/// Instances are created by [Schema::instance], hold one slot per declared
/// field (in declaration order), and only reference their schema by index:
/// the schema itself stays immutable and shared. Absent `optional` fields
/// hold no value; `repeated` fields hold an [Value::Array].
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_id: TypeId,
    slots: Vec<Option<Value>>,
}

impl Schema {
    /// Creates a new instance of the named message with every field set to
    /// its declared default, an empty array for `repeated` fields, and
    /// absence otherwise.
    pub fn instance(&self, name: &str) -> Result<Instance, EncodeError> {
        let type_id = self
            .lookup(name)
            .ok_or_else(|| EncodeError::UnknownMessage(name.to_owned()))?;
        let def = self
            .message(type_id)
            .ok_or_else(|| EncodeError::UnknownMessage(name.to_owned()))?;
        Ok(Instance::with_defaults(self, type_id, def))
    }
}

impl Instance {
    fn with_defaults(schema: &Schema, type_id: TypeId, def: &MessageDef) -> Instance {
        let slots = def
            .fields
            .iter()
            .map(|field| match field.rule {
                Rule::Repeated => Some(Value::Array(vec![])),
                _ => field
                    .default
                    .as_ref()
                    .and_then(|constant| default_value(schema, field.ty, constant)),
            })
            .collect();
        Instance { type_id, slots }
    }

    /// The schema node this instance was created from.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the value of the named field, or `None` if the field is
    /// absent or unknown.
    pub fn get<'a>(&'a self, schema: &Schema, name: &str) -> Option<&'a Value> {
        let def = schema.message(self.type_id)?;
        let (index, _) = def.field_by_name(name)?;
        self.slots[index].as_ref()
    }

    /// Sets the named field. The value is stored as-is; a mismatch with the
    /// declared field type surfaces later, when the instance is encoded.
    pub fn set(&mut self, schema: &Schema, name: &str, value: Value) -> Result<(), EncodeError> {
        let def = schema
            .message(self.type_id)
            .ok_or_else(|| EncodeError::UnknownMessage(format!("#{}", self.type_id)))?;
        let (index, _) = def.field_by_name(name).ok_or_else(|| EncodeError::UnknownField {
            message: schema.full_name(self.type_id),
            field: name.to_owned(),
        })?;
        self.slots[index] = Some(value);
        Ok(())
    }

    /// Clears the named field back to absence.
    pub fn clear(&mut self, schema: &Schema, name: &str) {
        if let Some(def) = schema.message(self.type_id) {
            if let Some((index, _)) = def.field_by_name(name) {
                self.slots[index] = None;
            }
        }
    }

    /// Encodes this instance into a byte vector using the provided schema.
    /// Fields are written in declaration order; a `required` field with no
    /// value is an error.
    pub fn encode(&self, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
        let mut bb = ByteBufferMut::new();
        self.encode_bb(schema, &mut bb)?;
        Ok(bb.data())
    }

    /// Decodes the named message type from `bytes`. Unknown field ids are
    /// skipped by their wire-type framing; a wire type that contradicts the
    /// schema for a known field id is an error.
    pub fn decode(schema: &Schema, name: &str, bytes: &[u8]) -> Result<Instance, DecodeError> {
        let type_id = schema
            .lookup(name)
            .filter(|&id| schema.message(id).is_some())
            .ok_or_else(|| DecodeError::UnknownMessage(name.to_owned()))?;
        Instance::decode_bb(schema, type_id, &mut ByteBuffer::new(bytes))
    }

    /// Encodes to the end of `bb`. This is mainly useful as a helper routine
    /// for [encode](#method.encode), which you probably want to use instead.
    pub fn encode_bb(&self, schema: &Schema, bb: &mut ByteBufferMut) -> Result<(), EncodeError> {
        let def = schema
            .message(self.type_id)
            .ok_or_else(|| EncodeError::UnknownMessage(format!("#{}", self.type_id)))?;

        for (slot, field) in self.slots.iter().zip(&def.fields) {
            match (slot, field.rule) {
                (None, Rule::Required) => {
                    return Err(EncodeError::MissingRequiredField {
                        message: schema.full_name(self.type_id),
                        field: field.name.clone(),
                    })
                }
                (None, _) => {}
                (Some(Value::Array(items)), Rule::Repeated) => {
                    for item in items {
                        encode_field(schema, field, item, bb)?;
                    }
                }
                (Some(_), Rule::Repeated) => {
                    return Err(EncodeError::TypeMismatch {
                        field: field.name.clone(),
                    })
                }
                (Some(value), _) => encode_field(schema, field, value, bb)?,
            }
        }
        Ok(())
    }

    /// Decodes tag/value pairs from `bb` until it is exhausted. This is
    /// mainly useful as a helper routine for [decode](#method.decode).
    pub fn decode_bb(
        schema: &Schema,
        type_id: TypeId,
        bb: &mut ByteBuffer,
    ) -> Result<Instance, DecodeError> {
        let def = schema
            .message(type_id)
            .ok_or_else(|| DecodeError::UnknownMessage(schema.full_name(type_id)))?;
        let mut instance = Instance::with_defaults(schema, type_id, def);

        while bb.remaining() > 0 {
            let tag = bb.read_var_uint32()?;
            let field_id = tag >> 3;
            let wire_bits = (tag & 7) as u8;

            let Some((index, field)) = def.field_by_id(field_id) else {
                skip_field(bb, wire_bits)?;
                continue;
            };

            let expected = field.ty.wire_type().bits();
            if wire_bits != expected {
                return Err(DecodeError::WireTypeMismatch {
                    field: field.name.clone(),
                    expected,
                    actual: wire_bits,
                });
            }

            let value = decode_field(schema, field, bb)?;
            match field.rule {
                Rule::Repeated => match instance.slots[index] {
                    Some(ref mut array) => array.push(value),
                    None => instance.slots[index] = Some(Value::Array(vec![value])),
                },
                _ => instance.slots[index] = Some(value),
            }
        }
        Ok(instance)
    }
}

/// Writes one tag/value pair for a single (non-array) value.
fn encode_field(
    schema: &Schema,
    field: &FieldDef,
    value: &Value,
    bb: &mut ByteBufferMut,
) -> Result<(), EncodeError> {
    bb.write_tag(field.id, field.ty.wire_type().bits());

    let mismatch = || EncodeError::TypeMismatch {
        field: field.name.clone(),
    };

    match field.ty {
        FieldType::Scalar(scalar) => match (scalar, value) {
            // int32 writes the 32-bit pattern; the reader widens on decode.
            (ScalarType::Int32, Value::Int32(n)) => bb.write_var_uint32(*n as u32),
            (ScalarType::Uint32, Value::Uint32(n)) => bb.write_var_uint32(*n),
            (ScalarType::Sint32, Value::Int32(n)) => bb.write_var_sint32(*n),
            (ScalarType::Bool, Value::Bool(b)) => bb.write_var_uint32(*b as u32),
            (ScalarType::Double, Value::Double(d)) => bb.write_double(*d),
            (ScalarType::Sfixed64, Value::Int64(n)) => bb.write_fixed64(*n as u64),
            (ScalarType::Fixed32, Value::Uint32(n)) => bb.write_fixed32(*n),
            (ScalarType::Sfixed32, Value::Int32(n)) => bb.write_fixed32(*n as u32),
            (ScalarType::Float, Value::Float(f)) => bb.write_float(*f),
            (ScalarType::String, Value::String(s)) => bb.write_string(s),
            (ScalarType::Bytes, Value::Bytes(bytes)) => {
                bb.write_var_uint32(bytes.len() as u32);
                bb.write_bytes(bytes);
            }
            _ => return Err(mismatch()),
        },
        FieldType::Enum(_) => match value {
            Value::Enum(n) | Value::Int32(n) => bb.write_var_uint32(*n as u32),
            _ => return Err(mismatch()),
        },
        FieldType::Message(_) => match value {
            Value::Message(nested) => {
                let mut sub = ByteBufferMut::new();
                nested.encode_bb(schema, &mut sub)?;
                let bytes = sub.data();
                bb.write_var_uint32(bytes.len() as u32);
                bb.write_bytes(&bytes);
            }
            _ => return Err(mismatch()),
        },
    }
    Ok(())
}

/// Reads one value for a known field, the tag already consumed.
fn decode_field(
    schema: &Schema,
    field: &FieldDef,
    bb: &mut ByteBuffer,
) -> Result<Value, DecodeError> {
    Ok(match field.ty {
        FieldType::Scalar(scalar) => match scalar {
            ScalarType::Int32 => Value::Int32(bb.read_var_uint64()? as u32 as i32),
            ScalarType::Uint32 => Value::Uint32(bb.read_var_uint32()?),
            ScalarType::Sint32 => Value::Int32(bb.read_var_sint32()?),
            ScalarType::Bool => Value::Bool(bb.read_var_uint64()? != 0),
            ScalarType::Double => Value::Double(bb.read_double()?),
            ScalarType::Sfixed64 => Value::Int64(bb.read_fixed64()? as i64),
            ScalarType::Fixed32 => Value::Uint32(bb.read_fixed32()?),
            ScalarType::Sfixed32 => Value::Int32(bb.read_fixed32()? as i32),
            ScalarType::Float => Value::Float(bb.read_float()?),
            ScalarType::String => Value::String(bb.read_string()?.into_owned()),
            ScalarType::Bytes => {
                let len = bb.read_var_uint32()? as usize;
                Value::Bytes(bb.read_bytes(len)?.to_vec())
            }
        },
        FieldType::Enum(_) => Value::Enum(bb.read_var_uint64()? as u32 as i32),
        FieldType::Message(type_id) => {
            let len = bb.read_var_uint32()? as usize;
            let bytes = bb.read_bytes(len)?;
            Value::Message(Instance::decode_bb(schema, type_id, &mut ByteBuffer::new(bytes))?)
        }
    })
}

/// Skips a value whose field id is not in the schema, using the framing
/// implied by the tag's wire type. Group wire types have no skippable
/// framing and are rejected.
fn skip_field(bb: &mut ByteBuffer, wire_bits: u8) -> Result<(), DecodeError> {
    match wire_bits {
        w if w == WireType::Varint.bits() => {
            bb.read_var_uint64()?;
        }
        w if w == WireType::Bits64.bits() => {
            bb.read_fixed64()?;
        }
        w if w == WireType::Ldelim.bits() => {
            let len = bb.read_var_uint32()? as usize;
            bb.read_bytes(len)?;
        }
        w if w == WireType::Bits32.bits() => {
            bb.read_fixed32()?;
        }
        w => return Err(DecodeError::UnsupportedWireType(w)),
    }
    Ok(())
}

/// Interprets a declared default against the field's resolved type. A
/// constant that does not fit the type is ignored (default values are not
/// type checked).
fn default_value(schema: &Schema, ty: FieldType, constant: &Constant) -> Option<Value> {
    match ty {
        FieldType::Scalar(scalar) => match (scalar, constant) {
            (ScalarType::Int32, Constant::Int(n))
            | (ScalarType::Sint32, Constant::Int(n))
            | (ScalarType::Sfixed32, Constant::Int(n)) => Some(Value::Int32(*n as i32)),
            (ScalarType::Uint32, Constant::Int(n))
            | (ScalarType::Fixed32, Constant::Int(n)) => Some(Value::Uint32(*n as u32)),
            (ScalarType::Sfixed64, Constant::Int(n)) => Some(Value::Int64(*n)),
            (ScalarType::Float, Constant::Int(n)) => Some(Value::Float(*n as f32)),
            (ScalarType::Double, Constant::Int(n)) => Some(Value::Double(*n as f64)),
            (ScalarType::Bool, Constant::Word(word)) => match word.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            (ScalarType::String, Constant::Str(s)) => Some(Value::String(s.clone())),
            (ScalarType::Bytes, Constant::Str(s)) => Some(Value::Bytes(s.clone().into_bytes())),
            _ => None,
        },
        FieldType::Enum(enum_id) => match constant {
            Constant::Int(n) => Some(Value::Enum(*n as i32)),
            Constant::Word(name) => schema
                .enum_def(enum_id)
                .and_then(|def| def.number(name))
                .map(Value::Enum),
            Constant::Str(_) => None,
        },
        FieldType::Message(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, Node, NodeKind, ROOT};
    use std::collections::HashMap;

    fn field(name: &str, id: u32, rule: Rule, ty: FieldType) -> FieldDef {
        FieldDef {
            name: name.to_owned(),
            id,
            rule,
            ty,
            default: None,
        }
    }

    // root(0) -> Person(1), Person.PhoneNumber(2), PhoneType(3)
    fn person_schema() -> Schema {
        let mut root = Node {
            name: String::new(),
            parent: None,
            children: HashMap::new(),
            kind: NodeKind::Namespace,
        };
        let mut person = Node {
            name: "Person".to_owned(),
            parent: Some(ROOT),
            children: HashMap::new(),
            kind: NodeKind::Message(MessageDef::new(
                vec![
                    field("name", 1, Rule::Required, FieldType::Scalar(ScalarType::String)),
                    field("age", 2, Rule::Optional, FieldType::Scalar(ScalarType::Int32)),
                    field("tags", 3, Rule::Repeated, FieldType::Scalar(ScalarType::String)),
                    field("phone", 4, Rule::Optional, FieldType::Message(2)),
                    field("kind", 5, Rule::Optional, FieldType::Enum(3)),
                ],
                HashMap::new(),
            )),
        };
        let phone = Node {
            name: "PhoneNumber".to_owned(),
            parent: Some(1),
            children: HashMap::new(),
            kind: NodeKind::Message(MessageDef::new(
                vec![field(
                    "number",
                    1,
                    Rule::Required,
                    FieldType::Scalar(ScalarType::String),
                )],
                HashMap::new(),
            )),
        };
        let phone_type = Node {
            name: "PhoneType".to_owned(),
            parent: Some(ROOT),
            children: HashMap::new(),
            kind: NodeKind::Enum(EnumDef::new(vec![
                ("MOBILE".to_owned(), 0),
                ("HOME".to_owned(), 1),
            ])),
        };
        root.children.insert("Person".to_owned(), 1);
        root.children.insert("PhoneType".to_owned(), 3);
        person.children.insert("PhoneNumber".to_owned(), 2);
        Schema::from_nodes(vec![root, person, phone, phone_type])
    }

    #[test]
    fn encode_scenario_bytes() {
        let schema = person_schema();
        let mut person = schema.instance("Person").unwrap();
        person
            .set(&schema, "name", Value::String("Alice".to_owned()))
            .unwrap();
        person.set(&schema, "age", Value::Int32(30)).unwrap();
        person
            .set(
                &schema,
                "tags",
                Value::Array(vec![
                    Value::String("x".to_owned()),
                    Value::String("y".to_owned()),
                ]),
            )
            .unwrap();

        assert_eq!(
            person.encode(&schema).unwrap(),
            [
                0x0A, 0x05, b'A', b'l', b'i', b'c', b'e', // field 1, LDELIM, "Alice"
                0x10, 0x1E, // field 2, VARINT, 30
                0x1A, 0x01, b'x', // field 3, LDELIM, "x"
                0x1A, 0x01, b'y', // field 3, LDELIM, "y"
            ]
        );
    }

    #[test]
    fn message_round_trip() {
        let schema = person_schema();
        let mut person = schema.instance("Person").unwrap();
        person
            .set(&schema, "name", Value::String("Bob".to_owned()))
            .unwrap();
        person
            .set(
                &schema,
                "tags",
                Value::Array(vec![Value::String("a".to_owned())]),
            )
            .unwrap();
        person.set(&schema, "kind", Value::Enum(1)).unwrap();

        let mut phone = schema.instance("Person.PhoneNumber").unwrap();
        phone
            .set(&schema, "number", Value::String("555-1234".to_owned()))
            .unwrap();
        person.set(&schema, "phone", Value::Message(phone)).unwrap();

        let bytes = person.encode(&schema).unwrap();
        let decoded = Instance::decode(&schema, "Person", &bytes).unwrap();
        assert_eq!(decoded, person);
        // Absent optional fields stay absent.
        assert_eq!(decoded.get(&schema, "age"), None);
    }

    #[test]
    fn missing_required_field_fails_encode() {
        let schema = person_schema();
        let person = schema.instance("Person").unwrap();
        assert_eq!(
            person.encode(&schema),
            Err(EncodeError::MissingRequiredField {
                message: "Person".to_owned(),
                field: "name".to_owned(),
            })
        );
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let schema = person_schema();
        // field 99 as varint, field 90 as ldelim, field 80 as 32-bit,
        // field 70 as 64-bit, then a known field 2 (age).
        let mut bb = ByteBufferMut::new();
        bb.write_tag(99, 0);
        bb.write_var_uint32(12345);
        bb.write_tag(90, 2);
        bb.write_string("ignored");
        bb.write_tag(80, 5);
        bb.write_fixed32(7);
        bb.write_tag(70, 1);
        bb.write_fixed64(7);
        bb.write_tag(2, 0);
        bb.write_var_uint32(41);

        let decoded = Instance::decode(&schema, "Person", &bb.data()).unwrap();
        assert_eq!(decoded.get(&schema, "age"), Some(&Value::Int32(41)));
    }

    #[test]
    fn group_wire_types_are_rejected() {
        let schema = person_schema();
        let mut bb = ByteBufferMut::new();
        bb.write_tag(99, 3);
        assert_eq!(
            Instance::decode(&schema, "Person", &bb.data()),
            Err(DecodeError::UnsupportedWireType(3))
        );
    }

    #[test]
    fn wire_type_mismatch_is_an_error() {
        let schema = person_schema();
        // age (field 2) is VARINT but the tag claims BITS32.
        let mut bb = ByteBufferMut::new();
        bb.write_tag(2, 5);
        bb.write_fixed32(30);
        assert_eq!(
            Instance::decode(&schema, "Person", &bb.data()),
            Err(DecodeError::WireTypeMismatch {
                field: "age".to_owned(),
                expected: 0,
                actual: 5,
            })
        );
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let schema = person_schema();
        // Declares a 5-byte string but provides 3 bytes.
        let bytes = [0x0A, 0x05, b'A', b'l', b'i'];
        assert_eq!(
            Instance::decode(&schema, "Person", &bytes),
            Err(DecodeError::TruncatedPayload {
                declared: 5,
                remaining: 3,
            })
        );
    }

    #[test]
    fn truncated_varint_is_an_error() {
        let schema = person_schema();
        let bytes = [0x10, 0x80]; // age tag, then a varint cut mid-way
        assert_eq!(
            Instance::decode(&schema, "Person", &bytes),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn sign_extended_int32_from_standard_encoders_decodes() {
        let schema = person_schema();
        // -1 as a 10-byte sign-extended varint, the way protoc writes it.
        let bytes = [
            0x10, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01,
        ];
        let decoded = Instance::decode(&schema, "Person", &bytes).unwrap();
        assert_eq!(decoded.get(&schema, "age"), Some(&Value::Int32(-1)));
    }

    #[test]
    fn type_mismatched_value_fails_encode() {
        let schema = person_schema();
        let mut person = schema.instance("Person").unwrap();
        person.set(&schema, "name", Value::Int32(7)).unwrap();
        assert_eq!(
            person.encode(&schema),
            Err(EncodeError::TypeMismatch {
                field: "name".to_owned(),
            })
        );
    }

    #[test]
    fn defaults_apply_at_construction() {
        let mut root = Node {
            name: String::new(),
            parent: None,
            children: HashMap::new(),
            kind: NodeKind::Namespace,
        };
        let msg = Node {
            name: "Defaults".to_owned(),
            parent: Some(ROOT),
            children: HashMap::new(),
            kind: NodeKind::Message(MessageDef::new(
                vec![FieldDef {
                    name: "greeting".to_owned(),
                    id: 1,
                    rule: Rule::Optional,
                    ty: FieldType::Scalar(ScalarType::String),
                    default: Some(Constant::Str("hi".to_owned())),
                }],
                HashMap::new(),
            )),
        };
        root.children.insert("Defaults".to_owned(), 1);
        let schema = Schema::from_nodes(vec![root, msg]);

        let instance = schema.instance("Defaults").unwrap();
        assert_eq!(
            instance.get(&schema, "greeting"),
            Some(&Value::String("hi".to_owned()))
        );
    }
}
