use std::collections::HashMap;

use serde::Serialize;

/// Stable handle to a node in a [Schema] arena.
pub type TypeId = usize;

/// The root namespace always lives at index 0.
pub const ROOT: TypeId = 0;

/// The 3-bit wire type codes from the protobuf encoding spec. The two group
/// codes are recognized but not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Bits64 = 1,
    Ldelim = 2,
    StartGroup = 3,
    EndGroup = 4,
    Bits32 = 5,
}

impl WireType {
    /// The 3-bit code carried in a field tag.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// The primitive field types. Note that 64-bit varint types (int64, uint64,
/// sint64, fixed64) are not supported; sfixed64 and double are the only
/// 64-bit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int32,
    Uint32,
    Sint32,
    Bool,
    Double,
    String,
    Bytes,
    Fixed32,
    Sfixed32,
    Sfixed64,
    Float,
}

impl ScalarType {
    /// Maps a primitive type keyword to its scalar type, or `None` if the
    /// word is a type reference.
    pub fn from_keyword(word: &str) -> Option<ScalarType> {
        Some(match word {
            "int32" => ScalarType::Int32,
            "uint32" => ScalarType::Uint32,
            "sint32" => ScalarType::Sint32,
            "bool" => ScalarType::Bool,
            "double" => ScalarType::Double,
            "string" => ScalarType::String,
            "bytes" => ScalarType::Bytes,
            "fixed32" => ScalarType::Fixed32,
            "sfixed32" => ScalarType::Sfixed32,
            "sfixed64" => ScalarType::Sfixed64,
            "float" => ScalarType::Float,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ScalarType::Int32 => "int32",
            ScalarType::Uint32 => "uint32",
            ScalarType::Sint32 => "sint32",
            ScalarType::Bool => "bool",
            ScalarType::Double => "double",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Float => "float",
        }
    }

    pub fn wire_type(self) -> WireType {
        match self {
            ScalarType::Int32
            | ScalarType::Uint32
            | ScalarType::Sint32
            | ScalarType::Bool => WireType::Varint,
            ScalarType::Double | ScalarType::Sfixed64 => WireType::Bits64,
            ScalarType::String | ScalarType::Bytes => WireType::Ldelim,
            ScalarType::Fixed32 | ScalarType::Sfixed32 | ScalarType::Float => WireType::Bits32,
        }
    }
}

/// A field's type after resolution. Message and enum references hold the
/// index of the referenced schema node, so encode/decode never re-resolve
/// names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    Message(TypeId),
    Enum(TypeId),
}

impl FieldType {
    pub fn wire_type(self) -> WireType {
        match self {
            FieldType::Scalar(scalar) => scalar.wire_type(),
            FieldType::Message(_) => WireType::Ldelim,
            FieldType::Enum(_) => WireType::Varint,
        }
    }
}

/// Field cardinality rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rule {
    Required,
    Optional,
    Repeated,
}

/// A constant from the IDL: an integer literal, a quoted string, or a bare
/// word (`true`, `false`, an enum value name). Used for option values and
/// field defaults; no type checking is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
    Int(i64),
    Str(String),
    Word(String),
}

/// A resolved message field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub id: u32,
    pub rule: Rule,
    pub ty: FieldType,
    pub default: Option<Constant>,
}

/// A resolved message: its fields in declaration order plus lookup tables
/// keyed by field id and field name.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDef {
    pub fields: Vec<FieldDef>,
    pub options: HashMap<String, Constant>,
    field_id_to_index: HashMap<u32, usize>,
    field_name_to_index: HashMap<String, usize>,
}

impl MessageDef {
    pub fn new(fields: Vec<FieldDef>, options: HashMap<String, Constant>) -> MessageDef {
        let mut field_id_to_index = HashMap::new();
        let mut field_name_to_index = HashMap::new();
        for (index, field) in fields.iter().enumerate() {
            field_id_to_index.insert(field.id, index);
            field_name_to_index.insert(field.name.clone(), index);
        }
        MessageDef {
            fields,
            options,
            field_id_to_index,
            field_name_to_index,
        }
    }

    /// Looks up a field slot by its wire id.
    pub fn field_by_id(&self, id: u32) -> Option<(usize, &FieldDef)> {
        let index = *self.field_id_to_index.get(&id)?;
        Some((index, &self.fields[index]))
    }

    /// Looks up a field slot by name.
    pub fn field_by_name(&self, name: &str) -> Option<(usize, &FieldDef)> {
        let index = *self.field_name_to_index.get(name)?;
        Some((index, &self.fields[index]))
    }
}

/// A resolved enum: value names and numbers, both directions indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub values: Vec<(String, i32)>,
    number_by_name: HashMap<String, i32>,
    name_by_number: HashMap<i32, String>,
}

impl EnumDef {
    pub fn new(values: Vec<(String, i32)>) -> EnumDef {
        let mut number_by_name = HashMap::new();
        let mut name_by_number = HashMap::new();
        for (name, number) in &values {
            number_by_name.insert(name.clone(), *number);
            name_by_number.insert(*number, name.clone());
        }
        EnumDef {
            values,
            number_by_name,
            name_by_number,
        }
    }

    pub fn number(&self, name: &str) -> Option<i32> {
        self.number_by_name.get(name).copied()
    }

    pub fn name(&self, number: i32) -> Option<&str> {
        self.name_by_number.get(&number).map(String::as_str)
    }
}

/// What a schema node is.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Namespace,
    Message(MessageDef),
    Enum(EnumDef),
}

/// One node in the schema tree. Children are keyed by simple name; the
/// parent link points back up the tree (the root has none).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub parent: Option<TypeId>,
    pub children: HashMap<String, TypeId>,
    pub kind: NodeKind,
}

/// An immutable, fully resolved schema. Once built it is read-only and can
/// be shared freely across threads; message instances hold a `TypeId` into
/// it rather than owning any schema state.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    nodes: Vec<Node>,
}

impl Schema {
    /// Assembles a schema from a node arena. Index 0 must be the root
    /// namespace; parent/child indices must be internally consistent. This
    /// is normally called by the compiler's build phase.
    pub fn from_nodes(nodes: Vec<Node>) -> Schema {
        debug_assert!(matches!(nodes[ROOT].kind, NodeKind::Namespace));
        Schema { nodes }
    }

    pub fn node(&self, id: TypeId) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Resolves a dotted name from the root namespace. A leading `.` is
    /// accepted and ignored (all lookups here are absolute).
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        let mut current = ROOT;
        for segment in name.trim_start_matches('.').split('.') {
            current = *self.nodes[current].children.get(segment)?;
        }
        Some(current)
    }

    /// The fully qualified dotted name of a node.
    pub fn full_name(&self, id: TypeId) -> String {
        let mut segments = vec![self.nodes[id].name.as_str()];
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            if parent != ROOT {
                segments.push(self.nodes[parent].name.as_str());
            }
            current = parent;
        }
        segments.reverse();
        segments.join(".")
    }

    pub fn message(&self, id: TypeId) -> Option<&MessageDef> {
        match &self.nodes[id].kind {
            NodeKind::Message(def) => Some(def),
            _ => None,
        }
    }

    pub fn enum_def(&self, id: TypeId) -> Option<&EnumDef> {
        match &self.nodes[id].kind {
            NodeKind::Enum(def) => Some(def),
            _ => None,
        }
    }

    /// All message nodes in the schema, in arena order.
    pub fn messages(&self) -> impl Iterator<Item = (TypeId, &MessageDef)> {
        self.nodes.iter().enumerate().filter_map(|(id, node)| {
            match &node.kind {
                NodeKind::Message(def) => Some((id, def)),
                _ => None,
            }
        })
    }
}
