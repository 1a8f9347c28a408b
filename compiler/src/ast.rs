use dynaproto_schema::{Constant, Rule};
use serde::Serialize;

/// The parsed form of one unit of IDL text. Type references are raw token
/// text at this stage; the builder resolves them later.
#[derive(Debug, PartialEq, Serialize)]
pub struct ProtoFile {
    pub package:  Option<String>,
    pub options:  Vec<(String, Constant)>,
    pub messages: Vec<MessageNode>,
    pub enums:    Vec<EnumNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageNode {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub fields:   Vec<FieldNode>,
    pub messages: Vec<MessageNode>,
    pub enums:    Vec<EnumNode>,
    pub options:  Vec<(String, Constant)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    pub name:     String,
    pub line:     usize,
    pub column:   usize,
    pub rule:     Rule,
    pub type_ref: String,
    pub id:       u32,
    pub options:  Vec<(String, Constant)>,
}

impl FieldNode {
    /// The field's declared default, if its option list carries one.
    pub fn default(&self) -> Option<&Constant> {
        self.options
            .iter()
            .find(|(name, _)| name == "default")
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumNode {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub values: Vec<EnumValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumValueNode {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub number: i32,
}
