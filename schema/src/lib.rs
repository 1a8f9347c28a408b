//! Runtime support for schema-driven Protocol Buffers encoding.
//!
//! This crate holds the resolved, reflective schema model (a tree of
//! namespace, message and enum nodes addressed by stable indices), the
//! dynamic [Value]/[Instance] types, and the wire codec that turns
//! instances into standard protobuf bytes and back. Schemas are normally
//! produced by the `dynaproto-compiler` crate, but the node arena can be
//! assembled programmatically.
//!
//! ```
//! use std::collections::HashMap;
//! use dynaproto_schema::*;
//!
//! let mut root = Node {
//!     name: String::new(),
//!     parent: None,
//!     children: HashMap::new(),
//!     kind: NodeKind::Namespace,
//! };
//! root.children.insert("Point".to_owned(), 1);
//! let point = Node {
//!     name: "Point".to_owned(),
//!     parent: Some(ROOT),
//!     children: HashMap::new(),
//!     kind: NodeKind::Message(MessageDef::new(
//!         vec![
//!             FieldDef {
//!                 name: "x".to_owned(),
//!                 id: 1,
//!                 rule: Rule::Optional,
//!                 ty: FieldType::Scalar(ScalarType::Int32),
//!                 default: None,
//!             },
//!         ],
//!         HashMap::new(),
//!     )),
//! };
//! let schema = Schema::from_nodes(vec![root, point]);
//!
//! let mut point = schema.instance("Point").unwrap();
//! point.set(&schema, "x", Value::Int32(150)).unwrap();
//! assert_eq!(point.encode(&schema).unwrap(), [0x08, 0x96, 0x01]);
//! ```

pub mod bb;
pub mod error;
pub mod schema;
pub mod value;

pub use bb::*;
pub use error::*;
pub use schema::*;
pub use value::*;
