use std::collections::HashMap;

use crate::{
    ast::{EnumNode, MessageNode, ProtoFile},
    error::ProtoError,
    utils::{definition_error, quote},
};
use dynaproto_schema::{
    Constant, EnumDef, FieldDef, FieldType, MessageDef, Node, NodeKind, Rule, ScalarType, Schema,
    TypeId, ROOT,
};

/// One field while the schema is still under construction: the raw type
/// reference text plus, once `resolve_all` has run, its resolved type. The
/// transition happens exactly once and never reverts.
#[derive(Debug, Clone)]
struct PendingField {
    name:     String,
    id:       u32,
    rule:     Rule,
    raw_type: String,
    default:  Option<Constant>,
    resolved: Option<FieldType>,
}

#[derive(Debug, Clone)]
enum PendingKind {
    Namespace,
    Message {
        fields:  Vec<PendingField>,
        options: HashMap<String, Constant>,
    },
    Enum(Vec<(String, i32)>),
}

#[derive(Debug, Clone)]
struct PendingNode {
    name:     String,
    parent:   Option<TypeId>,
    children: HashMap<String, TypeId>,
    kind:     PendingKind,
}

/// Builds a resolved [Schema] from parsed IDL in two phases: [create](Builder::create)
/// walks ASTs into an unresolved node tree (forward references welcome),
/// then [resolve_all](Builder::resolve_all) turns every textual type
/// reference into a concrete node handle. [build](Builder::build) freezes
/// the result. A builder accumulates state across `create` calls, so one
/// schema can span several compilation units.
pub struct Builder {
    nodes: Vec<PendingNode>,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            nodes: vec![PendingNode {
                name:     String::new(),
                parent:   None,
                children: HashMap::new(),
                kind:     PendingKind::Namespace,
            }],
        }
    }

    /// Ensures the namespace chain for a dotted package name exists and
    /// returns the innermost namespace. Reuses namespaces created by
    /// earlier calls; a package segment that collides with a message or
    /// enum name is an error.
    pub fn define(&mut self, package: &str) -> Result<TypeId, ProtoError> {
        let mut current = ROOT;
        for segment in package.split('.') {
            current = match self.nodes[current].children.get(segment) {
                Some(&child) => match self.nodes[child].kind {
                    PendingKind::Namespace => child,
                    _ => {
                        return Err(ProtoError::Resolution(format!(
                            "Package segment {} collides with a declared type",
                            quote(segment)
                        )))
                    }
                },
                None => self.push_node(current, segment.to_owned(), PendingKind::Namespace),
            };
        }
        Ok(current)
    }

    /// Phase 1: walks one parsed file into the node tree under its declared
    /// package (or the root namespace). No type references are resolved
    /// here, so a field may name a message that only appears in a later
    /// `create` call.
    pub fn create(&mut self, file: &ProtoFile) -> Result<(), ProtoError> {
        let scope = match &file.package {
            Some(package) => self.define(package)?,
            None => ROOT,
        };
        for message in &file.messages {
            self.create_message(scope, message)?;
        }
        for decl in &file.enums {
            self.create_enum(scope, decl)?;
        }
        Ok(())
    }

    /// Phase 2: resolves every field's textual type reference into a
    /// primitive, message or enum. Idempotent: fields that already resolved
    /// in an earlier pass are skipped, so incremental builders can `create`
    /// more and resolve again.
    pub fn resolve_all(&mut self) -> Result<(), ProtoError> {
        for id in 0..self.nodes.len() {
            let PendingKind::Message { ref fields, .. } = self.nodes[id].kind else {
                continue;
            };

            // Collect this message's unresolved work before mutating.
            let pending: Vec<(usize, String, String)> = fields
                .iter()
                .enumerate()
                .filter(|(_, field)| field.resolved.is_none())
                .map(|(i, field)| (i, field.name.clone(), field.raw_type.clone()))
                .collect();

            for (field_index, field_name, raw_type) in pending {
                let resolved = match ScalarType::from_keyword(&raw_type) {
                    Some(scalar) => FieldType::Scalar(scalar),
                    None => self.resolve_reference(id, &raw_type).ok_or_else(|| {
                        ProtoError::Resolution(format!(
                            "Cannot resolve type {} for field {} of {}",
                            quote(&raw_type),
                            quote(&field_name),
                            quote(&self.full_name(id)),
                        ))
                    })?,
                };
                if let PendingKind::Message { ref mut fields, .. } = self.nodes[id].kind {
                    fields[field_index].resolved = Some(resolved);
                }
            }
        }
        Ok(())
    }

    /// Phase 3: freezes the node tree into an immutable [Schema]. Fails if
    /// any field is still unresolved (`resolve_all` has not run since the
    /// last `create`).
    pub fn build(&self) -> Result<Schema, ProtoError> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (id, pending) in self.nodes.iter().enumerate() {
            let kind = match &pending.kind {
                PendingKind::Namespace => NodeKind::Namespace,
                PendingKind::Enum(values) => NodeKind::Enum(EnumDef::new(values.clone())),
                PendingKind::Message { fields, options } => {
                    let mut defs = Vec::with_capacity(fields.len());
                    for field in fields {
                        let ty = field.resolved.ok_or_else(|| {
                            ProtoError::Resolution(format!(
                                "Field {} of {} is still unresolved",
                                quote(&field.name),
                                quote(&self.full_name(id)),
                            ))
                        })?;
                        defs.push(FieldDef {
                            name: field.name.clone(),
                            id: field.id,
                            rule: field.rule,
                            ty,
                            default: field.default.clone(),
                        });
                    }
                    NodeKind::Message(MessageDef::new(defs, options.clone()))
                }
            };
            nodes.push(Node {
                name: pending.name.clone(),
                parent: pending.parent,
                children: pending.children.clone(),
                kind,
            });
        }
        Ok(Schema::from_nodes(nodes))
    }

    fn push_node(&mut self, parent: TypeId, name: String, kind: PendingKind) -> TypeId {
        let id = self.nodes.len();
        self.nodes.push(PendingNode {
            name: name.clone(),
            parent: Some(parent),
            children: HashMap::new(),
            kind,
        });
        self.nodes[parent].children.insert(name, id);
        id
    }

    fn claim_child(&mut self, parent: TypeId, name: &str, line: usize, column: usize, kind: PendingKind)
        -> Result<TypeId, ProtoError>
    {
        if self.nodes[parent].children.contains_key(name) {
            return Err(definition_error(
                &format!(
                    "The name {} is already defined in {}",
                    quote(name),
                    quote(&self.full_name(parent)),
                ),
                line,
                column,
            ));
        }
        Ok(self.push_node(parent, name.to_owned(), kind))
    }

    fn create_message(&mut self, parent: TypeId, node: &MessageNode) -> Result<(), ProtoError> {
        let fields = node
            .fields
            .iter()
            .map(|field| PendingField {
                name:     field.name.clone(),
                id:       field.id,
                rule:     field.rule,
                raw_type: field.type_ref.clone(),
                default:  field.default().cloned(),
                resolved: None,
            })
            .collect();
        let options = node.options.iter().cloned().collect();
        let id = self.claim_child(
            parent,
            &node.name,
            node.line,
            node.column,
            PendingKind::Message { fields, options },
        )?;
        for nested in &node.messages {
            self.create_message(id, nested)?;
        }
        for nested in &node.enums {
            self.create_enum(id, nested)?;
        }
        Ok(())
    }

    fn create_enum(&mut self, parent: TypeId, node: &EnumNode) -> Result<(), ProtoError> {
        let values = node
            .values
            .iter()
            .map(|value| (value.name.clone(), value.number))
            .collect();
        self.claim_child(parent, &node.name, node.line, node.column, PendingKind::Enum(values))?;
        Ok(())
    }

    /// Resolves a type reference from the scope of the message declaring
    /// the field. Leading-dot references are absolute; relative references
    /// bind their first segment to the nearest enclosing scope that knows
    /// it (nested types shadow outer ones) and then descend.
    fn resolve_reference(&self, from: TypeId, reference: &str) -> Option<FieldType> {
        let target = if let Some(absolute) = reference.strip_prefix('.') {
            self.descend(ROOT, absolute)?
        } else {
            let first = reference.split('.').next()?;
            let mut scope = Some(from);
            let mut anchor = None;
            while let Some(id) = scope {
                if self.nodes[id].children.contains_key(first) {
                    anchor = Some(id);
                    break;
                }
                scope = self.nodes[id].parent;
            }
            self.descend(anchor?, reference)?
        };
        match self.nodes[target].kind {
            PendingKind::Message { .. } => Some(FieldType::Message(target)),
            PendingKind::Enum(_) => Some(FieldType::Enum(target)),
            PendingKind::Namespace => None,
        }
    }

    fn descend(&self, mut scope: TypeId, path: &str) -> Option<TypeId> {
        for segment in path.split('.') {
            scope = *self.nodes[scope].children.get(segment)?;
        }
        Some(scope)
    }

    fn full_name(&self, id: TypeId) -> String {
        if id == ROOT {
            return "the root namespace".to_owned();
        }
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
}
