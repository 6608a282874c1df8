//! Flattening Walker
//!
//! Visits every top-level def and gives each anonymous nested shape a name of
//! its own, producing the [`FlatTable`] that synthesis consumes.
//!
//! Names are a pure function of the path from the def to the node, and
//! siblings are visited in lexicographic order, so two runs over the same
//! corpus produce identical tables.

use tracing::{debug, warn};

use super::{DefContext, Diagnostics, DiagnosticCode, ExtDefMap, FlatDef, FlatTable};
use crate::codegen::names::{self, ELEMENT_SEGMENT};
use crate::error::Result;
use crate::schema::{ObjectNode, ParamsNode, TypeNode};

/// Flatten the whole corpus. Fails only on a naming collision.
pub fn flatten(defs: &ExtDefMap) -> Result<(FlatTable, Diagnostics)> {
    let mut walker = Walker {
        table: FlatTable::new(),
        diagnostics: Diagnostics::new(),
    };

    for (_, entry) in defs.iter() {
        walker.visit(&entry.node, entry.context.clone(), entry.type_name())?;
    }

    debug!(
        defs = defs.len(),
        flattened = walker.table.len(),
        "Flattened lexicon corpus"
    );
    Ok((walker.table, walker.diagnostics))
}

struct Walker {
    table: FlatTable,
    diagnostics: Diagnostics,
}

impl Walker {
    fn visit(&mut self, node: &TypeNode, context: DefContext, name: String) -> Result<()> {
        match node {
            TypeNode::Object(object) => {
                self.check_required(object, &context);
                self.record(node.clone(), &context, &name, false, None)?;
                self.visit_properties(object, &context, &name)
            }
            TypeNode::Record(record) => {
                self.check_required(&record.record, &context);
                self.record(
                    TypeNode::Object(record.record.clone()),
                    &context,
                    &name,
                    true,
                    record.key.clone(),
                )?;
                self.visit_properties(&record.record, &context, &name)
            }
            TypeNode::Union(union) => {
                if union.refs.is_empty() {
                    warn!(def = %context.key(), "Dropping union without refs");
                    self.diagnostics.empty_union(context.key());
                    Ok(())
                } else {
                    self.record(node.clone(), &context, &name, false, None)
                }
            }
            TypeNode::Array(array) => self.visit(
                &array.items,
                context.child(ELEMENT_SEGMENT),
                names::nested_name(&name, ELEMENT_SEGMENT),
            ),
            node if node.is_closed_scalar() => self.record(node.clone(), &context, &name, false, None),
            TypeNode::Query(_) | TypeNode::Procedure(_) => {
                let Some(shape) = node.rpc_shape() else {
                    return Ok(());
                };
                if let Some(schema) = shape.input.and_then(|body| body.schema.as_deref()) {
                    self.visit(schema, context.child("input"), names::nested_name(&name, "input"))?;
                }
                if let Some(schema) = shape.output.and_then(|body| body.schema.as_deref()) {
                    self.visit(schema, context.child("output"), names::nested_name(&name, "output"))?;
                }
                self.visit_params(shape.parameters, &context, &name)
            }
            TypeNode::Subscription(subscription) => {
                if let Some(schema) = subscription
                    .message
                    .as_ref()
                    .and_then(|message| message.schema.as_deref())
                {
                    self.visit(schema, context.child("message"), names::nested_name(&name, "message"))?;
                }
                self.visit_params(subscription.parameters.as_ref(), &context, &name)
            }
            // References are resolved at their use-sites; scalars need no name.
            _ => Ok(()),
        }
    }

    fn visit_properties(&mut self, object: &ObjectNode, context: &DefContext, name: &str) -> Result<()> {
        for (property, child) in &object.properties {
            if child.is_structural() {
                self.visit(child, context.child(property), names::nested_name(name, property))?;
            }
        }
        Ok(())
    }

    /// Only structural parameters get names here; scalar and closed ones are
    /// inlined by synthesis.
    fn visit_params(&mut self, params: Option<&ParamsNode>, context: &DefContext, name: &str) -> Result<()> {
        let Some(params) = params else {
            return Ok(());
        };
        for (param, child) in &params.properties {
            if child.is_structural() {
                self.visit(child, context.child(param), names::nested_name(name, param))?;
            }
        }
        Ok(())
    }

    fn record(
        &mut self,
        node: TypeNode,
        context: &DefContext,
        name: &str,
        is_record: bool,
        record_key: Option<String>,
    ) -> Result<()> {
        let needs_type_tag = matches!(&node, TypeNode::Object(o) if o.properties.is_empty());
        self.table.insert(FlatDef {
            context: context.clone(),
            type_name: name.to_string(),
            node,
            is_record,
            record_key,
            needs_type_tag,
        })
    }

    fn check_required(&mut self, object: &ObjectNode, context: &DefContext) {
        for required in &object.required {
            if !object.properties.contains_key(required) {
                self.diagnostics.report(
                    context.key(),
                    DiagnosticCode::RequiredPropertyMissing,
                    format!("'{}' is required but not a property", required),
                );
            }
        }
    }
}
