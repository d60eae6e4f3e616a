//! Manifest evaluation
//!
//! Walks a parsed AST and produces a [`ResolvedModel`]: classes are
//! evaluated at most once, defines are expanded per instance, expressions
//! are resolved against the scope tree, and every concrete resource is
//! validated against the type registry. Evaluation is fatal-on-error; a
//! manifest either resolves completely or not at all.

use crate::error::{EvalError, Location};
use crate::model::ResolvedModel;
use crate::scope::{ScopeId, ScopeTree};
use std::collections::{BTreeSet, HashMap, HashSet};
use steward_lang::ast::{
    Ast, CaseStmt, ClassDecl, CompareOp, DefineDecl, Expr, Pattern, Span, Stmt, StrSeg,
};
use steward_resource::{
    is_metaparameter, Metaparams, ResourceId, ResourceSpec, TypeMetadata, TypeRegistry, Value,
};
use tracing::debug;

/// How a second declaration of an already-declared resource is handled.
///
/// A subclass overriding a resource declared by one of its ancestors is
/// always a merge, whatever the policy says; the policy governs unrelated
/// redeclarations only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Any redeclaration is an error, identical or not
    Error,
    /// Identical redeclarations are dropped; conflicting ones error
    #[default]
    AllowIdentical,
    /// Later declarations merge over earlier ones
    LastWins,
}

/// Knobs for one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    pub duplicates: DuplicatePolicy,
}

/// Evaluate a parsed manifest into a resolved resource model.
pub fn evaluate(
    ast: &Ast,
    registry: &TypeRegistry,
    options: EvalOptions,
) -> Result<ResolvedModel, EvalError> {
    let mut ev = Evaluator::new(ast.source_name.clone(), registry, options);
    let root = ev.scopes.root();
    // Pre-register top-level classes and defines so `include` may appear
    // before the declaration it names.
    for stmt in &ast.stmts {
        match stmt {
            Stmt::Class(decl) => ev.register_class(decl, root)?,
            Stmt::Define(decl) => ev.register_define(decl, root)?,
            _ => {}
        }
    }
    for stmt in &ast.stmts {
        ev.eval_stmt(stmt, root)?;
    }
    Ok(ev.model)
}

struct ClassInfo {
    decl: ClassDecl,
    /// Scope the declaration appeared in; the class body's scope parents
    /// here when the class has no parent class
    declared_in: ScopeId,
    /// Set once the class has been evaluated; includes after the first
    /// reuse it
    scope: Option<ScopeId>,
    in_progress: bool,
}

struct DefineInfo {
    decl: DefineDecl,
    declared_in: ScopeId,
}

struct Evaluator<'a> {
    registry: &'a TypeRegistry,
    options: EvalOptions,
    source_name: String,
    scopes: ScopeTree,
    model: ResolvedModel,
    classes: HashMap<String, ClassInfo>,
    defines: HashMap<String, DefineInfo>,
    /// Class/define frames enclosing the statement being evaluated
    provenance: Vec<String>,
    /// Classes currently being evaluated, outermost first
    class_stack: Vec<String>,
    /// Per model index: the class whose body declared the resource
    declared_by: Vec<Option<String>>,
}

impl<'a> Evaluator<'a> {
    fn new(source_name: String, registry: &'a TypeRegistry, options: EvalOptions) -> Self {
        Self {
            registry,
            options,
            source_name,
            scopes: ScopeTree::new(),
            model: ResolvedModel::new(),
            classes: HashMap::new(),
            defines: HashMap::new(),
            provenance: Vec::new(),
            class_stack: Vec::new(),
            declared_by: Vec::new(),
        }
    }

    fn at(&self, span: Span) -> Location {
        Location {
            source_name: self.source_name.clone(),
            line: span.line,
            column: span.column,
        }
    }

    fn register_class(&mut self, decl: &ClassDecl, scope: ScopeId) -> Result<(), EvalError> {
        let key = decl.name.to_lowercase();
        if let Some(existing) = self.classes.get(&key) {
            // The top-level pre-pass and statement evaluation both visit
            // the same declaration; seeing it again is fine.
            if existing.decl == *decl {
                return Ok(());
            }
            return Err(EvalError::AlreadyDefined {
                at: self.at(decl.span),
                kind: "class",
                name: key,
            });
        }
        if self.defines.contains_key(&key) {
            return Err(EvalError::AlreadyDefined {
                at: self.at(decl.span),
                kind: "define",
                name: key,
            });
        }
        self.classes.insert(
            key,
            ClassInfo {
                decl: decl.clone(),
                declared_in: scope,
                scope: None,
                in_progress: false,
            },
        );
        Ok(())
    }

    fn register_define(&mut self, decl: &DefineDecl, scope: ScopeId) -> Result<(), EvalError> {
        let key = decl.name.to_lowercase();
        if let Some(existing) = self.defines.get(&key) {
            if existing.decl == *decl {
                return Ok(());
            }
            return Err(EvalError::AlreadyDefined {
                at: self.at(decl.span),
                kind: "define",
                name: key,
            });
        }
        if self.classes.contains_key(&key) {
            return Err(EvalError::AlreadyDefined {
                at: self.at(decl.span),
                kind: "class",
                name: key,
            });
        }
        if self.registry.contains(&key) {
            return Err(EvalError::AlreadyDefined {
                at: self.at(decl.span),
                kind: "type",
                name: key,
            });
        }
        self.defines.insert(
            key,
            DefineInfo {
                decl: decl.clone(),
                declared_in: scope,
            },
        );
        Ok(())
    }

    fn eval_body(&mut self, body: &[Stmt], scope: ScopeId) -> Result<(), EvalError> {
        for stmt in body {
            self.eval_stmt(stmt, scope)?;
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt, scope: ScopeId) -> Result<(), EvalError> {
        match stmt {
            Stmt::Resource {
                type_name,
                bodies,
                span,
            } => self.eval_resource(type_name, bodies, scope, *span),
            Stmt::Defaults {
                type_name,
                params,
                span,
            } => self.eval_defaults(type_name, params, scope, *span),
            Stmt::Class(decl) => self.register_class(decl, scope),
            Stmt::Define(decl) => self.register_define(decl, scope),
            Stmt::Include { names, span } => {
                for name in names {
                    self.declare_class(name, *span)?;
                }
                Ok(())
            }
            Stmt::Assign { name, value, .. } => {
                let value = self.eval_expr(value, scope)?;
                self.scopes.set_var(scope, name.clone(), value);
                Ok(())
            }
            Stmt::If(stmt) => {
                let cond = self.eval_expr(&stmt.cond, scope)?;
                if cond.is_truthy() {
                    self.eval_body(&stmt.then_body, scope)
                } else if let Some(else_body) = &stmt.else_body {
                    self.eval_body(else_body, scope)
                } else {
                    Ok(())
                }
            }
            Stmt::Case(stmt) => self.eval_case(stmt, scope),
        }
    }

    /// Evaluate a class body, once. Later includes of the same class get
    /// the already-built scope back.
    fn declare_class(&mut self, name: &str, span: Span) -> Result<ScopeId, EvalError> {
        let key = name.to_lowercase();
        let Some(info) = self.classes.get(&key) else {
            return Err(EvalError::UnknownClass {
                at: self.at(span),
                name: key,
            });
        };
        if let Some(scope) = info.scope {
            return Ok(scope);
        }
        if info.in_progress {
            let mut chain = self.class_stack.clone();
            chain.push(key.clone());
            return Err(EvalError::InheritanceCycle {
                at: self.at(span),
                chain: chain.join(" < "),
            });
        }
        let decl = info.decl.clone();
        let declared_in = info.declared_in;
        if let Some(info) = self.classes.get_mut(&key) {
            info.in_progress = true;
        }

        // A subclass scope parents to its superclass scope so the parent's
        // variables are visible in the body.
        let parent_scope = match &decl.parent {
            Some(parent) => self.declare_class(parent, decl.span)?,
            None => declared_in,
        };

        debug!(class = %key, "declaring class");
        let scope = self.scopes.child(parent_scope);
        self.scopes.add_tag(scope, key.clone());
        self.class_stack.push(key.clone());
        self.provenance.push(key.clone());
        let result = self.eval_body(&decl.body, scope);
        self.provenance.pop();
        self.class_stack.pop();
        if let Some(info) = self.classes.get_mut(&key) {
            info.in_progress = false;
        }
        result?;
        if let Some(info) = self.classes.get_mut(&key) {
            info.scope = Some(scope);
        }
        Ok(scope)
    }

    fn eval_defaults(
        &mut self,
        type_name: &str,
        params: &[steward_lang::ast::Param],
        scope: ScopeId,
        span: Span,
    ) -> Result<(), EvalError> {
        let Some(metadata) = self.registry.get(type_name).cloned() else {
            return Err(EvalError::UnknownType {
                at: self.at(span),
                name: type_name.to_lowercase(),
            });
        };
        for param in params {
            if !is_metaparameter(&param.name) && !metadata.has_attribute(&param.name) {
                return Err(EvalError::UnknownAttribute {
                    at: self.at(param.span),
                    type_name: metadata.name.clone(),
                    attribute: param.name.clone(),
                });
            }
            let value = self.eval_expr(&param.value, scope)?;
            self.scopes
                .add_default(scope, &metadata.name, param.name.clone(), value);
        }
        Ok(())
    }

    fn eval_resource(
        &mut self,
        type_name: &str,
        bodies: &[steward_lang::ast::InstanceBody],
        scope: ScopeId,
        span: Span,
    ) -> Result<(), EvalError> {
        let key = type_name.to_lowercase();
        if let Some(metadata) = self.registry.get(&key).cloned() {
            for body in bodies {
                let mut params = Vec::with_capacity(body.params.len());
                for param in &body.params {
                    let value = self.eval_expr(&param.value, scope)?;
                    params.push((param.name.clone(), value, param.span));
                }
                for title_expr in &body.titles {
                    let title = self.eval_expr(title_expr, scope)?;
                    for scalar in title.flatten() {
                        self.declare_resource(&metadata, scalar.to_string(), &params, scope, span)?;
                    }
                }
            }
            return Ok(());
        }
        if self.defines.contains_key(&key) {
            return self.eval_define_instances(&key, bodies, scope, span);
        }
        Err(EvalError::UnknownType {
            at: self.at(span),
            name: key,
        })
    }

    fn declare_resource(
        &mut self,
        metadata: &TypeMetadata,
        title: String,
        params: &[(String, Value, Span)],
        scope: ScopeId,
        span: Span,
    ) -> Result<(), EvalError> {
        let mut spec = ResourceSpec::new(ResourceId::new(&metadata.name, &title));
        let mut explicit = BTreeSet::new();
        for (name, value, pspan) in params {
            explicit.insert(name.clone());
            self.apply_param(&mut spec, metadata, name, value, *pspan)?;
        }
        // Scope defaults fill in anything the declaration did not set.
        for (name, value) in self.scopes.lookup_defaults(scope, &metadata.name) {
            if explicit.contains(&name) {
                continue;
            }
            self.apply_param(&mut spec, metadata, &name, &value, span)?;
        }
        for (property, raw) in &metadata.defaults {
            spec.params
                .entry(property.clone())
                .or_insert_with(|| Value::from(raw.as_str()));
        }
        spec.params
            .entry(metadata.namevar.clone())
            .or_insert_with(|| Value::from(title.as_str()));
        spec.meta.tags.extend(self.scopes.tags(scope));
        spec.meta.tags.insert(metadata.name.clone());
        spec.provenance = self.provenance.clone();
        spec.line = span.line;
        spec.column = span.column;

        if let Some(i) = self.model.position(&spec.id) {
            return self.resolve_duplicate(i, spec, span);
        }

        for alias in &spec.meta.aliases {
            let alias_id = ResourceId::new(&metadata.name, alias.clone());
            if self.model.has_alias(&alias_id) {
                return Err(EvalError::DuplicateResource {
                    at: self.at(span),
                    id: alias_id,
                });
            }
        }
        debug!(resource = %spec.id, "declared resource");
        let id = spec.id.clone();
        let aliases = spec.meta.aliases.clone();
        spec.index = self.model.len();
        self.model.push(spec);
        self.declared_by.push(self.class_stack.last().cloned());
        self.register_aliases(&id, &aliases);
        Ok(())
    }

    fn register_aliases(&mut self, canonical: &ResourceId, aliases: &[String]) {
        for alias in aliases {
            let alias_id = ResourceId::new(&canonical.type_name, alias.clone());
            if !self.model.has_alias(&alias_id) {
                self.model.add_alias(alias_id, canonical.clone());
            }
        }
    }

    fn resolve_duplicate(
        &mut self,
        i: usize,
        spec: ResourceSpec,
        span: Span,
    ) -> Result<(), EvalError> {
        let existing = &self.model.resources()[i];
        let canonical = existing.id.clone();
        // Tags carry the enclosing class/define names, which differ even
        // when the declarations themselves are byte-identical.
        let identical = existing.params == spec.params
            && existing.meta.before == spec.meta.before
            && existing.meta.require == spec.meta.require
            && existing.meta.subscribe == spec.meta.subscribe
            && existing.meta.aliases == spec.meta.aliases;
        let overrides = self.current_class_overrides(self.declared_by[i].as_deref());
        if overrides && !identical {
            debug!(resource = %spec.id, "subclass override");
            let aliases = spec.meta.aliases.clone();
            merge_into(self.model.get_mut(i), spec);
            self.register_aliases(&canonical, &aliases);
            return Ok(());
        }
        match self.options.duplicates {
            DuplicatePolicy::Error => Err(EvalError::DuplicateResource {
                at: self.at(span),
                id: spec.id,
            }),
            DuplicatePolicy::AllowIdentical => {
                if identical {
                    self.model.get_mut(i).meta.tags.extend(spec.meta.tags);
                    Ok(())
                } else {
                    Err(EvalError::DuplicateResource {
                        at: self.at(span),
                        id: spec.id,
                    })
                }
            }
            DuplicatePolicy::LastWins => {
                let aliases = spec.meta.aliases.clone();
                merge_into(self.model.get_mut(i), spec);
                self.register_aliases(&canonical, &aliases);
                Ok(())
            }
        }
    }

    /// Whether the class currently being evaluated inherits, directly or
    /// transitively, from the class that declared the original resource.
    fn current_class_overrides(&self, original: Option<&str>) -> bool {
        let Some(original) = original else {
            return false;
        };
        let Some(current) = self.class_stack.last() else {
            return false;
        };
        if current == original {
            return false;
        }
        let mut seen = HashSet::new();
        let mut cursor = current.clone();
        while let Some(info) = self.classes.get(&cursor) {
            let Some(parent) = &info.decl.parent else {
                return false;
            };
            let parent = parent.to_lowercase();
            if parent == original {
                return true;
            }
            if !seen.insert(parent.clone()) {
                return false;
            }
            cursor = parent;
        }
        false
    }

    fn apply_param(
        &mut self,
        spec: &mut ResourceSpec,
        metadata: &TypeMetadata,
        name: &str,
        value: &Value,
        span: Span,
    ) -> Result<(), EvalError> {
        match name {
            "tag" => {
                for v in value.clone().flatten() {
                    if !v.is_undef() {
                        spec.meta.tags.insert(v.to_string());
                    }
                }
            }
            "alias" => {
                for v in value.clone().flatten() {
                    if !v.is_undef() {
                        spec.meta.aliases.push(v.to_string());
                    }
                }
            }
            "before" => spec.meta.before.extend(self.expect_refs(name, value, span)?),
            "require" => spec
                .meta
                .require
                .extend(self.expect_refs(name, value, span)?),
            "subscribe" => spec
                .meta
                .subscribe
                .extend(self.expect_refs(name, value, span)?),
            _ => {
                if !metadata.has_attribute(name) {
                    return Err(EvalError::UnknownAttribute {
                        at: self.at(span),
                        type_name: metadata.name.clone(),
                        attribute: name.to_string(),
                    });
                }
                // An undef value leaves the attribute unmanaged.
                if !value.is_undef() {
                    spec.params.insert(name.to_string(), value.clone());
                }
            }
        }
        Ok(())
    }

    fn expect_refs(
        &self,
        name: &str,
        value: &Value,
        span: Span,
    ) -> Result<Vec<ResourceId>, EvalError> {
        let mut refs = Vec::new();
        for v in value.clone().flatten() {
            match v {
                Value::Ref(id) => refs.push(id),
                other => {
                    return Err(EvalError::BadMetaparam {
                        at: self.at(span),
                        name: name.to_string(),
                        message: format!("expected a resource reference, got '{other}'"),
                    })
                }
            }
        }
        Ok(refs)
    }

    fn eval_define_instances(
        &mut self,
        key: &str,
        bodies: &[steward_lang::ast::InstanceBody],
        scope: ScopeId,
        span: Span,
    ) -> Result<(), EvalError> {
        let Some(info) = self.defines.get(key) else {
            return Err(EvalError::UnknownType {
                at: self.at(span),
                name: key.to_string(),
            });
        };
        let decl = info.decl.clone();
        let declared_in = info.declared_in;

        for body in bodies {
            let mut args = Vec::with_capacity(body.params.len());
            for param in &body.params {
                let value = self.eval_expr(&param.value, scope)?;
                args.push((param.name.clone(), value, param.span));
            }
            for title_expr in &body.titles {
                let title = self.eval_expr(title_expr, scope)?;
                for scalar in title.flatten() {
                    self.eval_define_instance(&decl, declared_in, scalar.to_string(), &args, span)?;
                }
            }
        }
        Ok(())
    }

    fn eval_define_instance(
        &mut self,
        decl: &DefineDecl,
        declared_in: ScopeId,
        title: String,
        args: &[(String, Value, Span)],
        span: Span,
    ) -> Result<(), EvalError> {
        let key = decl.name.to_lowercase();
        debug!(define = %key, title = %title, "expanding define");
        let scope = self.scopes.child(declared_in);
        self.scopes.add_tag(scope, key.clone());
        self.scopes.set_var(scope, "name", Value::from(title.as_str()));
        self.scopes
            .set_var(scope, "title", Value::from(title.as_str()));

        // Metaparameters on the instance propagate to every resource the
        // body declares; everything else must be a declared argument.
        let mut instance_meta = Metaparams::default();
        let mut supplied = BTreeSet::new();
        for (name, value, aspan) in args {
            if is_metaparameter(name) {
                match name.as_str() {
                    "tag" => {
                        for v in value.clone().flatten() {
                            if !v.is_undef() {
                                instance_meta.tags.insert(v.to_string());
                            }
                        }
                    }
                    "before" => instance_meta
                        .before
                        .extend(self.expect_refs(name, value, *aspan)?),
                    "require" => instance_meta
                        .require
                        .extend(self.expect_refs(name, value, *aspan)?),
                    "subscribe" => instance_meta
                        .subscribe
                        .extend(self.expect_refs(name, value, *aspan)?),
                    _ => {
                        return Err(EvalError::BadMetaparam {
                            at: self.at(*aspan),
                            name: name.clone(),
                            message: "not supported on defined type instances".to_string(),
                        })
                    }
                }
                continue;
            }
            if !decl.args.iter().any(|a| a.name == *name) {
                return Err(EvalError::UnknownArgument {
                    at: self.at(*aspan),
                    define: key.clone(),
                    argument: name.clone(),
                });
            }
            supplied.insert(name.clone());
            self.scopes.set_var(scope, name.clone(), value.clone());
        }
        for arg in &decl.args {
            if supplied.contains(&arg.name) || arg.name == "name" || arg.name == "title" {
                continue;
            }
            match &arg.default {
                Some(default) => {
                    let value = self.eval_expr(default, scope)?;
                    self.scopes.set_var(scope, arg.name.clone(), value);
                }
                None => {
                    return Err(EvalError::MissingArgument {
                        at: self.at(span),
                        define: key.clone(),
                        argument: arg.name.clone(),
                    })
                }
            }
        }

        let start = self.model.len();
        self.provenance.push(format!("{key}[{title}]"));
        let result = self.eval_body(&decl.body, scope);
        self.provenance.pop();
        result?;

        for i in start..self.model.len() {
            let spec = self.model.get_mut(i);
            spec.meta.tags.extend(instance_meta.tags.iter().cloned());
            spec.meta.before.extend(instance_meta.before.iter().cloned());
            spec.meta
                .require
                .extend(instance_meta.require.iter().cloned());
            spec.meta
                .subscribe
                .extend(instance_meta.subscribe.iter().cloned());
        }
        Ok(())
    }

    fn eval_case(&mut self, stmt: &CaseStmt, scope: ScopeId) -> Result<(), EvalError> {
        let control = self.eval_expr(&stmt.control, scope)?;
        let mut default_arm = None;
        for (i, arm) in stmt.arms.iter().enumerate() {
            for pattern in &arm.patterns {
                match pattern {
                    Pattern::Default => {
                        if default_arm.is_none() {
                            default_arm = Some(i);
                        }
                    }
                    Pattern::Expr(expr) => {
                        let candidate = self.eval_expr(expr, scope)?;
                        if candidate.matches(&control) {
                            return self.eval_body(&arm.body, scope);
                        }
                    }
                }
            }
        }
        if let Some(i) = default_arm {
            return self.eval_body(&stmt.arms[i].body, scope);
        }
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr, scope: ScopeId) -> Result<Value, EvalError> {
        match expr {
            Expr::Str { segs, .. } => {
                let mut out = String::new();
                for seg in segs {
                    match seg {
                        StrSeg::Lit(text) => out.push_str(text),
                        StrSeg::Var(name) => {
                            if let Some(value) = self.scopes.lookup(scope, name) {
                                out.push_str(&value.to_string());
                            }
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expr::Raw { value, .. } | Expr::Word { value, .. } | Expr::Number { value, .. } => {
                Ok(Value::String(value.clone()))
            }
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Variable { name, .. } => Ok(self
                .scopes
                .lookup(scope, name)
                .cloned()
                .unwrap_or(Value::Undef)),
            Expr::Array { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(item, scope)?);
                }
                Ok(Value::Array(values))
            }
            Expr::ResourceRef {
                type_name, title, ..
            } => {
                let title = self.eval_expr(title, scope)?;
                Ok(Value::Ref(ResourceId::new(type_name, title.to_string())))
            }
            Expr::Selector {
                control,
                arms,
                span,
            } => {
                let control = self.eval_expr(control, scope)?;
                let mut default_arm = None;
                for arm in arms {
                    match &arm.pattern {
                        Pattern::Default => {
                            if default_arm.is_none() {
                                default_arm = Some(&arm.result);
                            }
                        }
                        Pattern::Expr(expr) => {
                            let candidate = self.eval_expr(expr, scope)?;
                            if candidate.matches(&control) {
                                return self.eval_expr(&arm.result, scope);
                            }
                        }
                    }
                }
                match default_arm {
                    Some(result) => self.eval_expr(result, scope),
                    None => Err(EvalError::SelectorNoMatch {
                        at: self.at(*span),
                        value: control.to_string(),
                    }),
                }
            }
            Expr::Compare { op, lhs, rhs, .. } => {
                let lhs = self.eval_expr(lhs, scope)?;
                let rhs = self.eval_expr(rhs, scope)?;
                let eq = lhs.matches(&rhs);
                Ok(Value::Bool(match op {
                    CompareOp::Eq => eq,
                    CompareOp::NotEq => !eq,
                }))
            }
        }
    }
}

fn merge_into(existing: &mut ResourceSpec, incoming: ResourceSpec) {
    for (name, value) in incoming.params {
        existing.params.insert(name, value);
    }
    existing.meta.tags.extend(incoming.meta.tags);
    existing.meta.before.extend(incoming.meta.before);
    existing.meta.require.extend(incoming.meta.require);
    existing.meta.subscribe.extend(incoming.meta.subscribe);
    existing.meta.aliases.extend(incoming.meta.aliases);
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_lang::parse;
    use steward_resource::mem::MemProvider;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::builtin();
        registry.register(MemProvider::metadata());
        registry
    }

    fn eval(text: &str) -> ResolvedModel {
        try_eval(text).unwrap()
    }

    fn try_eval(text: &str) -> Result<ResolvedModel, EvalError> {
        let ast = parse(text, "test").unwrap();
        evaluate(&ast, &registry(), EvalOptions::default())
    }

    #[test]
    fn test_resource_gets_namevar_and_type_defaults() {
        let model = eval(r#"file { "/tmp/x": mode => 755 }"#);
        assert_eq!(model.len(), 1);
        let spec = &model.resources()[0];
        assert_eq!(spec.param("path"), Some(&Value::from("/tmp/x")));
        assert_eq!(spec.param("mode"), Some(&Value::from("755")));
        assert_eq!(spec.param("ensure"), Some(&Value::from("file")));
    }

    #[test]
    fn test_array_titles_iterate() {
        let model = eval(r#"file { ["/tmp/a", "/tmp/b"]: ensure => file }"#);
        let titles: Vec<_> = model
            .resources()
            .iter()
            .map(|r| r.id.title.as_str())
            .collect();
        assert_eq!(titles, vec!["/tmp/a", "/tmp/b"]);
    }

    #[test]
    fn test_variable_interpolation() {
        let model = eval(
            r#"
            $dir = "/tmp"
            file { "$dir/x": content => "in $dir" }
            "#,
        );
        let spec = &model.resources()[0];
        assert_eq!(spec.id.title, "/tmp/x");
        assert_eq!(spec.param("content"), Some(&Value::from("in /tmp")));
    }

    #[test]
    fn test_unbound_variable_interpolates_empty() {
        let model = eval(r#"file { "/tmp/${nope}x": ensure => file }"#);
        assert_eq!(model.resources()[0].id.title, "/tmp/x");
    }

    #[test]
    fn test_type_defaults_apply_unless_overridden() {
        let model = eval(
            r#"
            File { mode => 644 }
            file { "/tmp/a": ensure => file }
            file { "/tmp/b": mode => 755 }
            "#,
        );
        assert_eq!(model.resources()[0].param("mode"), Some(&Value::from("644")));
        assert_eq!(model.resources()[1].param("mode"), Some(&Value::from("755")));
    }

    #[test]
    fn test_include_is_idempotent() {
        let model = eval(
            r#"
            class testing { file { "/tmp/c": ensure => file } }
            include testing
            include testing
            "#,
        );
        assert_eq!(model.len(), 1);
        assert!(model.resources()[0].tagged("testing"));
    }

    #[test]
    fn test_unknown_class_errors() {
        let err = try_eval("include missing").unwrap_err();
        assert!(matches!(err, EvalError::UnknownClass { .. }));
    }

    #[test]
    fn test_subclass_sees_parent_variables() {
        let model = eval(
            r#"
            class base { $dir = "/tmp" }
            class child inherits base {
                file { "$dir/sub": ensure => file }
            }
            include child
            "#,
        );
        let spec = &model.resources()[0];
        assert_eq!(spec.id.title, "/tmp/sub");
        assert!(spec.tagged("base"));
        assert!(spec.tagged("child"));
    }

    #[test]
    fn test_subclass_overrides_parent_resource() {
        let model = eval(
            r#"
            class base { mem { "slot": value => one } }
            class child inherits base { mem { "slot": value => two } }
            include child
            "#,
        );
        assert_eq!(model.len(), 1);
        assert_eq!(model.resources()[0].param("value"), Some(&Value::from("two")));
    }

    #[test]
    fn test_inheritance_cycle_detected() {
        let err = try_eval(
            r#"
            class a inherits b { }
            class b inherits a { }
            include a
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::InheritanceCycle { .. }));
    }

    #[test]
    fn test_duplicate_identical_is_dropped() {
        let model = eval(
            r#"
            file { "/tmp/x": ensure => file }
            file { "/tmp/x": ensure => file }
            "#,
        );
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_identical_declaration_across_classes_is_merged() {
        let model = eval(
            r#"
            class a { file { "/tmp/x": ensure => file } }
            class b { file { "/tmp/x": ensure => file } }
            include a
            include b
            "#,
        );
        assert_eq!(model.len(), 1);
        let spec = &model.resources()[0];
        assert!(spec.meta.tags.contains("a"));
        assert!(spec.meta.tags.contains("b"));
    }

    #[test]
    fn test_duplicate_conflict_errors() {
        let err = try_eval(
            r#"
            mem { "slot": value => one }
            mem { "slot": value => two }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::DuplicateResource { .. }));
    }

    #[test]
    fn test_duplicate_policy_error_rejects_identical() {
        let ast = parse(
            r#"
            file { "/tmp/x": ensure => file }
            file { "/tmp/x": ensure => file }
            "#,
            "test",
        )
        .unwrap();
        let options = EvalOptions {
            duplicates: DuplicatePolicy::Error,
        };
        let err = evaluate(&ast, &registry(), options).unwrap_err();
        assert!(matches!(err, EvalError::DuplicateResource { .. }));
    }

    #[test]
    fn test_duplicate_policy_last_wins_merges() {
        let ast = parse(
            r#"
            mem { "slot": value => one }
            mem { "slot": value => two, ensure => present }
            "#,
            "test",
        )
        .unwrap();
        let options = EvalOptions {
            duplicates: DuplicatePolicy::LastWins,
        };
        let model = evaluate(&ast, &registry(), options).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.resources()[0].param("value"), Some(&Value::from("two")));
    }

    #[test]
    fn test_define_expansion_with_defaults() {
        let model = eval(
            r#"
            define entry(value, ensure = present) {
                mem { "entry-$name": value => $value, ensure => $ensure }
            }
            entry { "a": value => one }
            "#,
        );
        assert_eq!(model.len(), 1);
        let spec = &model.resources()[0];
        assert_eq!(spec.id.title, "entry-a");
        assert_eq!(spec.param("value"), Some(&Value::from("one")));
        assert_eq!(spec.param("ensure"), Some(&Value::from("present")));
        assert!(spec.tagged("entry"));
        assert_eq!(spec.path(), "//entry[a]/mem=entry-a");
    }

    #[test]
    fn test_define_missing_argument_errors() {
        let err = try_eval(
            r#"
            define entry(value) { mem { "$name": value => $value } }
            entry { "a": }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::MissingArgument { .. }));
    }

    #[test]
    fn test_define_unknown_argument_errors() {
        let err = try_eval(
            r#"
            define entry(value) { mem { "$name": value => $value } }
            entry { "a": value => x, bogus => y }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::UnknownArgument { .. }));
    }

    #[test]
    fn test_define_metaparams_propagate() {
        let model = eval(
            r#"
            mem { "anchor": }
            define entry() { mem { "entry-$name": } }
            entry { "a": require => Mem["anchor"] }
            "#,
        );
        let spec = model.get(&ResourceId::new("mem", "entry-a")).unwrap();
        assert_eq!(spec.meta.require, vec![ResourceId::new("mem", "anchor")]);
    }

    #[test]
    fn test_case_statement_matches_and_defaults() {
        let model = eval(
            r#"
            $which = two
            case $which {
                one: { mem { "got-one": } }
                two, three: { mem { "got-two": } }
                default: { mem { "got-default": } }
            }
            "#,
        );
        assert_eq!(model.len(), 1);
        assert_eq!(model.resources()[0].id.title, "got-two");
    }

    #[test]
    fn test_selector_picks_arm() {
        let model = eval(
            r#"
            $os = linux
            mem { "slot": value => $os ? { linux => works, default => broken } }
            "#,
        );
        assert_eq!(
            model.resources()[0].param("value"),
            Some(&Value::from("works"))
        );
    }

    #[test]
    fn test_selector_without_match_errors() {
        let err = try_eval(
            r#"
            $os = plan9
            mem { "slot": value => $os ? { linux => works } }
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EvalError::SelectorNoMatch { .. }));
    }

    #[test]
    fn test_if_else_truthiness() {
        let model = eval(
            r#"
            $flag = false
            if $flag { mem { "then": } } else { mem { "else": } }
            "#,
        );
        assert_eq!(model.resources()[0].id.title, "else");
    }

    #[test]
    fn test_alias_resolves_lookups_and_duplicates() {
        let model = eval(r#"file { "/tmp/x": alias => xfile, ensure => file }"#);
        let spec = model.get(&ResourceId::new("file", "xfile")).unwrap();
        assert_eq!(spec.id.title, "/tmp/x");
    }

    #[test]
    fn test_explicit_tags_and_query() {
        let model = eval(
            r#"
            file { "/tmp/a": tag => wanted, ensure => file }
            file { "/tmp/b": ensure => file }
            "#,
        );
        let hits = model.tagged("wanted");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.title, "/tmp/a");
        assert_eq!(model.tagged("file").len(), 2);
    }

    #[test]
    fn test_unknown_attribute_errors() {
        let err = try_eval(r#"file { "/tmp/x": bogus => 1 }"#).unwrap_err();
        assert!(matches!(err, EvalError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_unknown_type_errors() {
        let err = try_eval(r#"widget { "x": }"#).unwrap_err();
        assert!(matches!(err, EvalError::UnknownType { .. }));
    }

    #[test]
    fn test_metaparam_requires_reference() {
        let err = try_eval(r#"file { "/tmp/x": require => plainword }"#).unwrap_err();
        assert!(matches!(err, EvalError::BadMetaparam { .. }));
    }
}
