use super::*;

pub struct ScopeNode {
    pub object: ObjectId,
    pub next: Scope,
}

/// Scope chain, innermost object first. Nodes are shared between the chains
/// that extend them.
#[derive(Clone, Default)]
pub struct Scope(Option<Rc<ScopeNode>>);

impl Scope {
    pub fn empty() -> Self {
        Scope(None)
    }

    pub fn push(&self, object: ObjectId) -> Scope {
        Scope(Some(Rc::new(ScopeNode {
            object,
            next: self.clone(),
        })))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn head(&self) -> Option<ObjectId> {
        self.0.as_ref().map(|n| n.object)
    }

    /// The objects of the chain, innermost first.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        let mut node = self.0.as_deref();
        std::iter::from_fn(move || {
            let n = node?;
            node = n.next.0.as_deref();
            Some(n.object)
        })
    }
}

/// A running program, function or eval body.
pub struct Context {
    /// Set for function calls only.
    pub activation: Option<ObjectId>,
    pub variable: ObjectId,
    pub var_attrs: Attributes,
    pub this: ObjectId,
    pub scope: Scope,
    /// The function instance being called, if any.
    pub function: Option<ObjectId>,
    pub arguments: Option<ObjectId>,
    /// Value of the last expression statement executed.
    pub result: Option<JsValue>,
}

impl Interpreter {
    pub(crate) fn context(&self) -> &Context {
        match self.contexts.last() {
            Some(ctx) => ctx,
            None => self.abort("no running context"),
        }
    }

    pub(crate) fn context_mut(&mut self) -> &mut Context {
        if self.contexts.is_empty() {
            self.abort("no running context");
        }
        let last = self.contexts.len() - 1;
        &mut self.contexts[last]
    }

    pub(crate) fn current_scope(&self) -> Scope {
        self.context().scope.clone()
    }

    /// Replaces the running context's scope, returning the previous one.
    pub(crate) fn replace_scope(&mut self, scope: Scope) -> Scope {
        std::mem::replace(&mut self.context_mut().scope, scope)
    }

    pub(crate) fn set_result(&mut self, value: JsValue) {
        self.context_mut().result = Some(value);
    }

    /// Resolves an identifier against the running scope chain.
    pub(crate) fn lookup(&mut self, name: Atom) -> JsResult<Reference> {
        let scope = self.current_scope();
        for object in scope.objects() {
            if self.has_property(object, name)? {
                return Ok(Reference {
                    base: Some(object),
                    name,
                });
            }
        }
        Ok(Reference { base: None, name })
    }

    /// Approximate observational equality of two scope chains: lockstep walk
    /// where a run of links joined to their predecessor counts as one link.
    /// Chains are equal when they share a tail or end together.
    pub(crate) fn scope_eq(&self, a: &Scope, b: &Scope) -> bool {
        let mut s1 = a.0.as_ref();
        let mut s2 = b.0.as_ref();
        while let (Some(n1), Some(n2)) = (s1, s2) {
            if Rc::ptr_eq(n1, n2) {
                return true;
            }
            if !self.joined(n1.object, n2.object) {
                return false;
            }
            s1 = self.skip_joined_links(n1);
            s2 = self.skip_joined_links(n2);
        }
        s1.is_none() && s2.is_none()
    }

    fn skip_joined_links<'s>(&self, node: &'s Rc<ScopeNode>) -> Option<&'s Rc<ScopeNode>> {
        let mut next = node.next.0.as_ref();
        while let Some(n) = next {
            if !self.joined(n.object, node.object) {
                break;
            }
            next = n.next.0.as_ref();
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_sharing_a_tail_are_equal() {
        let mut interp = Interpreter::new(Config::default());
        let global = interp.global_object();
        let a = interp.new_object();
        let base = Scope::empty().push(global);
        let s1 = base.push(a);
        let s2 = s1.clone();
        assert!(interp.scope_eq(&s1, &s2));
        assert!(interp.scope_eq(&base, &Scope::empty().push(global)));
    }

    #[test]
    fn different_objects_make_chains_unequal() {
        let mut interp = Interpreter::new(Config::default());
        let global = interp.global_object();
        let a = interp.new_object();
        let b = interp.new_object();
        let base = Scope::empty().push(global);
        assert!(!interp.scope_eq(&base.push(a), &base.push(b)));
        assert!(!interp.scope_eq(&base.push(a), &base));
    }

    #[test]
    fn duplicate_links_count_once() {
        let mut interp = Interpreter::new(Config::default());
        let global = interp.global_object();
        let a = interp.new_object();
        let once = Scope::empty().push(global).push(a);
        let twice = Scope::empty().push(global).push(a).push(a);
        assert!(interp.scope_eq(&once, &twice));
        assert!(interp.scope_eq(&twice, &once));
    }

    #[test]
    fn lookup_walks_innermost_first() {
        let mut interp = Interpreter::new(Config::default());
        let inner = interp.new_object();
        let name = interp.intern("shadowed");
        let global = interp.global_object();
        interp.put(global, name, JsValue::Number(1.0)).unwrap();
        interp.put(inner, name, JsValue::Number(2.0)).unwrap();
        let scope = interp.current_scope().push(inner);
        let saved = interp.replace_scope(scope);
        let found = interp.lookup(name).unwrap();
        let missing_name = interp.intern("nowhere");
        let missing = interp.lookup(missing_name).unwrap();
        interp.replace_scope(saved);
        assert_eq!(found.base, Some(inner));
        assert_eq!(missing.base, None);
    }
}
